//! Two-tier read resolution: which store answers a read, and in what order.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueSource {
    Remote,
    Local,
}

/// Read precedence for [`StorageClient::read`](crate::StorageClient::read).
///
/// A tier that fails or has no entry is skipped silently; the next tier is
/// consulted. The read yields nothing only when every tier came up empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadPolicy {
    /// Backend first, local copy when the backend fails or has no entry.
    #[default]
    RemoteThenLocal,
    RemoteOnly,
    LocalOnly,
}

impl ReadPolicy {
    /// Tiers consulted, in order.
    pub fn tiers(&self) -> &'static [ValueSource] {
        match self {
            Self::RemoteThenLocal => &[ValueSource::Remote, ValueSource::Local],
            Self::RemoteOnly => &[ValueSource::Remote],
            Self::LocalOnly => &[ValueSource::Local],
        }
    }

    /// Parse a policy name as used in config files and CLI flags.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "remote_then_local" | "remote-then-local" => Some(Self::RemoteThenLocal),
            "remote_only" | "remote-only" | "remote" => Some(Self::RemoteOnly),
            "local_only" | "local-only" | "local" => Some(Self::LocalOnly),
            _ => None,
        }
    }
}

/// A value produced by one of the tiers.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub value: Value,
    pub source: ValueSource,
}

impl Resolved {
    pub fn from_payload(payload: &str, source: ValueSource) -> Self {
        Self {
            value: decode_payload(payload),
            source,
        }
    }
}

/// Deserialize a stored payload, keeping it as a plain string when it is not JSON.
pub fn decode_payload(payload: &str) -> Value {
    serde_json::from_str(payload).unwrap_or_else(|_| Value::String(payload.to_string()))
}
