//! Authenticated HTTP plumbing shared by the storage and capacity clients.

use crate::config::LabSyncConfig;
use crate::remote::RemoteError;
use crate::store::LocalStore;
use reqwest::{Method, RequestBuilder, Response, Url};
use std::time::Duration;
use tracing::{debug, warn};

/// HTTP client for the lab backend API.
///
/// The bearer credential is read from the local store on every request, so a
/// token written by the login flow is picked up without rebuilding the client.
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: Url,
    local: LocalStore,
    token_key: String,
}

impl ApiClient {
    /// Create a new API client rooted at `base_url`.
    pub fn new(
        base_url: &str,
        local: LocalStore,
        token_key: &str,
        timeout: Option<Duration>,
    ) -> Result<Self, RemoteError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| RemoteError::InvalidRequest(format!("Invalid base URL {}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(RemoteError::InvalidRequest(format!(
                "Base URL cannot carry a path: {}",
                base_url
            )));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            local,
            token_key: token_key.to_string(),
        })
    }

    pub fn from_config(config: &LabSyncConfig, local: LocalStore) -> Result<Self, RemoteError> {
        Self::new(
            &config.api_base_url,
            local,
            &config.access_token_key,
            config.request_timeout(),
        )
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build `{base}/{segments...}/`. Each segment is percent-encoded on its own,
    /// so keys containing `/` or spaces stay a single path segment.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            path.extend(segments);
            path.push("");
        }
        url
    }

    /// URL of one keyed item under `collection`.
    ///
    /// `""`, `"."` and `".."` would collapse into the collection URL itself
    /// (or its parent) once the path is normalized, so they are refused.
    pub fn item_endpoint(&self, collection: &str, key: &str) -> Result<Url, RemoteError> {
        if matches!(key, "" | "." | "..") {
            return Err(RemoteError::InvalidRequest(format!(
                "Key {:?} cannot be addressed as a path segment",
                key
            )));
        }
        Ok(self.endpoint(&[collection, key]))
    }

    fn bearer_token(&self) -> Option<String> {
        match self.local.get(&self.token_key) {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!("Could not read access token from local store: {}", e);
                None
            }
        }
    }

    /// Start a request with the bearer credential attached (when one exists).
    pub fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match self.bearer_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request, mapping transport failures. The status is not checked.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, RemoteError> {
        let resp = builder.send().await?;
        debug!("{} {}", resp.status(), resp.url());
        Ok(resp)
    }

    /// Send a request and turn any non-success status into [`RemoteError::Status`].
    pub async fn send_ok(&self, builder: RequestBuilder) -> Result<Response, RemoteError> {
        let resp = self.send(builder).await?;
        ensure_success(resp).await
    }
}

pub(crate) async fn ensure_success(resp: Response) -> Result<Response, RemoteError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_else(|_| "unknown".to_string());
    Err(RemoteError::Status { status, body })
}
