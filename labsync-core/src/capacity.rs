//! Client for the backend's capacity predicate.
//!
//! The rule itself lives on the backend. This side only asks, and when the
//! question cannot be answered it lets the user proceed (fail-open).

use crate::remote::{ApiClient, RemoteError};
use chrono::NaiveDate;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityStatus {
    #[serde(rename = "disponible")]
    pub available: bool,
    #[serde(rename = "capacite_restante", default)]
    pub remaining: Option<i64>,
}

impl CapacityStatus {
    /// Answer used when the backend cannot be asked.
    pub fn fail_open() -> Self {
        Self {
            available: true,
            remaining: None,
        }
    }
}

pub struct CapacityClient {
    api: ApiClient,
}

impl CapacityClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Check remaining capacity for `test_type` on `date`. Never fails.
    pub async fn check(&self, test_type: &str, date: NaiveDate) -> CapacityStatus {
        match self.query(test_type, date).await {
            Ok(status) => status,
            Err(e) => {
                warn!(
                    "Capacity check for {} on {} unavailable, allowing: {}",
                    test_type, date, e
                );
                CapacityStatus::fail_open()
            }
        }
    }

    async fn query(&self, test_type: &str, date: NaiveDate) -> Result<CapacityStatus, RemoteError> {
        let mut url = self.api.endpoint(&["capacites", "check"]);
        url.query_pairs_mut()
            .append_pair("type_essai", test_type)
            .append_pair("date", &date.format("%Y-%m-%d").to_string());

        self.api
            .send_ok(self.api.request(Method::GET, url))
            .await?
            .json()
            .await
            .map_err(|e| RemoteError::Decode(format!("Invalid capacity response: {}", e)))
    }
}
