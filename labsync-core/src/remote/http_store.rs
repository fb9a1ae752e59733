//! [`RemoteStore`] over the backend's `/storage/` resource.

use crate::remote::client::{ensure_success, ApiClient};
use crate::remote::models::{StorageListResponse, StoreValueRequest, StoredValue};
use crate::remote::{RemoteError, RemoteStore};
use async_trait::async_trait;
use reqwest::{Method, StatusCode};

const STORAGE: &str = "storage";

pub struct HttpRemoteStore {
    api: ApiClient,
}

impl HttpRemoteStore {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn put(&self, key: &str, payload: &str) -> Result<(), RemoteError> {
        let body = StoreValueRequest {
            key: key.to_string(),
            value: payload.to_string(),
        };
        let request = self
            .api
            .request(Method::POST, self.api.endpoint(&[STORAGE]))
            .json(&body);
        self.api.send_ok(request).await?;
        Ok(())
    }

    async fn fetch(&self, key: &str) -> Result<Option<String>, RemoteError> {
        let url = self.api.item_endpoint(STORAGE, key)?;
        let request = self.api.request(Method::GET, url);
        let resp = self.api.send(request).await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let stored: StoredValue = ensure_success(resp)
            .await?
            .json()
            .await
            .map_err(|e| RemoteError::Decode(format!("Invalid storage value for {}: {}", key, e)))?;
        Ok(Some(stored.value))
    }

    async fn delete(&self, key: &str) -> Result<(), RemoteError> {
        let url = self.api.item_endpoint(STORAGE, key)?;
        let request = self.api.request(Method::DELETE, url);
        self.api.send_ok(request).await?;
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<String>, RemoteError> {
        let request = self.api.request(Method::GET, self.api.endpoint(&[STORAGE]));
        let listing: StorageListResponse = self
            .api
            .send_ok(request)
            .await?
            .json()
            .await
            .map_err(|e| RemoteError::Decode(format!("Invalid storage listing: {}", e)))?;
        Ok(listing.results.into_iter().map(|r| r.key).collect())
    }
}
