//! Wire types for the backend storage resource.

use serde::{Deserialize, Serialize};

/// Body of `POST /storage/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreValueRequest {
    pub key: String,
    pub value: String,
}

/// Body of `GET /storage/{key}/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredValue {
    pub value: String,
}

/// One row of `GET /storage/`. The backend sends more fields than the key;
/// they are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredKey {
    pub key: String,
}

/// Body of `GET /storage/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageListResponse {
    #[serde(default)]
    pub results: Vec<StoredKey>,
}
