//! Backing stores for persistent addresses
//!
//! A store is an asynchronous request/response key-value table keyed by
//! address, the shape a network-intercepting layer can serve from
//! directly. Stores are grouped into a [`StoreSet`] and addressed by name,
//! one per project root.
//!
//! | Implementation | Lifetime | Used for |
//! |----------------|----------|----------|
//! | [`MemoryStoreSet`] | process | tests, `store = "memory"` |
//! | [`DiskStoreSet`] | state dir | `store = "disk"` |

pub mod disk;
pub mod memory;

pub use disk::DiskStoreSet;
pub use memory::MemoryStoreSet;

use crate::error::PreviewResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Status text attached to every synthesized response
pub const STATUS_TEXT: &str = "Served from Preview Cache";

/// Header names used on stored entries
pub mod headers {
    pub const CONTENT_TYPE: &str = "Content-Type";
    pub const CONTENT_LENGTH: &str = "Content-Length";
    pub const ETAG: &str = "ETag";
}

/// Key side of a stored entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRequest {
    /// Address the entry is served at
    pub url: String,
    /// Always `GET` for synthesized entries
    pub method: String,
    /// Request headers (name, value)
    pub headers: Vec<(String, String)>,
}

impl StoredRequest {
    /// Build a `GET` request for `url` tagged with `mime`
    pub fn get(url: impl Into<String>, mime: &str) -> Self {
        Self {
            url: url.into(),
            method: "GET".to_string(),
            headers: vec![(headers::CONTENT_TYPE.to_string(), mime.to_string())],
        }
    }
}

/// Value side of a stored entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    #[serde(skip)]
    pub body: Vec<u8>,
    pub stored_at: DateTime<Utc>,
}

impl StoredResponse {
    /// Synthesize a `200` response carrying `body` as `mime`
    pub fn synthesize(body: Vec<u8>, mime: &str) -> Self {
        let etag = hex::encode(Sha256::digest(&body));
        Self {
            status: 200,
            status_text: STATUS_TEXT.to_string(),
            headers: vec![
                (headers::CONTENT_TYPE.to_string(), mime.to_string()),
                (headers::CONTENT_LENGTH.to_string(), body.len().to_string()),
                (headers::ETAG.to_string(), format!("\"{}\"", etag)),
            ],
            body,
            stored_at: Utc::now(),
        }
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// The response's content type, if tagged
    pub fn content_type(&self) -> Option<&str> {
        self.header(headers::CONTENT_TYPE)
    }

    /// Copy of this response re-tagged with a different content type
    pub fn with_content_type(&self, mime: &str) -> Self {
        let mut copy = self.clone();
        copy.headers
            .retain(|(key, _)| !key.eq_ignore_ascii_case(headers::CONTENT_TYPE));
        copy.headers
            .insert(0, (headers::CONTENT_TYPE.to_string(), mime.to_string()));
        copy
    }
}

/// One named request/response table
#[async_trait]
pub trait BackingStore: Send + Sync {
    /// Store `response` under `request.url`, replacing any previous entry
    async fn put(&self, request: StoredRequest, response: StoredResponse) -> PreviewResult<()>;

    /// Look up the response stored for `url`
    async fn lookup(&self, url: &str) -> PreviewResult<Option<StoredResponse>>;

    /// Delete the entry for `url`; `Ok(false)` if there was none
    async fn delete(&self, url: &str) -> PreviewResult<bool>;

    /// All stored addresses
    async fn keys(&self) -> PreviewResult<Vec<String>>;
}

/// A collection of named stores
#[async_trait]
pub trait StoreSet: Send + Sync {
    /// Capability probe: can this set hold stores at all?
    async fn is_available(&self) -> bool;

    /// Open (creating if needed) the store called `name`
    async fn open(&self, name: &str) -> PreviewResult<Arc<dyn BackingStore>>;

    /// Delete the store called `name`; `Ok(false)` if it did not exist
    async fn delete(&self, name: &str) -> PreviewResult<bool>;

    /// Human-readable name for display
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesized_response_headers() {
        let response = StoredResponse::synthesize(b"body{}".to_vec(), "text/css");
        assert_eq!(response.status, 200);
        assert_eq!(response.status_text, STATUS_TEXT);
        assert_eq!(response.content_type(), Some("text/css"));
        assert_eq!(response.header("content-length"), Some("6"));
        assert!(response.header("etag").is_some_and(|e| e.len() == 66));
    }

    #[test]
    fn retagging_replaces_content_type() {
        let response = StoredResponse::synthesize(b"x".to_vec(), "text/plain");
        let retagged = response.with_content_type("text/html");
        assert_eq!(retagged.content_type(), Some("text/html"));
        assert_eq!(
            retagged
                .headers
                .iter()
                .filter(|(k, _)| k == headers::CONTENT_TYPE)
                .count(),
            1
        );
        assert_eq!(retagged.body, response.body);
    }
}
