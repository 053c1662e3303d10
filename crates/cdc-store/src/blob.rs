use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Content type used for offloaded item images.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Default lifecycle window after which stored blobs are collected.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

/// A blob together with its storage metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredBlob {
    pub key: String,
    pub body: Bytes,
    pub content_type: String,
    pub written_at: DateTime<Utc>,
    /// When the retention policy makes the blob eligible for collection.
    pub expires_at: DateTime<Utc>,
}

impl StoredBlob {
    /// Build a blob written at `written_at` under the given retention.
    pub fn new(
        key: impl Into<String>,
        body: Bytes,
        content_type: impl Into<String>,
        written_at: DateTime<Utc>,
        retention: Duration,
    ) -> StoreResult<Self> {
        Ok(Self {
            key: key.into(),
            body,
            content_type: content_type.into(),
            written_at,
            expires_at: written_at + to_chrono(retention)?,
        })
    }

    /// Size of the body in bytes.
    pub fn size(&self) -> usize {
        self.body.len()
    }

    /// Returns `true` once `now` has reached the expiry time.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Metadata persisted alongside the body by file-backed stores.
    pub fn meta(&self) -> BlobMeta {
        BlobMeta {
            content_type: self.content_type.clone(),
            written_at: self.written_at,
            expires_at: self.expires_at,
        }
    }
}

/// Blob metadata without the body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobMeta {
    pub content_type: String,
    pub written_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// A time-limited read reference to a stored blob.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedUrl {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

pub(crate) fn to_chrono(duration: Duration) -> StoreResult<chrono::Duration> {
    chrono::Duration::from_std(duration)
        .map_err(|e| StoreError::InvalidExpiry(format!("{duration:?}: {e}")))
}

/// Reject keys that cannot be mapped onto a flat object namespace.
pub fn validate_key(key: &str) -> StoreResult<()> {
    if key.is_empty() {
        return Err(StoreError::invalid_key(key, "key is empty"));
    }
    if key.contains('/') || key.contains('\\') {
        return Err(StoreError::invalid_key(key, "key contains a path separator"));
    }
    if key == "." || key == ".." {
        return Err(StoreError::invalid_key(key, "key is a relative path"));
    }
    if key.ends_with(META_SUFFIX) {
        return Err(StoreError::invalid_key(key, "key uses the reserved metadata suffix"));
    }
    Ok(())
}

pub(crate) const META_SUFFIX: &str = ".meta.json";
