use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::blob::{validate_key, SignedUrl, StoredBlob, DEFAULT_RETENTION};
use crate::error::StoreResult;
use crate::signer::UrlSigner;
use crate::traits::BlobStore;

/// In-memory, HashMap-based blob store.
///
/// Intended for tests and embedding. Blobs are held behind a `RwLock` and
/// cloned on read. `Bytes` bodies make the clones cheap.
pub struct InMemoryBlobStore {
    bucket: String,
    retention: Duration,
    signer: UrlSigner,
    blobs: RwLock<HashMap<String, StoredBlob>>,
}

impl InMemoryBlobStore {
    /// Create an empty store for `bucket` with the default 24h retention and
    /// a random signing key.
    pub fn new(bucket: impl Into<String>) -> Self {
        let bucket = bucket.into();
        let signer = UrlSigner::random(format!("memory://{bucket}"));
        Self::with_signer(bucket, signer)
    }

    /// Create an empty store that signs references with `signer`.
    pub fn with_signer(bucket: impl Into<String>, signer: UrlSigner) -> Self {
        Self {
            bucket: bucket.into(),
            retention: DEFAULT_RETENTION,
            signer,
            blobs: RwLock::new(HashMap::new()),
        }
    }

    /// Override the retention window applied to new writes.
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn signer(&self) -> &UrlSigner {
        &self.signer
    }

    /// Number of blobs currently stored.
    pub fn len(&self) -> usize {
        self.blobs.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.blobs.read().expect("lock poisoned").is_empty()
    }

    /// Sorted list of stored keys.
    pub fn keys(&self) -> Vec<String> {
        let map = self.blobs.read().expect("lock poisoned");
        let mut keys: Vec<String> = map.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> StoreResult<StoredBlob> {
        validate_key(key)?;
        let blob = StoredBlob::new(key, body, content_type, Utc::now(), self.retention)?;
        self.blobs
            .write()
            .expect("lock poisoned")
            .insert(key.to_string(), blob.clone());
        Ok(blob)
    }

    async fn get(&self, key: &str) -> StoreResult<Option<StoredBlob>> {
        let map = self.blobs.read().expect("lock poisoned");
        Ok(map.get(key).cloned())
    }

    async fn signed_read_url(&self, key: &str, expires_in: Duration) -> StoreResult<SignedUrl> {
        validate_key(key)?;
        self.signer.presign(&self.bucket, key, expires_in, Utc::now())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        let mut map = self.blobs.write().expect("lock poisoned");
        let before = map.len();
        map.retain(|_, blob| !blob.is_expired(now));
        Ok(before - map.len())
    }
}

impl std::fmt::Debug for InMemoryBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBlobStore")
            .field("bucket", &self.bucket)
            .field("blob_count", &self.len())
            .finish()
    }
}
