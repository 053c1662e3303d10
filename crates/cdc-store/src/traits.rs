use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::blob::{SignedUrl, StoredBlob};
use crate::error::StoreResult;

/// Key-addressed blob store with a retention policy and signed reads.
///
/// All implementations must satisfy these invariants:
/// - `put` overwrites any existing blob under the same key, so writing a
///   deterministic key twice is idempotent.
/// - Every stored blob carries an expiry derived from the store's retention
///   policy. Callers never delete blobs; [`BlobStore::purge_expired`] plays
///   the role of the store-side lifecycle rule.
/// - Signed read references are bounded in time and verifiable.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Bucket (namespace) this store writes into.
    fn bucket(&self) -> &str;

    /// Write a blob and return it with its storage metadata.
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> StoreResult<StoredBlob>;

    /// Read a blob by key. Returns `Ok(None)` if it does not exist.
    async fn get(&self, key: &str) -> StoreResult<Option<StoredBlob>>;

    /// Check whether a blob exists.
    async fn exists(&self, key: &str) -> StoreResult<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// Produce a read reference to `key` that stays valid for `expires_in`.
    async fn signed_read_url(&self, key: &str, expires_in: Duration) -> StoreResult<SignedUrl>;

    /// Remove every blob whose retention has lapsed at `now`.
    ///
    /// Returns the number of blobs removed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<usize>;
}
