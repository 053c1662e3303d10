use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::fs;
use tracing::{debug, warn};

use crate::blob::{validate_key, BlobMeta, SignedUrl, StoredBlob, DEFAULT_RETENTION, META_SUFFIX};
use crate::error::{StoreError, StoreResult};
use crate::signer::UrlSigner;
use crate::traits::BlobStore;

/// Blob store backed by a local directory.
///
/// Layout: `<root>/<bucket>/<key>` holds the body and
/// `<root>/<bucket>/<key>.meta.json` holds content type and expiry.
/// Writes go through a temporary file and a rename so readers never observe
/// a partially written body.
pub struct FsBlobStore {
    dir: PathBuf,
    bucket: String,
    retention: Duration,
    signer: UrlSigner,
}

impl FsBlobStore {
    /// Open (creating if needed) the bucket directory under `root`.
    pub async fn open(
        root: impl AsRef<Path>,
        bucket: impl Into<String>,
        signer: UrlSigner,
    ) -> StoreResult<Self> {
        let bucket = bucket.into();
        validate_key(&bucket)?;
        let dir = root.as_ref().join(&bucket);
        fs::create_dir_all(&dir).await?;
        debug!(dir = %dir.display(), "opened blob directory");
        Ok(Self {
            dir,
            bucket,
            retention: DEFAULT_RETENTION,
            signer,
        })
    }

    /// Override the retention window applied to new writes.
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// Directory holding this bucket's blobs.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn signer(&self) -> &UrlSigner {
        &self.signer
    }

    fn body_path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}{META_SUFFIX}"))
    }

    async fn write_atomic(path: &Path, data: &[u8]) -> StoreResult<()> {
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(format!(".{:08x}.tmp", rand::random::<u32>()));
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, data).await?;
        fs::rename(&tmp, path).await?;
        Ok(())
    }

    async fn read_meta(path: &Path) -> StoreResult<BlobMeta> {
        let raw = fs::read(path).await?;
        serde_json::from_slice(&raw).map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> StoreResult<StoredBlob> {
        validate_key(key)?;
        let blob = StoredBlob::new(key, body, content_type, Utc::now(), self.retention)?;
        let meta = serde_json::to_vec(&blob.meta())
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        Self::write_atomic(&self.body_path(key), &blob.body).await?;
        Self::write_atomic(&self.meta_path(key), &meta).await?;
        debug!(key, size = blob.size(), "blob written");
        Ok(blob)
    }

    async fn get(&self, key: &str) -> StoreResult<Option<StoredBlob>> {
        validate_key(key)?;
        let body = match fs::read(self.body_path(key)).await {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let meta = Self::read_meta(&self.meta_path(key)).await?;
        Ok(Some(StoredBlob {
            key: key.to_string(),
            body: Bytes::from(body),
            content_type: meta.content_type,
            written_at: meta.written_at,
            expires_at: meta.expires_at,
        }))
    }

    async fn signed_read_url(&self, key: &str, expires_in: Duration) -> StoreResult<SignedUrl> {
        validate_key(key)?;
        self.signer.presign(&self.bucket, key, expires_in, Utc::now())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        let mut removed = 0;
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let Some(key) = name.strip_suffix(META_SUFFIX) else {
                continue;
            };
            let meta = match Self::read_meta(&entry.path()).await {
                Ok(meta) => meta,
                Err(e) => {
                    warn!(key, error = %e, "skipping unreadable blob metadata");
                    continue;
                }
            };
            if now >= meta.expires_at {
                match fs::remove_file(self.body_path(key)).await {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
                fs::remove_file(entry.path()).await?;
                removed += 1;
            }
        }
        debug!(removed, "purged expired blobs");
        Ok(removed)
    }
}

impl std::fmt::Debug for FsBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsBlobStore")
            .field("dir", &self.dir)
            .field("bucket", &self.bucket)
            .finish()
    }
}
