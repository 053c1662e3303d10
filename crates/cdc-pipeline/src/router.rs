use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::debug;

use cdc_store::{BlobStore, StoreError, StoreResult, JSON_CONTENT_TYPE};
use cdc_types::{ImageBundle, ImagePayload, NormalizedRecord, Operation};

use crate::config::CdcConfig;
use crate::error::PipelineResult;

/// Decides how a record's full images travel with its event.
///
/// Small records embed their images. Everything else is written to the blob
/// store under `<event id>.json` and the event carries a signed reference
/// instead.
pub struct PayloadRouter {
    store: Arc<dyn BlobStore>,
    threshold: u64,
    ttl: Duration,
    io_timeout: Duration,
}

impl PayloadRouter {
    pub fn new(store: Arc<dyn BlobStore>, config: &CdcConfig) -> Self {
        Self {
            store,
            threshold: config.size_threshold,
            ttl: config.offload_ttl(),
            io_timeout: config.io_timeout(),
        }
    }

    /// Whether a record of the reported size travels inline.
    ///
    /// A record with no size, or a size of zero, is offloaded.
    pub fn is_inline(&self, size_bytes: Option<u64>) -> bool {
        matches!(size_bytes, Some(size) if size > 0 && size < self.threshold)
    }

    /// Blob key for a record's offloaded images.
    pub fn blob_key(event_id: &str) -> String {
        format!("{event_id}.json")
    }

    pub async fn route(&self, record: &NormalizedRecord) -> PipelineResult<ImagePayload> {
        if self.is_inline(record.size_bytes) {
            let old_image = match record.operation {
                Operation::Remove => record.old_image.clone(),
                Operation::Insert | Operation::Modify => None,
            };
            return Ok(ImagePayload::Inline {
                new_image: record.new_image.clone(),
                old_image,
            });
        }

        let images_url = self.offload(record).await?;
        Ok(ImagePayload::Offloaded { images_url })
    }

    async fn offload(&self, record: &NormalizedRecord) -> StoreResult<String> {
        let bundle = ImageBundle {
            old_image: record.old_image.clone(),
            new_image: record.new_image.clone(),
        };
        let body = serde_json::to_vec(&bundle).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let key = Self::blob_key(&record.event_id);

        let blob = bounded(
            self.io_timeout,
            self.store.put(&key, Bytes::from(body), JSON_CONTENT_TYPE),
        )
        .await?;
        let signed = bounded(self.io_timeout, self.store.signed_read_url(&key, self.ttl)).await?;

        debug!(
            event_id = %record.event_id,
            key = %key,
            size = blob.size(),
            url_expires_at = %signed.expires_at,
            "images offloaded"
        );
        Ok(signed.url)
    }
}

async fn bounded<T>(
    limit: Duration,
    call: impl Future<Output = StoreResult<T>>,
) -> StoreResult<T> {
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| StoreError::Unavailable(format!("timed out after {limit:?}")))?
}

impl std::fmt::Debug for PayloadRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayloadRouter")
            .field("bucket", &self.store.bucket())
            .field("threshold", &self.threshold)
            .field("ttl", &self.ttl)
            .finish()
    }
}
