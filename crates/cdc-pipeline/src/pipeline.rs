use std::sync::Arc;

use tracing::debug;

use cdc_bus::{EntryId, EventBus};
use cdc_diff::diff_images;
use cdc_store::BlobStore;
use cdc_types::{normalize, ChangeEvent, KeySchema, Operation, StreamRecord};

use crate::config::CdcConfig;
use crate::error::PipelineResult;
use crate::publisher::EventPublisher;
use crate::router::PayloadRouter;

/// What happened to a record that made it through the pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Processed {
    /// A MODIFY whose images are identical. Nothing was published.
    NoChange,
    /// One event was accepted by the bus.
    Published {
        entry_id: EntryId,
        offloaded: bool,
        changed: Vec<String>,
    },
}

/// The per-record stages: normalize, diff, route, publish.
///
/// Stateless between records. Any stage failure aborts the record only.
pub struct RecordPipeline {
    schema: KeySchema,
    router: PayloadRouter,
    publisher: EventPublisher,
}

impl RecordPipeline {
    pub fn new(config: &CdcConfig, store: Arc<dyn BlobStore>, bus: Arc<dyn EventBus>) -> Self {
        Self {
            schema: config.key_schema(),
            router: PayloadRouter::new(store, config),
            publisher: EventPublisher::new(bus, config),
        }
    }

    pub fn schema(&self) -> &KeySchema {
        &self.schema
    }

    /// Build the change event for a record without publishing it.
    ///
    /// Returns `Ok(None)` for a MODIFY with no changed attributes. Images are
    /// offloaded here when the record is too large to carry them inline.
    pub async fn build_event(&self, record: &StreamRecord) -> PipelineResult<Option<ChangeEvent>> {
        let normalized = normalize(record, &self.schema)?;
        let diff = diff_images(normalized.new_image.as_ref(), normalized.old_image.as_ref())?;

        if normalized.operation == Operation::Modify && diff.is_empty() {
            return Ok(None);
        }

        let payload = self.router.route(&normalized).await?;
        Ok(Some(ChangeEvent {
            after: diff.after,
            attributes_changed: diff.changed,
            before: diff.before,
            payload,
            operation: normalized.operation,
            pk: normalized.keys.pk,
            sk: normalized.keys.sk,
        }))
    }

    pub async fn process(&self, record: &StreamRecord) -> PipelineResult<Processed> {
        let Some(event) = self.build_event(record).await? else {
            debug!(event_id = record.display_id(), "no attributes changed");
            return Ok(Processed::NoChange);
        };

        let entry_id = self.publisher.publish(&event).await?;
        Ok(Processed::Published {
            entry_id,
            offloaded: event.is_offloaded(),
            changed: event.attributes_changed,
        })
    }
}

impl std::fmt::Debug for RecordPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordPipeline")
            .field("schema", &self.schema)
            .field("router", &self.router)
            .field("publisher", &self.publisher)
            .finish()
    }
}
