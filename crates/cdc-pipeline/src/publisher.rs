use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use cdc_bus::{BusEntry, BusError, EntryId, EventBus};
use cdc_types::ChangeEvent;

use crate::config::{CdcConfig, DETAIL_TYPE};
use crate::error::PipelineResult;

/// Wraps change events in bus entries and submits them, one attempt each.
pub struct EventPublisher {
    bus: Arc<dyn EventBus>,
    source: String,
    bus_name: String,
    io_timeout: Duration,
}

impl EventPublisher {
    pub fn new(bus: Arc<dyn EventBus>, config: &CdcConfig) -> Self {
        Self {
            bus,
            source: config.event_source.clone(),
            bus_name: config.bus_name.clone(),
            io_timeout: config.io_timeout(),
        }
    }

    /// Build the bus entry for an event without submitting it.
    pub fn entry(&self, event: &ChangeEvent) -> PipelineResult<BusEntry> {
        let detail =
            serde_json::to_string(event).map_err(|e| BusError::Serialization(e.to_string()))?;
        Ok(BusEntry::new(&self.source, DETAIL_TYPE, detail, &self.bus_name))
    }

    pub async fn publish(&self, event: &ChangeEvent) -> PipelineResult<EntryId> {
        let entry = self.entry(event)?;
        let id = tokio::time::timeout(self.io_timeout, self.bus.publish(&entry))
            .await
            .map_err(|_| BusError::Unavailable(format!("timed out after {:?}", self.io_timeout)))??;
        debug!(entry_id = %id, pk = %event.pk, operation = %event.operation, "event published");
        Ok(id)
    }
}

impl std::fmt::Debug for EventPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventPublisher")
            .field("source", &self.source)
            .field("bus_name", &self.bus_name)
            .finish_non_exhaustive()
    }
}
