use async_trait::async_trait;

use crate::entry::{BusEntry, EntryId};
use crate::error::BusResult;

/// Destination for change events.
///
/// A publish is a single attempt. Implementations must not retry internally;
/// a rejected or failed entry is reported to the caller as an error.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Submit one entry and return the id the bus assigned to it.
    async fn publish(&self, entry: &BusEntry) -> BusResult<EntryId>;
}
