use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BusError, BusResult};

/// Largest entry, in bytes of source + detail type + detail, a bus accepts.
pub const MAX_ENTRY_SIZE: usize = 256 * 1024;

/// Identifier assigned by the bus to an accepted entry (UUID v7 for
/// time-ordering).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryId(uuid::Uuid);

impl EntryId {
    /// Generate a new time-ordered entry ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7())
    }

    pub fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }

    /// Short representation (first 8 characters of UUID).
    pub fn short_id(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntryId({})", self.short_id())
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One entry submitted to the bus.
///
/// `detail` carries the serialized event body. Field names on the wire follow
/// the upstream put-events request shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BusEntry {
    pub source: String,
    pub detail_type: String,
    pub detail: String,
    #[serde(rename = "EventBusName")]
    pub bus_name: String,
}

impl BusEntry {
    pub fn new(
        source: impl Into<String>,
        detail_type: impl Into<String>,
        detail: impl Into<String>,
        bus_name: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            detail_type: detail_type.into(),
            detail: detail.into(),
            bus_name: bus_name.into(),
        }
    }

    /// Bytes counted against [`MAX_ENTRY_SIZE`].
    pub fn size(&self) -> usize {
        self.source.len() + self.detail_type.len() + self.detail.len()
    }

    /// Parse the detail back into JSON.
    pub fn detail_json(&self) -> BusResult<serde_json::Value> {
        serde_json::from_str(&self.detail).map_err(|e| BusError::Serialization(e.to_string()))
    }

    /// Check the entry against the bus acceptance rules.
    ///
    /// The [`MAX_ENTRY_SIZE`] limit covers the whole detail. A change event
    /// whose images were offloaded still carries its `before`/`after`
    /// branches inline, so an INSERT or REMOVE of an item near the limit is
    /// rejected here even though its images went to the blob store.
    pub fn validate(&self) -> BusResult<()> {
        if self.source.is_empty() {
            return Err(BusError::Rejected("source is empty".into()));
        }
        if self.detail_type.is_empty() {
            return Err(BusError::Rejected("detail type is empty".into()));
        }
        if self.bus_name.is_empty() {
            return Err(BusError::Rejected("bus name is empty".into()));
        }
        if self.size() > MAX_ENTRY_SIZE {
            return Err(BusError::Rejected(format!(
                "entry is {} bytes, limit is {MAX_ENTRY_SIZE}",
                self.size()
            )));
        }
        match self.detail_json() {
            Ok(serde_json::Value::Object(_)) => Ok(()),
            Ok(_) => Err(BusError::Rejected("detail is not a JSON object".into())),
            Err(_) => Err(BusError::Rejected("detail is not valid JSON".into())),
        }
    }
}

/// An entry as recorded by a bus after acceptance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedEntry {
    pub id: EntryId,
    pub published_at: DateTime<Utc>,
    #[serde(flatten)]
    pub entry: BusEntry,
}
