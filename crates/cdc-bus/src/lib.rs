//! Event bus abstraction for change events.
//!
//! The relay hands every change event to an [`EventBus`] as a [`BusEntry`]
//! and gets back the [`EntryId`] the bus assigned. Two implementations ship
//! with the crate:
//!
//! - [`InMemoryEventBus`] -- retains entries and fans them out to filtered
//!   subscribers over broadcast channels
//! - [`JsonLinesEventBus`] -- appends entries as JSON lines to any async writer

pub mod entry;
pub mod error;
pub mod jsonl;
pub mod memory;
pub mod traits;

pub use entry::{BusEntry, EntryId, PublishedEntry, MAX_ENTRY_SIZE};
pub use error::{BusError, BusResult};
pub use jsonl::JsonLinesEventBus;
pub use memory::{EntryFilter, EntryStream, InMemoryEventBus};
pub use traits::EventBus;
