use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::broadcast;
use tracing::debug;

use crate::entry::{BusEntry, EntryId, PublishedEntry};
use crate::error::BusResult;
use crate::traits::EventBus;

/// Filter for subscribing to a subset of published entries.
#[derive(Clone, Debug, Default)]
pub struct EntryFilter {
    /// If set, only entries from these sources are delivered.
    pub sources: Option<Vec<String>>,
    /// If set, only entries with these detail types are delivered.
    pub detail_types: Option<Vec<String>>,
    /// If set, only entries addressed to these buses are delivered.
    pub bus_names: Option<Vec<String>>,
}

impl EntryFilter {
    /// Returns `true` if the given entry matches this filter.
    pub fn matches(&self, entry: &BusEntry) -> bool {
        if let Some(ref sources) = self.sources {
            if !sources.contains(&entry.source) {
                return false;
            }
        }
        if let Some(ref types) = self.detail_types {
            if !types.contains(&entry.detail_type) {
                return false;
            }
        }
        if let Some(ref buses) = self.bus_names {
            if !buses.contains(&entry.bus_name) {
                return false;
            }
        }
        true
    }
}

/// A broadcast channel receiver for published entries.
pub type EntryStream = broadcast::Receiver<PublishedEntry>;

struct Subscriber {
    filter: EntryFilter,
    sender: broadcast::Sender<PublishedEntry>,
}

/// Fan-out router that delivers entries to matching subscribers.
struct EntryRouter {
    subscribers: RwLock<Vec<Subscriber>>,
}

impl EntryRouter {
    fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
        }
    }

    fn subscribe(&self, filter: EntryFilter, capacity: usize) -> EntryStream {
        let (sender, rx) = broadcast::channel(capacity);
        self.subscribers
            .write()
            .expect("router lock poisoned")
            .push(Subscriber { filter, sender });
        rx
    }

    /// Subscribers whose receivers have all been dropped are pruned.
    fn route(&self, published: &PublishedEntry) {
        let mut subs = self.subscribers.write().expect("router lock poisoned");
        subs.retain(|sub| {
            if sub.filter.matches(&published.entry) {
                sub.sender.send(published.clone()).is_ok()
            } else {
                sub.sender.receiver_count() > 0
            }
        });
    }

    fn subscriber_count(&self) -> usize {
        self.subscribers.read().expect("router lock poisoned").len()
    }
}

/// In-process event bus.
///
/// Every accepted entry is retained in publish order and fanned out to
/// filtered subscribers. Used by tests and by embedders that consume change
/// events in the same process.
pub struct InMemoryEventBus {
    entries: RwLock<Vec<PublishedEntry>>,
    router: EntryRouter,
    channel_capacity: usize,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    /// Create a bus whose per-subscriber channels hold `channel_capacity`
    /// entries before lagging.
    pub fn with_capacity(channel_capacity: usize) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            router: EntryRouter::new(),
            channel_capacity,
        }
    }

    /// Subscribe to entries matching `filter` published from now on.
    pub fn subscribe(&self, filter: EntryFilter) -> EntryStream {
        self.router.subscribe(filter, self.channel_capacity)
    }

    pub fn subscriber_count(&self) -> usize {
        self.router.subscriber_count()
    }

    /// All accepted entries in publish order.
    pub fn entries(&self) -> Vec<PublishedEntry> {
        self.entries.read().expect("lock poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().expect("lock poisoned").is_empty()
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn publish(&self, entry: &BusEntry) -> BusResult<EntryId> {
        entry.validate()?;
        let published = PublishedEntry {
            id: EntryId::new(),
            published_at: Utc::now(),
            entry: entry.clone(),
        };
        let id = published.id.clone();

        self.router.route(&published);
        self.entries.write().expect("lock poisoned").push(published);
        debug!(entry_id = %id, source = %entry.source, "entry published");
        Ok(id)
    }
}

impl std::fmt::Debug for InMemoryEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryEventBus")
            .field("entries", &self.len())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
