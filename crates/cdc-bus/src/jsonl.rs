use async_trait::async_trait;
use chrono::Utc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::debug;

use crate::entry::{BusEntry, EntryId, PublishedEntry};
use crate::error::{BusError, BusResult};
use crate::traits::EventBus;

/// Event bus that appends each accepted entry as one JSON line to a writer.
///
/// Lines are flushed per entry so a consumer tailing the sink sees events as
/// they are published.
pub struct JsonLinesEventBus<W> {
    writer: Mutex<W>,
}

impl<W> JsonLinesEventBus<W>
where
    W: AsyncWrite + Send + Unpin,
{
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Recover the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl JsonLinesEventBus<tokio::io::Stdout> {
    /// A sink writing to the process's standard output.
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

#[async_trait]
impl<W> EventBus for JsonLinesEventBus<W>
where
    W: AsyncWrite + Send + Unpin,
{
    async fn publish(&self, entry: &BusEntry) -> BusResult<EntryId> {
        entry.validate()?;
        let published = PublishedEntry {
            id: EntryId::new(),
            published_at: Utc::now(),
            entry: entry.clone(),
        };
        let mut line =
            serde_json::to_vec(&published).map_err(|e| BusError::Serialization(e.to_string()))?;
        line.push(b'\n');

        let mut writer = self.writer.lock().await;
        writer.write_all(&line).await?;
        writer.flush().await?;
        debug!(entry_id = %published.id, bytes = line.len(), "entry written");
        Ok(published.id)
    }
}

impl<W> std::fmt::Debug for JsonLinesEventBus<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonLinesEventBus").finish_non_exhaustive()
    }
}
