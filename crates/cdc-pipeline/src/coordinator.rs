use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use cdc_bus::{EntryId, EventBus};
use cdc_store::BlobStore;
use cdc_types::{StreamEvent, StreamRecord, TypeError};

use crate::config::CdcConfig;
use crate::error::{ConfigResult, PipelineError};
use crate::filter::KeyFilter;
use crate::pipeline::{Processed, RecordPipeline};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Why a record was passed over without an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// A mandatory top-level field was absent.
    MissingField(&'static str),
    /// The partition key did not match the configured filter.
    Filtered,
    /// A MODIFY whose images are identical.
    NoChange,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "missing {field}"),
            Self::Filtered => f.write_str("filtered"),
            Self::NoChange => f.write_str("no change"),
        }
    }
}

/// The result of one record.
#[derive(Debug)]
pub enum RecordOutcome {
    Skipped(SkipReason),
    Failed(PipelineError),
    /// The task running the record panicked.
    Panicked(String),
    Published {
        entry_id: EntryId,
        offloaded: bool,
        changed: Vec<String>,
    },
}

impl RecordOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, Self::Published { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_) | Self::Panicked(_))
    }
}

impl From<Processed> for RecordOutcome {
    fn from(processed: Processed) -> Self {
        match processed {
            Processed::NoChange => Self::Skipped(SkipReason::NoChange),
            Processed::Published {
                entry_id,
                offloaded,
                changed,
            } => Self::Published {
                entry_id,
                offloaded,
                changed,
            },
        }
    }
}

/// One record's outcome, tagged with its event id when it had one.
#[derive(Debug)]
pub struct RecordReport {
    pub event_id: Option<String>,
    pub outcome: RecordOutcome,
}

/// Outcomes of a whole batch, in input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub records: Vec<RecordReport>,
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn published(&self) -> usize {
        self.records.iter().filter(|r| r.outcome.is_published()).count()
    }

    pub fn skipped(&self) -> usize {
        self.records.iter().filter(|r| r.outcome.is_skipped()).count()
    }

    pub fn failed(&self) -> usize {
        self.records.iter().filter(|r| r.outcome.is_failed()).count()
    }

    /// Records that failed, with their event ids.
    pub fn failures(&self) -> impl Iterator<Item = &RecordReport> {
        self.records.iter().filter(|r| r.outcome.is_failed())
    }
}

// ---------------------------------------------------------------------------
// BatchCoordinator
// ---------------------------------------------------------------------------

/// Runs every record of a batch through the pipeline and isolates failures.
///
/// A batch never fails as a whole. Each record ends up published, skipped,
/// or failed, and the caller acknowledges the batch regardless.
pub struct BatchCoordinator {
    pipeline: Arc<RecordPipeline>,
    filter: Option<KeyFilter>,
    max_concurrency: usize,
}

impl BatchCoordinator {
    pub fn new(
        config: &CdcConfig,
        store: Arc<dyn BlobStore>,
        bus: Arc<dyn EventBus>,
    ) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            pipeline: Arc::new(RecordPipeline::new(config, store, bus)),
            filter: config.key_filter()?,
            max_concurrency: config.max_concurrency,
        })
    }

    pub fn pipeline(&self) -> &RecordPipeline {
        &self.pipeline
    }

    /// Process a raw batch. Records are decoded one at a time, so a record
    /// that does not decode fails as malformed without touching the others.
    pub async fn process_event(&self, event: StreamEvent) -> BatchReport {
        self.run(event.records.into_iter().map(Pending::decode).collect()).await
    }

    pub async fn process_batch(&self, records: Vec<StreamRecord>) -> BatchReport {
        self.run(records.into_iter().map(Pending::Ready).collect()).await
    }

    async fn run(&self, batch: Vec<Pending>) -> BatchReport {
        let start = Instant::now();
        let records = if self.max_concurrency > 1 {
            self.run_concurrent(batch).await
        } else {
            self.run_sequential(batch).await
        };

        let report = BatchReport {
            records,
            elapsed: start.elapsed(),
        };
        info!(
            records = report.len(),
            published = report.published(),
            skipped = report.skipped(),
            failed = report.failed(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "batch processed"
        );
        report
    }

    /// One record at a time, in input order. Each record still runs on its
    /// own task so a panic is contained to that record.
    async fn run_sequential(&self, batch: Vec<Pending>) -> Vec<RecordReport> {
        let mut reports = Vec::with_capacity(batch.len());
        for pending in batch {
            let event_id = pending.event_id();
            let outcome = match self.admit(pending) {
                Err(outcome) => outcome,
                Ok(record) => {
                    let pipeline = Arc::clone(&self.pipeline);
                    let task = tokio::spawn(async move { run_pipeline(&pipeline, &record).await });
                    match task.await {
                        Ok(outcome) => outcome,
                        Err(e) => panicked(event_id.as_deref(), e),
                    }
                }
            };
            reports.push(RecordReport { event_id, outcome });
        }
        reports
    }

    async fn run_concurrent(&self, batch: Vec<Pending>) -> Vec<RecordReport> {
        let limiter = Arc::new(Semaphore::new(self.max_concurrency));
        let mut slots: Vec<Option<RecordReport>> = Vec::with_capacity(batch.len());
        let mut tasks = JoinSet::new();
        let mut positions = HashMap::new();
        let mut event_ids = Vec::with_capacity(batch.len());

        for (index, pending) in batch.into_iter().enumerate() {
            let event_id = pending.event_id();
            event_ids.push(event_id.clone());
            let record = match self.admit(pending) {
                Ok(record) => record,
                Err(outcome) => {
                    slots.push(Some(RecordReport { event_id, outcome }));
                    continue;
                }
            };
            slots.push(None);

            let pipeline = Arc::clone(&self.pipeline);
            let limiter = Arc::clone(&limiter);
            let handle = tasks.spawn(async move {
                // The semaphore is never closed.
                let _permit = limiter.acquire_owned().await.ok();
                run_pipeline(&pipeline, &record).await
            });
            positions.insert(handle.id(), index);
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            let (index, outcome) = match joined {
                Ok((id, outcome)) => (positions.get(&id).copied(), outcome),
                Err(e) => {
                    let index = positions.get(&e.id()).copied();
                    let event_id = index.and_then(|i| event_ids[i].as_deref());
                    (index, panicked(event_id, e))
                }
            };
            if let Some(index) = index {
                slots[index] = Some(RecordReport {
                    event_id: event_ids[index].clone(),
                    outcome,
                });
            }
        }

        slots
            .into_iter()
            .zip(event_ids)
            .map(|(slot, event_id)| {
                slot.unwrap_or(RecordReport {
                    event_id,
                    outcome: RecordOutcome::Panicked("task result lost".into()),
                })
            })
            .collect()
    }

    /// Pre-pipeline checks. Hands back the record to run, or the outcome
    /// that settles it without running the pipeline.
    fn admit(&self, pending: Pending) -> Result<StreamRecord, RecordOutcome> {
        let record = match pending {
            Pending::Ready(record) => record,
            Pending::Undecodable { event_id, error } => {
                let error = PipelineError::from(error);
                error!(
                    event_id = event_id.as_deref().unwrap_or("<none>"),
                    kind = error.kind(),
                    error = %error,
                    "record failed"
                );
                return Err(RecordOutcome::Failed(error));
            }
        };
        if let Some(field) = record.missing_field() {
            debug!(event_id = record.display_id(), field, "record skipped: missing field");
            return Err(RecordOutcome::Skipped(SkipReason::MissingField(field)));
        }
        if let Some(filter) = &self.filter {
            if !filter.matches_record(&record, &self.pipeline.schema().partition_key) {
                warn!(event_id = record.display_id(), "record skipped: key filtered");
                return Err(RecordOutcome::Skipped(SkipReason::Filtered));
            }
        }
        Ok(record)
    }
}

/// A batch entry before admission.
enum Pending {
    Ready(StreamRecord),
    Undecodable {
        event_id: Option<String>,
        error: TypeError,
    },
}

impl Pending {
    fn decode(raw: Value) -> Self {
        let event_id = StreamRecord::raw_event_id(&raw);
        match StreamRecord::decode(raw) {
            Ok(record) => Self::Ready(record),
            Err(error) => Self::Undecodable { event_id, error },
        }
    }

    fn event_id(&self) -> Option<String> {
        match self {
            Self::Ready(record) => record.event_id.clone(),
            Self::Undecodable { event_id, .. } => event_id.clone(),
        }
    }
}

async fn run_pipeline(pipeline: &RecordPipeline, record: &StreamRecord) -> RecordOutcome {
    debug!(
        event_id = record.display_id(),
        operation = record.event_name.as_deref().unwrap_or_default(),
        "processing record"
    );
    match pipeline.process(record).await {
        Ok(processed) => processed.into(),
        Err(e) => {
            error!(
                event_id = record.display_id(),
                operation = record.event_name.as_deref().unwrap_or_default(),
                kind = e.kind(),
                error = %e,
                "record failed"
            );
            RecordOutcome::Failed(e)
        }
    }
}

fn panicked(event_id: Option<&str>, e: JoinError) -> RecordOutcome {
    let message = match e.try_into_panic() {
        Ok(payload) => payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "record task panicked".into()),
        Err(e) => e.to_string(),
    };
    error!(event_id = event_id.unwrap_or("<none>"), panic = %message, "record task panicked");
    RecordOutcome::Panicked(message)
}

impl std::fmt::Debug for BatchCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchCoordinator")
            .field("pipeline", &self.pipeline)
            .field("filter", &self.filter)
            .field("max_concurrency", &self.max_concurrency)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use cdc_bus::{BusEntry, BusError, BusResult, InMemoryEventBus};
    use cdc_store::{InMemoryBlobStore, SignedUrl, StoreError, StoreResult, StoredBlob};
    use cdc_types::{marshall, StreamPayload};
    use chrono::{DateTime, Utc};
    use serde_json::{json, Map, Value};

    // -----------------------------------------------------------------------
    // Fixtures
    // -----------------------------------------------------------------------

    fn typed(value: Value) -> Map<String, Value> {
        marshall(value.as_object().unwrap())
    }

    fn insert(event_id: &str, pk: &str, size: u64) -> StreamRecord {
        StreamRecord {
            event_id: Some(event_id.into()),
            event_name: Some("INSERT".into()),
            dynamodb: Some(StreamPayload {
                keys: Some(typed(json!({"pk": pk, "sk": "meta"}))),
                new_image: Some(typed(json!({"pk": pk, "sk": "meta", "v": 1}))),
                old_image: None,
                size_bytes: Some(size),
            }),
        }
    }

    fn coordinator(config: CdcConfig) -> (BatchCoordinator, Arc<InMemoryEventBus>) {
        let bus = Arc::new(InMemoryEventBus::new());
        let store = Arc::new(InMemoryBlobStore::new("cdc"));
        (BatchCoordinator::new(&config, store, bus.clone()).unwrap(), bus)
    }

    fn published_pks(bus: &InMemoryEventBus) -> Vec<String> {
        bus.entries()
            .iter()
            .map(|e| e.entry.detail_json().unwrap()["pk"].as_str().unwrap().to_string())
            .collect()
    }

    /// Bus that rejects any event for partition key `poison`.
    struct PoisonBus(InMemoryEventBus);

    #[async_trait]
    impl EventBus for PoisonBus {
        async fn publish(&self, entry: &BusEntry) -> BusResult<EntryId> {
            if entry.detail_json()?["pk"] == "poison" {
                return Err(BusError::Unavailable("bus endpoint unreachable".into()));
            }
            self.0.publish(entry).await
        }
    }

    /// Bus that panics on any event for partition key `boom`.
    struct PanickingBus(InMemoryEventBus);

    #[async_trait]
    impl EventBus for PanickingBus {
        async fn publish(&self, entry: &BusEntry) -> BusResult<EntryId> {
            if entry.detail_json()?["pk"] == "boom" {
                panic!("bus client crashed");
            }
            self.0.publish(entry).await
        }
    }

    /// Store that refuses every write.
    struct ReadOnlyStore;

    #[async_trait]
    impl BlobStore for ReadOnlyStore {
        fn bucket(&self) -> &str {
            "read-only"
        }
        async fn put(&self, key: &str, _: Bytes, _: &str) -> StoreResult<StoredBlob> {
            Err(StoreError::Unavailable(format!("write to {key} denied")))
        }
        async fn get(&self, _: &str) -> StoreResult<Option<StoredBlob>> {
            Ok(None)
        }
        async fn signed_read_url(&self, _: &str, _: Duration) -> StoreResult<SignedUrl> {
            Err(StoreError::Unavailable("no signer".into()))
        }
        async fn purge_expired(&self, _: DateTime<Utc>) -> StoreResult<usize> {
            Ok(0)
        }
    }

    // -----------------------------------------------------------------------
    // Isolation
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn record_missing_keys_does_not_stop_batch() {
        let (coordinator, bus) = coordinator(CdcConfig::default());
        let mut records: Vec<StreamRecord> = (1..=5)
            .map(|i| insert(&format!("e-{i}"), &format!("t#{i}"), 100))
            .collect();
        if let Some(payload) = records[2].dynamodb.as_mut() {
            payload.keys = None;
        }

        let report = coordinator.process_batch(records).await;
        assert_eq!(report.len(), 5);
        assert_eq!(report.published(), 4);
        assert_eq!(report.failed(), 1);
        assert!(matches!(
            report.records[2].outcome,
            RecordOutcome::Failed(PipelineError::MalformedRecord(_))
        ));
        assert_eq!(report.records[2].event_id.as_deref(), Some("e-3"));
        assert_eq!(published_pks(&bus), vec!["t#1", "t#2", "t#4", "t#5"]);
    }

    #[tokio::test]
    async fn undecodable_records_fail_alone() {
        let (coordinator, bus) = coordinator(CdcConfig::default());
        let mut bad_image = serde_json::to_value(insert("e-2", "b", 100)).unwrap();
        bad_image["dynamodb"]["NewImage"] = json!([]);
        let mut bad_size = serde_json::to_value(insert("e-3", "c", 100)).unwrap();
        bad_size["dynamodb"]["SizeBytes"] = json!("x");
        let event = StreamEvent {
            records: vec![
                serde_json::to_value(insert("e-1", "a", 100)).unwrap(),
                bad_image,
                bad_size,
                json!("not a record"),
                serde_json::to_value(insert("e-5", "e", 100)).unwrap(),
            ],
        };

        let report = coordinator.process_event(event).await;
        assert_eq!(report.len(), 5);
        assert_eq!(report.published(), 2);
        assert_eq!(report.failed(), 3);
        for i in 1..=3 {
            assert!(matches!(
                report.records[i].outcome,
                RecordOutcome::Failed(PipelineError::MalformedRecord(TypeError::UndecodableRecord(_)))
            ));
        }
        assert_eq!(report.records[1].event_id.as_deref(), Some("e-2"));
        assert_eq!(report.records[2].event_id.as_deref(), Some("e-3"));
        assert_eq!(report.records[3].event_id, None);
        assert_eq!(published_pks(&bus), vec!["a", "e"]);
    }

    #[tokio::test]
    async fn undecodable_records_fail_alone_when_concurrent() {
        let config = CdcConfig {
            max_concurrency: 3,
            ..Default::default()
        };
        let (coordinator, bus) = coordinator(config);
        let mut bad = serde_json::to_value(insert("e-2", "b", 100)).unwrap();
        bad["dynamodb"]["NewImage"] = json!([]);
        let event = StreamEvent {
            records: vec![
                serde_json::to_value(insert("e-1", "a", 100)).unwrap(),
                bad,
                serde_json::to_value(insert("e-3", "c", 100)).unwrap(),
            ],
        };

        let report = coordinator.process_event(event).await;
        assert_eq!(report.published(), 2);
        assert!(matches!(
            report.records[1].outcome,
            RecordOutcome::Failed(PipelineError::MalformedRecord(_))
        ));
        assert_eq!(bus.len(), 2);
    }

    #[tokio::test]
    async fn panic_in_sequential_batch_is_contained() {
        let bus = Arc::new(PanickingBus(InMemoryEventBus::new()));
        let store = Arc::new(InMemoryBlobStore::new("cdc"));
        let coordinator = BatchCoordinator::new(&CdcConfig::default(), store, bus.clone()).unwrap();

        let report = coordinator
            .process_batch(vec![
                insert("e-1", "a", 100),
                insert("e-2", "boom", 100),
                insert("e-3", "b", 100),
            ])
            .await;

        assert_eq!(report.published(), 2);
        assert_eq!(report.failed(), 1);
        match &report.records[1].outcome {
            RecordOutcome::Panicked(message) => assert_eq!(message, "bus client crashed"),
            other => panic!("expected a panicked outcome, got {other:?}"),
        }
        assert_eq!(report.records[1].event_id.as_deref(), Some("e-2"));
        assert_eq!(published_pks(&bus.0), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn panic_in_concurrent_batch_is_contained() {
        let config = CdcConfig {
            max_concurrency: 2,
            ..Default::default()
        };
        let bus = Arc::new(PanickingBus(InMemoryEventBus::new()));
        let store = Arc::new(InMemoryBlobStore::new("cdc"));
        let coordinator = BatchCoordinator::new(&config, store, bus.clone()).unwrap();

        let report = coordinator
            .process_batch(vec![
                insert("e-1", "a", 100),
                insert("e-2", "boom", 100),
                insert("e-3", "b", 100),
            ])
            .await;

        assert_eq!(report.published(), 2);
        assert!(matches!(
            &report.records[1].outcome,
            RecordOutcome::Panicked(message) if message == "bus client crashed"
        ));
        assert_eq!(report.records[1].event_id.as_deref(), Some("e-2"));
        assert_eq!(bus.0.len(), 2);
    }

    #[tokio::test]
    async fn publish_failure_is_isolated() {
        let inner = InMemoryEventBus::new();
        let bus = Arc::new(PoisonBus(inner));
        let store = Arc::new(InMemoryBlobStore::new("cdc"));
        let coordinator = BatchCoordinator::new(&CdcConfig::default(), store, bus.clone()).unwrap();

        let report = coordinator
            .process_batch(vec![
                insert("e-1", "a", 100),
                insert("e-2", "poison", 100),
                insert("e-3", "b", 100),
            ])
            .await;

        assert_eq!(report.published(), 2);
        let failures: Vec<_> = report.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].event_id.as_deref(), Some("e-2"));
        assert!(matches!(
            failures[0].outcome,
            RecordOutcome::Failed(PipelineError::PublishFailure(_))
        ));
        assert_eq!(published_pks(&bus.0), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn offload_failure_is_isolated() {
        let bus = Arc::new(InMemoryEventBus::new());
        let coordinator =
            BatchCoordinator::new(&CdcConfig::default(), Arc::new(ReadOnlyStore), bus.clone())
                .unwrap();

        let report = coordinator
            .process_batch(vec![
                insert("e-1", "small", 100),
                insert("e-2", "large", 200_000),
                insert("e-3", "small-too", 100),
            ])
            .await;

        assert_eq!(report.published(), 2);
        assert!(matches!(
            report.records[1].outcome,
            RecordOutcome::Failed(PipelineError::OffloadFailure(_))
        ));
        assert_eq!(published_pks(&bus), vec!["small", "small-too"]);
    }

    // -----------------------------------------------------------------------
    // Skips
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn missing_top_level_fields_are_skipped() {
        let (coordinator, bus) = coordinator(CdcConfig::default());
        let mut no_name = insert("e-1", "a", 100);
        no_name.event_name = None;
        let mut no_id = insert("e-2", "b", 100);
        no_id.event_id = None;
        let mut no_payload = insert("e-3", "c", 100);
        no_payload.dynamodb = None;

        let report = coordinator
            .process_batch(vec![no_name, no_id, no_payload, insert("e-4", "d", 100)])
            .await;

        let reasons: Vec<_> = report
            .records
            .iter()
            .map(|r| match r.outcome {
                RecordOutcome::Skipped(reason) => Some(reason),
                _ => None,
            })
            .collect();
        assert_eq!(
            reasons,
            vec![
                Some(SkipReason::MissingField("eventName")),
                Some(SkipReason::MissingField("eventID")),
                Some(SkipReason::MissingField("dynamodb")),
                None,
            ]
        );
        assert_eq!(report.skipped(), 3);
        assert_eq!(report.failed(), 0);
        assert_eq!(bus.len(), 1);
    }

    #[tokio::test]
    async fn unchanged_modify_is_skipped() {
        let (coordinator, bus) = coordinator(CdcConfig::default());
        let image = typed(json!({"pk": "a", "sk": "meta", "v": 1}));
        let record = StreamRecord {
            event_id: Some("e-1".into()),
            event_name: Some("MODIFY".into()),
            dynamodb: Some(StreamPayload {
                keys: Some(typed(json!({"pk": "a", "sk": "meta"}))),
                new_image: Some(image.clone()),
                old_image: Some(image),
                size_bytes: Some(100),
            }),
        };

        let report = coordinator.process_batch(vec![record]).await;
        assert!(matches!(
            report.records[0].outcome,
            RecordOutcome::Skipped(SkipReason::NoChange)
        ));
        assert!(bus.is_empty());
    }

    #[tokio::test]
    async fn key_filter_skips_non_matching_records() {
        let config = CdcConfig {
            pk_filters: vec!["order#*".into()],
            ..Default::default()
        };
        let (coordinator, bus) = coordinator(config);

        let report = coordinator
            .process_batch(vec![
                insert("e-1", "order#1", 100),
                insert("e-2", "user#1", 100),
                insert("e-3", "order#2", 100),
            ])
            .await;

        assert!(matches!(
            report.records[1].outcome,
            RecordOutcome::Skipped(SkipReason::Filtered)
        ));
        assert_eq!(published_pks(&bus), vec!["order#1", "order#2"]);
    }

    #[test]
    fn invalid_config_is_rejected_at_construction() {
        let config = CdcConfig {
            pk_filters: vec!["a*b".into()],
            ..Default::default()
        };
        let result = BatchCoordinator::new(
            &config,
            Arc::new(InMemoryBlobStore::new("cdc")),
            Arc::new(InMemoryEventBus::new()),
        );
        assert!(result.is_err());
    }

    // -----------------------------------------------------------------------
    // Concurrency
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn concurrent_batch_reports_in_input_order() {
        let config = CdcConfig {
            max_concurrency: 4,
            ..Default::default()
        };
        let (coordinator, bus) = coordinator(config);

        let mut records: Vec<StreamRecord> = (0..20)
            .map(|i| insert(&format!("e-{i}"), &format!("t#{i}"), if i % 3 == 0 { 200_000 } else { 100 }))
            .collect();
        records[7].event_name = None;
        if let Some(payload) = records[11].dynamodb.as_mut() {
            payload.keys = None;
        }

        let report = coordinator.process_batch(records).await;
        assert_eq!(report.len(), 20);
        for (i, r) in report.records.iter().enumerate() {
            assert_eq!(r.event_id.as_deref(), Some(format!("e-{i}").as_str()));
        }
        assert!(report.records[7].outcome.is_skipped());
        assert!(report.records[11].outcome.is_failed());
        assert!(matches!(
            report.records[3].outcome,
            RecordOutcome::Published { offloaded: true, .. }
        ));
        assert_eq!(report.published(), 18);
        assert_eq!(bus.len(), 18);
    }

    #[tokio::test]
    async fn empty_batch() {
        let (coordinator, bus) = coordinator(CdcConfig::default());
        let report = coordinator.process_event(StreamEvent::default()).await;
        assert!(report.is_empty());
        assert!(bus.is_empty());
    }
}
