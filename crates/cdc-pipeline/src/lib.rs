//! Change pipeline for the item CDC relay.
//!
//! A batch of stream records goes through the [`BatchCoordinator`]. Each
//! record is normalized into plain images, diffed, routed (images inline or
//! offloaded to a blob store behind a signed reference), and published as
//! one change event. Failures stay with their record.
//!
//! # Key Types
//!
//! - [`CdcConfig`] -- explicit configuration, loaded from the environment or TOML
//! - [`KeyFilter`] -- partition-key patterns shared with the upstream filter
//! - [`PayloadRouter`] -- inline vs. offload decision and the offload itself
//! - [`EventPublisher`] -- bus entry assembly and submission
//! - [`RecordPipeline`] -- the per-record stages
//! - [`BatchCoordinator`] / [`BatchReport`] -- batch iteration and outcomes

pub mod config;
pub mod coordinator;
pub mod error;
pub mod filter;
pub mod pipeline;
pub mod publisher;
pub mod router;

pub use config::{
    CdcConfig, DEFAULT_IO_TIMEOUT, DEFAULT_OFFLOAD_TTL, DEFAULT_SIZE_THRESHOLD, DETAIL_TYPE,
};
pub use coordinator::{BatchCoordinator, BatchReport, RecordOutcome, RecordReport, SkipReason};
pub use error::{
    ConfigError, ConfigResult, FilterError, FilterResult, PipelineError, PipelineResult,
};
pub use filter::{KeyFilter, KeyRule};
pub use pipeline::{Processed, RecordPipeline};
pub use publisher::EventPublisher;
pub use router::PayloadRouter;
