use std::fmt;

use cdc_bus::BusError;
use cdc_diff::DiffError;
use cdc_store::StoreError;
use cdc_types::TypeError;

/// Why a single record could not be turned into a published event.
///
/// Every variant is local to its record. The coordinator logs it and moves
/// on to the next record.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The record's typed representation or shape could not be decoded.
    #[error("malformed record: {0}")]
    MalformedRecord(#[from] TypeError),

    /// The images could not be compared.
    #[error("diff failed: {0}")]
    DiffFailure(#[from] DiffError),

    /// Writing the images to the blob store or signing the reference failed.
    #[error("offload failed: {0}")]
    OffloadFailure(#[from] StoreError),

    /// The bus rejected the event or could not be reached.
    #[error("publish failed: {0}")]
    PublishFailure(#[from] BusError),
}

impl PipelineError {
    /// Static label used as the `kind` field in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedRecord(_) => "MalformedRecord",
            Self::DiffFailure(_) => "DiffFailure",
            Self::OffloadFailure(_) => "OffloadFailure",
            Self::PublishFailure(_) => "PublishFailure",
        }
    }
}

/// Convenience alias for per-record results.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors from compiling partition-key filter patterns.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    /// The pattern is the empty string.
    #[error("empty filter pattern")]
    EmptyPattern,

    /// The pattern contains more than one `*`.
    #[error("invalid filter pattern `{0}`: at most one wildcard is allowed")]
    MultipleWildcards(String),

    /// The pattern's `*` is not its last character.
    #[error("invalid filter pattern `{0}`: the wildcard must be trailing")]
    NonTrailingWildcard(String),
}

pub type FilterResult<T> = Result<T, FilterError>;

/// Errors from loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A setting has a value outside its allowed range.
    #[error("invalid configuration `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },

    /// A required setting is absent.
    #[error("missing configuration `{0}`")]
    Missing(&'static str),

    /// An environment variable could not be parsed.
    #[error("environment variable {var}: {reason}")]
    Env { var: &'static str, reason: String },

    /// The configuration file is not valid TOML for this schema.
    #[error("config file: {0}")]
    Toml(#[from] toml::de::Error),

    /// The configuration file could not be read.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A partition-key filter pattern is invalid.
    #[error(transparent)]
    Filter(#[from] FilterError),
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl fmt::Display) -> Self {
        Self::Invalid {
            field,
            reason: reason.to_string(),
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
