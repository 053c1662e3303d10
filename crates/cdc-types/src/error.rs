use thiserror::Error;

/// Errors produced while decoding a stream record into plain trees.
///
/// Every variant means the record is malformed and cannot be processed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("record cannot be decoded: {0}")]
    UndecodableRecord(String),

    #[error("record is missing mandatory field `{0}`")]
    MissingField(&'static str),

    #[error("unknown operation `{0}`")]
    UnknownOperation(String),

    #[error("{operation} record is missing its {image} image")]
    MissingImage {
        operation: String,
        image: &'static str,
    },

    #[error("key attribute `{0}` is missing")]
    MissingKey(String),

    #[error("key attribute `{0}` is not a string")]
    KeyNotString(String),

    #[error("invalid attribute at `{path}`: {reason}")]
    InvalidAttribute { path: String, reason: String },
}

impl TypeError {
    pub(crate) fn invalid(path: &str, reason: impl Into<String>) -> Self {
        Self::InvalidAttribute {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result alias for type-level decoding.
pub type TypeResult<T> = Result<T, TypeError>;
