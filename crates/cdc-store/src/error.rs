/// Errors from blob store and signing operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested blob was not found.
    #[error("blob not found: {0}")]
    NotFound(String),

    /// The key cannot be used as a blob name.
    #[error("invalid blob key `{key}`: {reason}")]
    InvalidKey { key: String, reason: String },

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The requested reference lifetime is outside the allowed window.
    #[error("invalid expiry: {0}")]
    InvalidExpiry(String),

    /// A signed reference is past its expiry.
    #[error("signed reference expired")]
    Expired,

    /// A signed reference failed signature verification.
    #[error("signed reference has an invalid signature")]
    InvalidSignature,

    /// A signed reference could not be parsed.
    #[error("malformed signed reference: {0}")]
    MalformedUrl(String),

    /// The backend refused or could not serve the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub(crate) fn invalid_key(key: &str, reason: impl Into<String>) -> Self {
        Self::InvalidKey {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
