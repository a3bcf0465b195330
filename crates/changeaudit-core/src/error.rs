//! Error types for ChangeAudit

/// Result type alias using ChangeAudit's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for ChangeAudit operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input document could not be parsed
    #[error("extraction error: {0}")]
    Extraction(String),

    /// The rule backing store could not be read or written
    #[error("rule store unavailable: {0}")]
    StoreUnavailable(String),

    /// A model call or its response failed
    #[error("classification failure: {0}")]
    Classification(String),

    /// Missing or invalid configuration (credentials, endpoints, limits)
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML serialization errors
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Timeout errors
    #[error("operation timed out")]
    Timeout,

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new extraction error
    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::Extraction(msg.into())
    }

    /// Create a new store-unavailable error
    pub fn store_unavailable(msg: impl Into<String>) -> Self {
        Self::StoreUnavailable(msg.into())
    }

    /// Create a new classification error
    pub fn classification(msg: impl Into<String>) -> Self {
        Self::Classification(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error must stop the whole run rather than a single pair
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Classification(_) | Self::Timeout)
    }
}
