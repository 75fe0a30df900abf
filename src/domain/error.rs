use thiserror::Error;

/// Core cache errors
#[derive(Debug, Error)]
pub enum CacheError {
    /// The embedding provider is unreachable or returned no vector.
    /// Transient; callers treat this as an unconditional cache miss.
    #[error("Embedding unavailable: {message}")]
    EmbeddingUnavailable { message: String },

    /// A vector with the wrong dimensionality reached the index.
    /// Programmer or configuration error, not recoverable at runtime.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("I/O error: {message}")]
    Io { message: String },

    /// The mapping has no entry for an id the index returned.
    #[error("Unknown entry id: {id}")]
    UnknownId { id: u64 },

    /// No payload file exists under the given content key.
    #[error("Payload not found for key: {key}")]
    PayloadNotFound { key: String },

    /// A persisted artifact could not be decoded.
    #[error("Corrupt cache state: {message}")]
    Corrupt { message: String },

    /// The live-fetch collaborator failed; the cache gains no entry.
    #[error("Live fetch failed: {message}")]
    FetchFailed { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl CacheError {
    pub fn embedding_unavailable(message: impl Into<String>) -> Self {
        Self::EmbeddingUnavailable {
            message: message.into(),
        }
    }

    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    pub fn unknown_id(id: u64) -> Self {
        Self::UnknownId { id }
    }

    pub fn payload_not_found(key: impl Into<String>) -> Self {
        Self::PayloadNotFound { key: key.into() }
    }

    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::Corrupt {
            message: message.into(),
        }
    }

    pub fn fetch_failed(message: impl Into<String>) -> Self {
        Self::FetchFailed {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Whether a failed hit resolution may be degraded to a miss.
    ///
    /// A cache is allowed to forget: a dangling id, a missing payload
    /// file or an undecodable artifact must never block the caller's
    /// live-fetch fallback.
    pub fn is_recoverable_inconsistency(&self) -> bool {
        matches!(
            self,
            Self::UnknownId { .. } | Self::PayloadNotFound { .. } | Self::Corrupt { .. }
        )
    }
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }
}
