//! Storage error types for Tollgate backends.
//!
//! Every error produced inside a driver names the operation and the collection
//! it was working on, so a failure surfacing from the user store can be traced
//! back to the exact call.

use thiserror::Error;

/// Errors that can occur inside a storage backend.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Existing variants will not be removed in minor versions
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum BackendError {
    /// Key, member or field not present in the collection.
    #[error("{key} not found in {collection}")]
    NotFound {
        /// Collection id
        collection: String,
        /// The missing key (for hash maps, `owner/field`)
        key: String,
    },

    /// The host has been closed.
    #[error("Backend is closed")]
    Closed,

    /// An operation failed for a driver-specific reason.
    #[error("{operation} on {collection} failed: {reason}")]
    OperationFailed {
        /// What was being attempted
        operation: String,
        /// Collection id
        collection: String,
        /// Driver message
        reason: String,
    },

    /// SQL driver error.
    #[cfg(any(feature = "sqlite", feature = "postgres"))]
    #[error("SQL error: {reason}")]
    SqlxError {
        /// Context, including operation and collection where known
        reason: String,
        /// The underlying sqlx error
        #[source]
        source: Option<sqlx::Error>,
    },

    /// Serialization failed.
    #[error("Serialization failed")]
    SerializationFailed {
        /// The underlying serialization error
        #[source]
        source: serde_json::Error,
    },

    /// Deserialization failed.
    #[error("Deserialization failed")]
    DeserializationFailed {
        /// The underlying deserialization error
        #[source]
        source: serde_json::Error,
    },

    /// File I/O error.
    #[error("File I/O error")]
    FileIo {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl BackendError {
    /// Shorthand for a [`BackendError::NotFound`].
    pub fn not_found(collection: impl Into<String>, key: impl Into<String>) -> Self {
        BackendError::NotFound {
            collection: collection.into(),
            key: key.into(),
        }
    }

    /// Check if this error indicates a resource was not found.
    pub fn is_not_found(&self) -> bool {
        matches!(self, BackendError::NotFound { .. })
    }

    /// Check if this error is related to I/O operations.
    pub fn is_io_error(&self) -> bool {
        matches!(
            self,
            BackendError::FileIo { .. }
                | BackendError::SerializationFailed { .. }
                | BackendError::DeserializationFailed { .. }
        )
    }

    /// Collection the error is about, where known.
    pub fn collection(&self) -> Option<&str> {
        match self {
            BackendError::NotFound { collection, .. }
            | BackendError::OperationFailed { collection, .. } => Some(collection),
            _ => None,
        }
    }
}

impl From<BackendError> for crate::Error {
    fn from(err: BackendError) -> Self {
        crate::Error::Backend(err)
    }
}
