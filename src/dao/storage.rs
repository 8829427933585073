use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not be reached or rejected the operation.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// Human-readable summary of the failure.
        message: String,
        /// Backend-specific cause.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// A partial update targeted a document that does not exist.
    #[error("document `{id}` not found in `{collection}`")]
    NotFound {
        /// Collection that was queried.
        collection: &'static str,
        /// Identity of the missing document.
        id: String,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }

    /// Construct a not-found error for a document identity.
    pub fn not_found(collection: &'static str, id: impl Into<String>) -> Self {
        StorageError::NotFound {
            collection,
            id: id.into(),
        }
    }
}
