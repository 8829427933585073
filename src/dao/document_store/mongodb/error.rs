//! Error types shared by the MongoDB storage implementation.

use thiserror::Error;

/// Convenient result alias returning [`MongoDaoError`] failures.
pub type MongoResult<T> = Result<T, MongoDaoError>;

/// Failures that can occur while interacting with MongoDB.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    /// The connection string could not be parsed.
    #[error("invalid MongoDB URI `{uri}`")]
    InvalidUri {
        /// Offending connection string.
        uri: String,
        #[source]
        /// Driver-level parse failure.
        source: mongodb::error::Error,
    },
    /// Building the client from parsed options failed.
    #[error("failed to construct MongoDB client")]
    ClientConstruction {
        #[source]
        /// Driver-level construction failure.
        source: mongodb::error::Error,
    },
    /// The initial connectivity ping never succeeded.
    #[error("could not reach MongoDB after {attempts} attempts")]
    InitialPing {
        /// Number of attempts made before giving up.
        attempts: u32,
        #[source]
        /// Last ping failure observed.
        source: mongodb::error::Error,
    },
    /// A health-check ping failed on an established connection.
    #[error("MongoDB health ping failed")]
    HealthPing {
        #[source]
        /// Driver-level ping failure.
        source: mongodb::error::Error,
    },
    /// Creating an index failed during startup.
    #[error("failed to ensure index `{index}` on `{collection}`")]
    EnsureIndex {
        /// Collection the index targets.
        collection: &'static str,
        /// Indexed field(s).
        index: &'static str,
        #[source]
        /// Driver-level failure.
        source: mongodb::error::Error,
    },
    /// A read against a collection failed.
    #[error("failed to read from `{collection}`")]
    Read {
        /// Collection that was queried.
        collection: &'static str,
        #[source]
        /// Driver-level failure.
        source: mongodb::error::Error,
    },
    /// A write against a collection failed.
    #[error("failed to write to `{collection}`")]
    Write {
        /// Collection that was written.
        collection: &'static str,
        #[source]
        /// Driver-level failure.
        source: mongodb::error::Error,
    },
}
