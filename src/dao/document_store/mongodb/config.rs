use std::time::Duration;

use mongodb::options::ClientOptions;

use super::error::{MongoDaoError, MongoResult};

/// Connection settings for the MongoDB document store.
#[derive(Clone)]
pub struct MongoConfig {
    /// Parsed driver options.
    pub options: ClientOptions,
    /// Name of the database holding the game collections.
    pub database_name: String,
    /// Interval between change-detection polls for watch streams.
    pub poll_interval: Duration,
}

impl MongoConfig {
    /// Parse a connection string, defaulting the database name when absent.
    pub async fn from_uri(
        uri: &str,
        db_name: Option<&str>,
        poll_interval: Duration,
    ) -> MongoResult<Self> {
        let database_name = db_name.unwrap_or("dice_trivia").to_owned();
        let options =
            ClientOptions::parse(uri)
                .await
                .map_err(|source| MongoDaoError::InvalidUri {
                    uri: uri.to_owned(),
                    source,
                })?;

        Ok(Self {
            options,
            database_name,
            poll_interval,
        })
    }
}
