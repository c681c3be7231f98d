use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read environment: {0}")]
    Env(#[from] envy::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Failure applying a batch to the counter store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No connection could be checked out or dialed
    #[error("store connection error: {0}")]
    Connection(String),

    /// The connection was obtained but the grouped commands failed
    #[error("store command error: {0}")]
    Command(#[from] redis::RedisError),
}

impl From<redis_utils::PoolError> for StoreError {
    fn from(err: redis_utils::PoolError) -> Self {
        StoreError::Connection(err.to_string())
    }
}
