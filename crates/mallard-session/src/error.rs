//! Error types for session operations.

/// Error type for session operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Error from the cache backend or its connection.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Error borrowing a connection from the pool.
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// The backend answered the construction-time ping with something
    /// other than `PONG`.
    #[error("Unexpected ping reply: {0}")]
    Ping(String),

    /// The store configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Session values could not be encoded.
    #[error("Serialization error: {0}")]
    Encode(String),

    /// A cache payload could not be decoded.
    #[error("Deserialization error: {0}")]
    Decode(String),

    /// Serialized session exceeds the configured maximum length.
    ///
    /// Raised before any cache I/O takes place.
    #[error("Session payload is {size} bytes, exceeding the {limit} byte limit")]
    PayloadTooLarge {
        /// Size of the serialized payload.
        size: usize,
        /// Configured maximum length.
        limit: usize,
    },
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, Error>;
