//! Error types for cache operations.

use thiserror::Error;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache-specific errors.
///
/// These surface from constructors and from [`RawStore`](crate::RawStore)
/// backends. [`GenerationalCache`](crate::GenerationalCache) absorbs them
/// and reports misses or failed writes instead.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Redis-specific error
    #[cfg(feature = "redis")]
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Memcached-specific error
    #[cfg(feature = "memcached")]
    #[error("Memcached error: {0}")]
    Memcached(#[from] memcache::MemcacheError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Backend failed its capability probe
    #[error("Cache backend unavailable: {0}")]
    Unavailable(String),

    /// Generic error
    #[error("Cache error: {0}")]
    Other(String),
}

impl CacheError {
    /// Check if this error came from talking to the backend rather than
    /// from the data it returned.
    pub fn is_transport_error(&self) -> bool {
        match self {
            #[cfg(feature = "redis")]
            Self::Redis(_) => true,
            #[cfg(feature = "memcached")]
            Self::Memcached(_) => true,
            Self::Connection(_) | Self::Unavailable(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CacheError::Connection("Failed to connect".to_string());
        assert!(err.to_string().contains("Failed to connect"));

        let err = CacheError::Unavailable("memory".to_string());
        assert_eq!(err.to_string(), "Cache backend unavailable: memory");
    }

    #[test]
    fn test_transport_classification() {
        assert!(CacheError::Connection("x".into()).is_transport_error());
        assert!(!CacheError::Deserialization("x".into()).is_transport_error());
    }
}
