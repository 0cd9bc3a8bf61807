//! Unified error types for runboard.
//!
//! One canonical error enum is shared by every crate in the workspace. The
//! HTTP layer (out of scope here) maps these onto transport status codes, so
//! variants carry structure rather than pre-formatted user text.

use thiserror::Error;

/// All runboard errors.
#[derive(Debug, Error)]
pub enum Error {
    /// A query was issued with an empty product list.
    #[error("no products specified in request to load test runs")]
    NoProducts,

    /// A product spec string could not be parsed.
    #[error("invalid product spec: {0}")]
    InvalidProductSpec(String),

    /// A product string could not be parsed.
    #[error("invalid product: {0}")]
    InvalidProduct(String),

    /// An unknown browser name was supplied.
    #[error("invalid browser name: {0}")]
    InvalidBrowserName(String),

    /// A version string could not be parsed.
    #[error("invalid version: {0}")]
    InvalidVersion(String),

    /// A revision (SHA) string could not be parsed.
    #[error("invalid sha: {0}")]
    InvalidSha(String),

    /// Sentinel for a cache read that found nothing.
    ///
    /// Distinguishable from real I/O errors so read-through stores can fall
    /// back to the authoritative store without logging noise.
    #[error("cache miss")]
    CacheMiss,

    /// A cache write stream was written to after it was closed.
    #[error("cache write stream: write after close")]
    WriteAfterClose,

    /// Atomic insert found the entity already present.
    #[error("store: entity already exists: {0}")]
    EntityExists(String),

    /// Entity or key not found in the store.
    #[error("not found: {0}")]
    NotFound(String),

    /// The operation's context was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// The operation's context deadline passed.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// I/O error from a cache or store stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Backing store error.
    #[error("store error: {0}")]
    Store(String),

    /// Internal error (bug or invariant violation).
    #[error("internal error: {0}")]
    Internal(String),

    /// Aggregated failures from a concurrent fan-out read.
    ///
    /// Always constructed non-empty, in the key order of the fan-out, so
    /// the same failures produce the same error.
    #[error("{} fan-out operations failed, first: {first}", errors.len() + 1)]
    Fanout {
        /// The first failure, in fan-out order.
        first: Box<Error>,
        /// The remaining failures, in fan-out order.
        errors: Vec<Error>,
    },
}

/// Result type for runboard operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error is the cache-miss sentinel.
    pub fn is_cache_miss(&self) -> bool {
        matches!(self, Error::CacheMiss)
    }

    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Check if this error was caused by context cancellation or expiry.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::Cancelled | Error::DeadlineExceeded)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_miss_is_distinguishable() {
        assert!(Error::CacheMiss.is_cache_miss());
        assert!(!Error::NotFound("x".to_string()).is_cache_miss());
    }

    #[test]
    fn cancellation_covers_both_variants() {
        assert!(Error::Cancelled.is_cancellation());
        assert!(Error::DeadlineExceeded.is_cancellation());
        assert!(!Error::CacheMiss.is_cancellation());
    }

    #[test]
    fn io_errors_convert() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::Other, "boom").into();
        assert!(matches!(err, Error::Io(_)));
    }
}
