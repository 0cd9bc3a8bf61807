//! Stream-provider interfaces for byte caches.
//!
//! A cache is addressed by an opaque string-or-int key and speaks in
//! streams: [`Readable`] hands out readers, [`ReadWritable`] additionally
//! hands out write streams with an explicit close. Decorators (gzip, JSON
//! objects) wrap these interfaces without the caller knowing.

use runboard_core::Result;
use std::fmt;
use std::io::Read;

/// An opaque cache key: a string or an integer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheKey {
    /// String-addressed entry.
    Str(String),
    /// Integer-addressed entry (e.g. a run ID).
    Int(i64),
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Str(s) => write!(f, "{}", s),
            CacheKey::Int(i) => write!(f, "{}", i),
        }
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        CacheKey::Str(s.to_string())
    }
}

impl From<String> for CacheKey {
    fn from(s: String) -> Self {
        CacheKey::Str(s)
    }
}

impl From<i64> for CacheKey {
    fn from(i: i64) -> Self {
        CacheKey::Int(i)
    }
}

/// A write stream with an explicit close.
///
/// Invariants:
/// - writing after [`WriteCloser::close`] is a programming error, reported
///   as a failed write;
/// - closing without ever writing stores nothing, rather than storing an
///   empty value;
/// - close is idempotent.
pub trait WriteCloser: std::io::Write + Send {
    /// Flush and finalize the stream, storing the written bytes.
    fn close(&mut self) -> Result<()>;
}

/// A provider of read streams for cached entities.
pub trait Readable: Send + Sync {
    /// A reader for the entity at `key`.
    ///
    /// Returns [`Error::CacheMiss`](runboard_core::Error::CacheMiss) if the
    /// key holds nothing (or the entry expired). Dropping the reader closes
    /// it; consumers that intend to re-read must drain it first.
    fn new_read_closer(&self, key: &CacheKey) -> Result<Box<dyn Read + Send>>;
}

/// A provider of read and write streams for cached entities.
pub trait ReadWritable: Readable {
    /// A write stream for the entity at `key`. Content becomes visible
    /// atomically at close, fully replacing prior content.
    fn new_write_closer(&self, key: &CacheKey) -> Result<Box<dyn WriteCloser>>;
}
