//! Caching tiers for runboard
//!
//! A key-addressed read/write-stream abstraction ([`Readable`] /
//! [`ReadWritable`]) with decorators layered transparently on top:
//! gzip compression ([`GzipReadWritable`]) and JSON object encoding
//! ([`JsonObjectCache`]). Read-through composition lives in
//! [`ByteCachedStore`] and [`ObjectCachedStore`]: attempt the cache,
//! fall back to the authoritative store, write the result back
//! best-effort.
//!
//! Cache reads distinguish the [`miss sentinel`](runboard_core::Error::CacheMiss)
//! from real I/O errors; a read-through store treats the former as routine
//! and the latter as log-and-continue. Store errors are always fatal.
//!
//! [`Lru`] is the in-memory access-time tracker used to bound an unbounded
//! cache by evicting the least-recently-accessed fraction.

mod cached;
mod gzip;
mod lru;
mod mem;
mod stream;

pub use cached::{ByteCachedStore, JsonObjectCache, ObjectCache, ObjectCachedStore, ObjectStore};
pub use gzip::GzipReadWritable;
pub use lru::Lru;
pub use mem::MemCache;
pub use stream::{CacheKey, ReadWritable, Readable, WriteCloser};
