//! In-memory TTL byte cache.
//!
//! The concrete cache behind the stream interfaces: a concurrent map of
//! key to (bytes, expiry). Entries expire lazily — an expired entry reads
//! as a miss and is dropped on access. Handles are cheap clones of one
//! shared map, so a process-wide cache is just a value passed down to
//! whoever needs it.

use dashmap::DashMap;
use runboard_core::{Error, Result};
use std::io::{self, Cursor, Read, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::stream::{CacheKey, ReadWritable, Readable, WriteCloser};

#[derive(Debug, Clone)]
struct Entry {
    data: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(deadline) => Instant::now() >= deadline,
            None => false,
        }
    }
}

/// A shared in-memory byte cache with per-cache TTL.
#[derive(Debug, Clone, Default)]
pub struct MemCache {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    entries: DashMap<CacheKey, Entry>,
    ttl: Option<Duration>,
}

impl MemCache {
    /// A cache whose entries never expire.
    pub fn new() -> Self {
        MemCache::default()
    }

    /// A cache whose entries expire `ttl` after being written.
    pub fn with_ttl(ttl: Duration) -> Self {
        MemCache {
            inner: Arc::new(Inner {
                entries: DashMap::new(),
                ttl: Some(ttl),
            }),
        }
    }

    /// Number of live (unexpired) entries.
    pub fn len(&self) -> usize {
        self.inner
            .entries
            .iter()
            .filter(|e| !e.value().is_expired())
            .count()
    }

    /// Whether the cache holds no live entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Purge everything from the cache.
    pub fn flush_all(&self) {
        self.inner.entries.clear();
    }

    /// Delete the entry stored at `key`; absent keys are ignored.
    pub fn delete(&self, key: &CacheKey) {
        self.inner.entries.remove(key);
    }

    fn read(&self, key: &CacheKey) -> Option<Vec<u8>> {
        let entry = self.inner.entries.get(key)?;
        if entry.is_expired() {
            drop(entry);
            self.inner.entries.remove(key);
            return None;
        }
        Some(entry.data.clone())
    }

    fn store(&self, key: CacheKey, data: Vec<u8>) {
        let expires_at = self.inner.ttl.map(|ttl| Instant::now() + ttl);
        self.inner.entries.insert(key, Entry { data, expires_at });
    }
}

impl Readable for MemCache {
    fn new_read_closer(&self, key: &CacheKey) -> Result<Box<dyn Read + Send>> {
        match self.read(key) {
            Some(data) => Ok(Box::new(Cursor::new(data))),
            None => Err(Error::CacheMiss),
        }
    }
}

impl ReadWritable for MemCache {
    fn new_write_closer(&self, key: &CacheKey) -> Result<Box<dyn WriteCloser>> {
        Ok(Box::new(MemWriteCloser {
            cache: self.clone(),
            key: key.clone(),
            buf: Vec::new(),
            has_written: false,
            closed: false,
        }))
    }
}

struct MemWriteCloser {
    cache: MemCache,
    key: CacheKey,
    buf: Vec<u8>,
    has_written: bool,
    closed: bool,
}

impl Write for MemWriteCloser {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.closed {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                Error::WriteAfterClose.to_string(),
            ));
        }
        self.has_written = true;
        self.buf.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl WriteCloser for MemWriteCloser {
    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        // Closing an untouched stream is a no-op: caching "nothing happened"
        // as an empty value would poison later reads.
        if self.has_written {
            self.cache.store(self.key.clone(), std::mem::take(&mut self.buf));
        }
        Ok(())
    }
}
