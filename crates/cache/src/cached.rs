//! Read-through cached stores.
//!
//! Composes a cache and a backing loader into a single get-with-fallback:
//! attempt the cache; on miss (or any cache failure, which is logged and
//! never fatal) read the authoritative store; write the result back into
//! the cache best-effort. A read that succeeded from the store never fails
//! because caching it afterward failed.

use runboard_core::{Context, Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::io::{Read, Write};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::stream::{CacheKey, ReadWritable, Readable};

/// Read-through store over raw bytes.
pub struct ByteCachedStore {
    cache: Arc<dyn ReadWritable>,
    store: Arc<dyn Readable>,
}

impl ByteCachedStore {
    /// Compose a cache and an authoritative byte store.
    pub fn new(cache: Arc<dyn ReadWritable>, store: Arc<dyn Readable>) -> Self {
        ByteCachedStore { cache, store }
    }

    /// Fetch the bytes for `store_key`, preferring the cached copy at
    /// `cache_key`.
    ///
    /// Cache errors are soft: logged, then the store is consulted. Store
    /// errors are hard: propagated unchanged. A successful store read is
    /// written back to the cache best-effort.
    pub fn get(&self, ctx: &Context, cache_key: &CacheKey, store_key: &CacheKey) -> Result<Vec<u8>> {
        ctx.check()?;
        match read_fully(self.cache.as_ref(), cache_key) {
            Ok(data) => {
                debug!(key = %cache_key, "serving data from cache");
                return Ok(data);
            }
            Err(err) if err.is_cache_miss() => {}
            Err(err) => warn!(key = %cache_key, error = %err, "error fetching cache key"),
        }

        ctx.check()?;
        debug!(key = %store_key, "loading data from store");
        let data = read_fully(self.store.as_ref(), store_key)?;

        match write_fully(self.cache.as_ref(), cache_key, &data) {
            Ok(()) => debug!(key = %cache_key, "cached store value"),
            Err(err) => warn!(key = %cache_key, error = %err, "failed to write back to cache"),
        }
        Ok(data)
    }
}

/// A store that produces a JSON value for a key on get.
pub trait ObjectStore: Send + Sync {
    /// Fetch the object stored at `id`.
    fn get(&self, ctx: &Context, id: &CacheKey) -> Result<Value>;
}

/// An [`ObjectStore`] that also supports writes, for use as a cache tier.
pub trait ObjectCache: ObjectStore {
    /// Store `value` at `id`, replacing prior content.
    fn put(&self, ctx: &Context, id: &CacheKey, value: &Value) -> Result<()>;
}

/// JSON object encoding over any [`ReadWritable`] byte cache.
pub struct JsonObjectCache {
    delegate: Arc<dyn ReadWritable>,
}

impl JsonObjectCache {
    /// Wrap a byte cache with JSON (de)serialization.
    pub fn new(delegate: Arc<dyn ReadWritable>) -> Self {
        JsonObjectCache { delegate }
    }
}

impl ObjectStore for JsonObjectCache {
    fn get(&self, ctx: &Context, id: &CacheKey) -> Result<Value> {
        ctx.check()?;
        let data = read_fully(self.delegate.as_ref(), id)?;
        Ok(serde_json::from_slice(&data)?)
    }
}

impl ObjectCache for JsonObjectCache {
    fn put(&self, ctx: &Context, id: &CacheKey, value: &Value) -> Result<()> {
        ctx.check()?;
        let data = serde_json::to_vec(value)?;
        write_fully(self.delegate.as_ref(), id, &data)
    }
}

/// Read-through store over JSON objects.
pub struct ObjectCachedStore {
    cache: Arc<dyn ObjectCache>,
    store: Arc<dyn ObjectStore>,
}

impl ObjectCachedStore {
    /// Compose an object cache and an authoritative object store.
    pub fn new(cache: Arc<dyn ObjectCache>, store: Arc<dyn ObjectStore>) -> Self {
        ObjectCachedStore { cache, store }
    }

    /// Fetch the object for `store_key`, preferring the cached copy at
    /// `cache_key`. Same soft/hard error split as [`ByteCachedStore::get`].
    pub fn get(&self, ctx: &Context, cache_key: &CacheKey, store_key: &CacheKey) -> Result<Value> {
        ctx.check()?;
        match self.cache.get(ctx, cache_key) {
            Ok(value) => {
                debug!(key = %cache_key, "serving object from cache");
                return Ok(value);
            }
            Err(err) if err.is_cache_miss() => {}
            Err(err) => warn!(key = %cache_key, error = %err, "error fetching cache key"),
        }

        let value = self.store.get(ctx, store_key)?;
        debug!(key = %store_key, "serving object from store");
        match self.cache.put(ctx, cache_key, &value) {
            Ok(()) => debug!(key = %cache_key, "cached object"),
            Err(err) => warn!(key = %cache_key, error = %err, "error caching object"),
        }
        Ok(value)
    }

    /// Typed variant of [`ObjectCachedStore::get`].
    pub fn get_as<T: DeserializeOwned>(
        &self,
        ctx: &Context,
        cache_key: &CacheKey,
        store_key: &CacheKey,
    ) -> Result<T> {
        Ok(serde_json::from_value(self.get(ctx, cache_key, store_key)?)?)
    }

    /// Serialize `value` into the cache tier directly (used by warm-up
    /// paths that already hold the authoritative value).
    pub fn put_as<T: Serialize>(&self, ctx: &Context, cache_key: &CacheKey, value: &T) -> Result<()> {
        self.cache.put(ctx, cache_key, &serde_json::to_value(value)?)
    }
}

fn read_fully(readable: &dyn Readable, key: &CacheKey) -> Result<Vec<u8>> {
    let mut reader = readable.new_read_closer(key)?;
    let mut data = Vec::new();
    reader.read_to_end(&mut data).map_err(Error::from)?;
    Ok(data)
}

fn write_fully(writable: &dyn ReadWritable, key: &CacheKey, data: &[u8]) -> Result<()> {
    let mut writer = writable.new_write_closer(key)?;
    writer.write_all(data).map_err(Error::from)?;
    writer.close()
}
