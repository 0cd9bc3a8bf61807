//! TestRun-kind caching datastore decorator.
//!
//! Test runs are immutable after creation, so their entity reads are safe
//! to serve through a TTL'd object cache. Only `"TestRun"`-kind gets are
//! accelerated; every other kind (and every write) passes straight
//! through to the wrapped store.

use parking_lot::Mutex;
use runboard_core::{Context, Error, Key, KeyId, Result};
use runboard_cache::{
    CacheKey, GzipReadWritable, JsonObjectCache, MemCache, ObjectCache, ObjectCachedStore,
    ObjectStore,
};
use runboard_store::{Datastore, EntityIterator, Query};
use serde_json::{json, Value};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::warn;

use crate::query::TEST_RUN_KIND;

/// The cache expiration for each test run.
pub const TEST_RUN_CACHE_TTL: Duration = Duration::from_secs(48 * 60 * 60);

/// The cache key for a test run id.
pub fn test_run_cache_key(id: i64) -> String {
    format!("TEST_RUN-{}", id)
}

/// A [`Datastore`] decorator that caches test-run reads.
pub struct CachedDatastore {
    inner: Arc<dyn Datastore>,
    cache: Arc<dyn ObjectCache>,
}

impl CachedDatastore {
    /// Wrap `inner` with the given object cache for test-run reads.
    pub fn new(inner: Arc<dyn Datastore>, cache: Arc<dyn ObjectCache>) -> Self {
        CachedDatastore { inner, cache }
    }

    /// Wrap `inner` with the default test-run cache: JSON objects,
    /// gzip-compressed, expiring after [`TEST_RUN_CACHE_TTL`].
    pub fn with_default_cache(inner: Arc<dyn Datastore>) -> Self {
        let bytes = GzipReadWritable::new(Arc::new(MemCache::with_ttl(TEST_RUN_CACHE_TTL)));
        Self::new(inner, Arc::new(JsonObjectCache::new(Arc::new(bytes))))
    }

    fn cached_run_store(&self) -> ObjectCachedStore {
        ObjectCachedStore::new(
            self.cache.clone(),
            Arc::new(TestRunObjectStore {
                inner: self.inner.clone(),
            }),
        )
    }
}

impl Datastore for CachedDatastore {
    fn run(&self, ctx: &Context, query: Query) -> Result<Box<dyn EntityIterator>> {
        self.inner.run(ctx, query)
    }

    fn get(&self, ctx: &Context, key: &Key) -> Result<Value> {
        if key.kind != TEST_RUN_KIND {
            return self.inner.get(ctx, key);
        }
        let id = key.int_id();
        self.cached_run_store().get(
            ctx,
            &CacheKey::Str(test_run_cache_key(id)),
            &CacheKey::Int(id),
        )
    }

    /// Concurrent fan-out: each key resolves via an independent single get,
    /// joined before returning. Failures are gathered into a deterministic
    /// multi-error in key order; a cancelled context surfaces as the
    /// cancellation error rather than a partial result.
    fn get_multi(&self, ctx: &Context, keys: &[Key]) -> Result<Vec<Value>> {
        if keys.iter().any(|key| key.kind != TEST_RUN_KIND) {
            return self.inner.get_multi(ctx, keys);
        }

        let mut slots: Vec<Option<Value>> = vec![None; keys.len()];
        let errors: Mutex<Vec<(usize, Error)>> = Mutex::new(Vec::new());
        thread::scope(|scope| {
            for (i, (key, slot)) in keys.iter().zip(slots.iter_mut()).enumerate() {
                let errors = &errors;
                scope.spawn(move || match self.get(ctx, key) {
                    Ok(value) => *slot = Some(value),
                    Err(err) => errors.lock().push((i, err)),
                });
            }
        });

        ctx.check()?;
        let mut errors = errors.into_inner();
        if !errors.is_empty() {
            errors.sort_by_key(|(i, _)| *i);
            let mut errors: Vec<Error> = errors.into_iter().map(|(_, err)| err).collect();
            let first = errors.remove(0);
            if !errors.is_empty() {
                warn!(
                    failed = errors.len() + 1,
                    total = keys.len(),
                    "multiple failures in test-run fan-out"
                );
                return Err(Error::Fanout {
                    first: Box::new(first),
                    errors,
                });
            }
            return Err(first);
        }
        Ok(slots.into_iter().flatten().collect())
    }

    fn put(&self, ctx: &Context, key: &Key, entity: &Value) -> Result<Key> {
        self.inner.put(ctx, key, entity)
    }

    fn insert(&self, ctx: &Context, key: &Key, entity: &Value) -> Result<()> {
        self.inner.insert(ctx, key, entity)
    }

    fn update(
        &self,
        ctx: &Context,
        key: &Key,
        mutator: &mut dyn FnMut(&mut Value) -> Result<()>,
    ) -> Result<()> {
        self.inner.update(ctx, key, mutator)
    }

    fn delete(&self, ctx: &Context, key: &Key) -> Result<()> {
        self.inner.delete(ctx, key)
    }

    fn reserve_id(&self, kind: &str) -> Result<Key> {
        self.inner.reserve_id(kind)
    }
}

/// Adapts the wrapped [`Datastore`] to the [`ObjectStore`] interface for
/// integer-keyed test runs, stamping the id onto the loaded entity.
struct TestRunObjectStore {
    inner: Arc<dyn Datastore>,
}

impl ObjectStore for TestRunObjectStore {
    fn get(&self, ctx: &Context, id: &CacheKey) -> Result<Value> {
        let id = match id {
            CacheKey::Int(id) => *id,
            CacheKey::Str(other) => {
                return Err(Error::Internal(format!(
                    "test-run object store expected int id, got {:?}",
                    other
                )))
            }
        };
        let key = Key {
            kind: TEST_RUN_KIND.to_string(),
            id: KeyId::Int(id),
        };
        let mut entity = self.inner.get(ctx, &key)?;
        if let Some(object) = entity.as_object_mut() {
            object.insert("id".to_string(), json!(id));
        }
        Ok(entity)
    }
}
