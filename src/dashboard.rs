//! Main entry point: the `Runboard` facade.
//!
//! Wires a backing store, the test-run cache, and the query engine into
//! one value. Construction is explicit — there are no process-wide
//! singletons — so a test can hand in a fake store and a production
//! caller can hand in its own store client.

use std::sync::Arc;
use std::time::Duration;

use runboard_cache::{CacheKey, GzipReadWritable, JsonObjectCache, Lru, MemCache};
use runboard_core::{
    Context, Key, KeysByProduct, Result, TestRun, TestRunFilter, TestRunsByProduct,
};
use runboard_engine::{
    test_run_cache_key, CachedDatastore, DatastoreTestRunQuery, TestRunQuery, TEST_RUN_CACHE_TTL,
    TEST_RUN_KIND,
};
use runboard_store::{Datastore, DatastoreExt, MemoryDatastore};
use std::collections::HashMap;

/// The runboard engine: store, cache, and query engine, wired together.
pub struct Runboard {
    store: Arc<dyn Datastore>,
    cache: Option<MemCache>,
    lru: Lru,
    query: DatastoreTestRunQuery,
}

impl Runboard {
    /// A board over an in-memory store with the default test-run cache.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Start configuring a board.
    pub fn builder() -> RunboardBuilder {
        RunboardBuilder::default()
    }

    /// The (possibly cache-decorated) store the engine reads through.
    pub fn store(&self) -> &Arc<dyn Datastore> {
        &self.store
    }

    /// The query engine, for callers that want the unbundled interface.
    pub fn query(&self) -> &dyn TestRunQuery {
        &self.query
    }

    /// Load the runs matching `filter`, by product in product order.
    ///
    /// An `aligned` filter first resolves the aligned SHAs within the
    /// filter's window and then loads runs pinned to those revisions.
    /// Every run returned is recorded as an access for cache eviction.
    pub fn load_test_runs(&self, ctx: &Context, filter: &TestRunFilter) -> Result<TestRunsByProduct> {
        let products = filter.products_or_default();
        let mut revisions: Vec<String> = filter.shas.0.clone();
        if filter.aligned == Some(true) {
            let (shas, _) = self.query.get_aligned_run_shas(
                ctx,
                &products,
                filter.labels.as_ref(),
                filter.from,
                filter.to,
                filter.max_count,
                filter.offset,
            )?;
            revisions = shas;
        }
        let result = self.query.load_test_runs(
            ctx,
            &products,
            filter.labels.as_ref(),
            &revisions,
            filter.from,
            filter.to,
            filter.max_count,
            filter.offset,
        )?;
        for product_runs in &result {
            for run in &product_runs.test_runs {
                self.lru.access(run.id);
            }
        }
        Ok(result)
    }

    /// Load the keys of the runs matching `filter`.
    pub fn load_test_run_keys(&self, ctx: &Context, filter: &TestRunFilter) -> Result<KeysByProduct> {
        self.query.load_test_run_keys(
            ctx,
            &filter.products_or_default(),
            filter.labels.as_ref(),
            &filter.shas.0,
            filter.from,
            filter.to,
            filter.max_count,
            filter.offset,
        )
    }

    /// The aligned SHAs for `filter`, most recent first, with their keys.
    pub fn get_aligned_run_shas(
        &self,
        ctx: &Context,
        filter: &TestRunFilter,
    ) -> Result<(Vec<String>, HashMap<String, KeysByProduct>)> {
        self.query.get_aligned_run_shas(
            ctx,
            &filter.products_or_default(),
            filter.labels.as_ref(),
            filter.from,
            filter.to,
            filter.max_count,
            filter.offset,
        )
    }

    /// Store a newly-ingested run, allocating its key. Returns the run id.
    pub fn create_test_run(&self, ctx: &Context, run: &TestRun) -> Result<i64> {
        let key = self.store.put_as(ctx, &Key::int(TEST_RUN_KIND, 0), run)?;
        Ok(key.int_id())
    }

    /// Administrative deletion of a run record and its cached copy.
    pub fn delete_test_run(&self, ctx: &Context, id: i64) -> Result<()> {
        self.store.delete(ctx, &Key::int(TEST_RUN_KIND, id))?;
        if let Some(cache) = &self.cache {
            cache.delete(&CacheKey::Str(test_run_cache_key(id)));
        }
        Ok(())
    }

    /// Evict the least-recently-accessed `percent` of tracked runs from
    /// the cache, returning the evicted run ids.
    pub fn evict_cached_runs(&self, percent: f64) -> Vec<i64> {
        let evicted = self.lru.evict_lru(percent);
        if let Some(cache) = &self.cache {
            for id in &evicted {
                cache.delete(&CacheKey::Str(test_run_cache_key(*id)));
            }
        }
        evicted
    }

    /// Purge the whole test-run cache.
    pub fn flush_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.flush_all();
        }
    }
}

impl Default for Runboard {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for a [`Runboard`].
///
/// ```ignore
/// // Tests: uncached over an in-memory store.
/// let board = Runboard::builder().uncached().build();
///
/// // Production-shaped: caller-supplied store client, 48h run cache.
/// let board = Runboard::builder().store(my_store).build();
/// ```
pub struct RunboardBuilder {
    store: Option<Arc<dyn Datastore>>,
    cached: bool,
    ttl: Duration,
}

impl Default for RunboardBuilder {
    fn default() -> Self {
        RunboardBuilder {
            store: None,
            cached: true,
            ttl: TEST_RUN_CACHE_TTL,
        }
    }
}

impl RunboardBuilder {
    /// Use the given backing store instead of a fresh in-memory one.
    pub fn store(mut self, store: Arc<dyn Datastore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Skip the test-run cache; every read hits the backing store.
    pub fn uncached(mut self) -> Self {
        self.cached = false;
        self
    }

    /// Override the test-run cache TTL.
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Build the board.
    pub fn build(self) -> Runboard {
        let backing = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryDatastore::new()));
        let (store, cache): (Arc<dyn Datastore>, Option<MemCache>) = if self.cached {
            let bytes = MemCache::with_ttl(self.ttl);
            let object_cache = JsonObjectCache::new(Arc::new(GzipReadWritable::new(Arc::new(
                bytes.clone(),
            ))));
            (
                Arc::new(CachedDatastore::new(backing, Arc::new(object_cache))),
                Some(bytes),
            )
        } else {
            (backing, None)
        };
        Runboard {
            query: DatastoreTestRunQuery::new(store.clone()),
            store,
            cache,
            lru: Lru::new(),
        }
    }
}
