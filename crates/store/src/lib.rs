//! Backing store adapter for runboard
//!
//! A minimal abstraction over a document store: query construction
//! (equality/range filter, order, limit, offset, projection, distinct),
//! key-only vs full-entity iteration, and batched multi-get by key. The
//! query and caching layers above are written against the [`Datastore`]
//! trait only, so any store that supports ordered range scans and equality
//! filters can sit underneath.
//!
//! Two interchangeable in-memory implementations are provided:
//! - [`MemoryDatastore`]: a single ordered map behind one lock, the
//!   embedded-emulator variant used by most tests
//! - [`ShardedDatastore`]: kind-sharded concurrent maps, the variant shaped
//!   like a standalone client with per-kind connections
//!
//! Entities cross this boundary as `serde_json::Value`; the typed accessors
//! in [`DatastoreExt`] (de)serialize at the edge.

pub mod flags;
mod memory;
pub mod query;
mod sharded;

pub use memory::MemoryDatastore;
pub use query::{Direction, Filter, FilterOp, Query};
pub use sharded::ShardedDatastore;

use runboard_core::{Context, Error, Key, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Streaming results of a [`Datastore::run`] call.
///
/// `Ok(None)` is the done sentinel. For keys-only queries the entity half
/// of each item is `None`.
pub trait EntityIterator: Send {
    /// Advance to the next result, honoring the query's context.
    fn next_entity(&mut self) -> Result<Option<(Key, Option<Value>)>>;
}

/// A datastore, hiding the distinctions between concrete backing stores.
///
/// All operations are blocking and honor the [`Context`] passed to them:
/// a cancelled or expired context aborts the call with a cancellation
/// error. Implementations are internally synchronized; each call gets an
/// independent query/iterator object, so no external locking is needed.
pub trait Datastore: Send + Sync {
    /// Start a query over the given entity kind.
    fn new_query(&self, kind: &str) -> Query {
        Query::new(kind)
    }

    /// Run a query, returning a result iterator.
    fn run(&self, ctx: &Context, query: Query) -> Result<Box<dyn EntityIterator>>;

    /// Fetch one entity by key.
    fn get(&self, ctx: &Context, key: &Key) -> Result<Value>;

    /// Fetch many entities by key, preserving key order.
    ///
    /// The default resolves each key with [`Datastore::get`] sequentially;
    /// decorators may parallelize, but must not reorder results.
    fn get_multi(&self, ctx: &Context, keys: &[Key]) -> Result<Vec<Value>> {
        keys.iter().map(|key| self.get(ctx, key)).collect()
    }

    /// Store an entity at the given key, allocating an integer id if the
    /// key's id is the zero placeholder. Returns the (possibly completed)
    /// key actually written.
    fn put(&self, ctx: &Context, key: &Key, entity: &Value) -> Result<Key>;

    /// Atomically insert a new entity; fails with
    /// [`Error::EntityExists`] if the key is already present.
    fn insert(&self, ctx: &Context, key: &Key, entity: &Value) -> Result<()>;

    /// Atomically update or create an entity: the current value (or
    /// `Value::Null` if absent) is passed to `mutator`, and the mutated
    /// value is written back under the same lock. A mutator error aborts
    /// the update without writing.
    fn update(
        &self,
        ctx: &Context,
        key: &Key,
        mutator: &mut dyn FnMut(&mut Value) -> Result<()>,
    ) -> Result<()>;

    /// Delete an entity by key. Deleting an absent key is not an error.
    fn delete(&self, ctx: &Context, key: &Key) -> Result<()>;

    /// Reserve a fresh integer key for the given kind.
    fn reserve_id(&self, kind: &str) -> Result<Key>;

    /// Run a query to completion, returning all keys and (for non-keys-only
    /// queries) all entities.
    fn get_all(&self, ctx: &Context, query: Query) -> Result<(Vec<Key>, Vec<Value>)> {
        let mut iter = self.run(ctx, query)?;
        let mut keys = Vec::new();
        let mut entities = Vec::new();
        while let Some((key, entity)) = iter.next_entity()? {
            keys.push(key);
            if let Some(entity) = entity {
                entities.push(entity);
            }
        }
        Ok((keys, entities))
    }
}

/// Typed convenience accessors over any [`Datastore`].
pub trait DatastoreExt: Datastore {
    /// Fetch and deserialize one entity.
    fn get_as<T: DeserializeOwned>(&self, ctx: &Context, key: &Key) -> Result<T> {
        Ok(serde_json::from_value(self.get(ctx, key)?)?)
    }

    /// Fetch and deserialize many entities, preserving key order.
    fn get_multi_as<T: DeserializeOwned>(&self, ctx: &Context, keys: &[Key]) -> Result<Vec<T>> {
        self.get_multi(ctx, keys)?
            .into_iter()
            .map(|entity| serde_json::from_value(entity).map_err(Error::from))
            .collect()
    }

    /// Serialize and store one entity.
    fn put_as<T: Serialize>(&self, ctx: &Context, key: &Key, entity: &T) -> Result<Key> {
        self.put(ctx, key, &serde_json::to_value(entity)?)
    }
}

impl<D: Datastore + ?Sized> DatastoreExt for D {}

/// An [`EntityIterator`] over pre-evaluated rows.
///
/// Both in-memory stores evaluate queries against a snapshot and stream the
/// resulting rows through this iterator; the context is re-checked on every
/// step so long scans still notice cancellation.
pub struct SnapshotIterator {
    rows: std::vec::IntoIter<(Key, Option<Value>)>,
    ctx: Context,
}

impl SnapshotIterator {
    /// Wrap evaluated rows in an iterator bound to `ctx`.
    pub fn new(rows: Vec<(Key, Option<Value>)>, ctx: Context) -> Self {
        SnapshotIterator {
            rows: rows.into_iter(),
            ctx,
        }
    }
}

impl EntityIterator for SnapshotIterator {
    fn next_entity(&mut self) -> Result<Option<(Key, Option<Value>)>> {
        self.ctx.check()?;
        Ok(self.rows.next())
    }
}
