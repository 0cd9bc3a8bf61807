//! Kind-sharded in-memory datastore.
//!
//! Replaces the single ordered map with DashMap + FxHashMap: lock-free
//! reads, per-kind sharded writes, O(1) key lookups. Scans of one kind
//! never contend with writes to another, which matches how a standalone
//! store client pools per-kind traffic.
//!
//! Ordering is produced at query time (queries sort their snapshot), so
//! the shards themselves can stay unordered.

use dashmap::DashMap;
use runboard_core::{Context, Error, Key, KeyId, Result};
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::query::Query;
use crate::{Datastore, EntityIterator, SnapshotIterator};

/// Per-kind shard holding that kind's entities.
#[derive(Debug, Default)]
struct Shard {
    data: FxHashMap<KeyId, Value>,
}

/// In-memory [`Datastore`] sharded by entity kind.
pub struct ShardedDatastore {
    shards: DashMap<String, Shard>,
    next_id: AtomicI64,
}

impl ShardedDatastore {
    /// Create a new empty store.
    pub fn new() -> Self {
        ShardedDatastore {
            shards: DashMap::new(),
            next_id: AtomicI64::new(0),
        }
    }

    /// Number of kinds with at least one entity.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Total number of entities across all kinds.
    pub fn total_entities(&self) -> usize {
        self.shards.iter().map(|entry| entry.value().data.len()).sum()
    }

    fn allocate_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn snapshot_kind(&self, kind: &str) -> Vec<(Key, Value)> {
        let mut rows: Vec<(Key, Value)> = match self.shards.get(kind) {
            Some(shard) => shard
                .data
                .iter()
                .map(|(id, entity)| {
                    (
                        Key {
                            kind: kind.to_string(),
                            id: id.clone(),
                        },
                        entity.clone(),
                    )
                })
                .collect(),
            None => Vec::new(),
        };
        // Key order keeps unordered queries deterministic across calls.
        rows.sort_by(|(a, _), (b, _)| a.cmp(b));
        rows
    }
}

impl Default for ShardedDatastore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ShardedDatastore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardedDatastore")
            .field("shard_count", &self.shard_count())
            .field("total_entities", &self.total_entities())
            .finish()
    }
}

impl Datastore for ShardedDatastore {
    fn run(&self, ctx: &Context, query: Query) -> Result<Box<dyn EntityIterator>> {
        ctx.check()?;
        let rows = query.evaluate(self.snapshot_kind(query.kind()));
        Ok(Box::new(SnapshotIterator::new(rows, ctx.clone())))
    }

    fn get(&self, ctx: &Context, key: &Key) -> Result<Value> {
        ctx.check()?;
        self.shards
            .get(&key.kind)
            .and_then(|shard| shard.data.get(&key.id).cloned())
            .ok_or_else(|| Error::NotFound(key.to_string()))
    }

    fn put(&self, ctx: &Context, key: &Key, entity: &Value) -> Result<Key> {
        ctx.check()?;
        let key = match &key.id {
            KeyId::Int(0) => Key::int(key.kind.clone(), self.allocate_id()),
            _ => key.clone(),
        };
        self.shards
            .entry(key.kind.clone())
            .or_default()
            .data
            .insert(key.id.clone(), entity.clone());
        Ok(key)
    }

    fn insert(&self, ctx: &Context, key: &Key, entity: &Value) -> Result<()> {
        ctx.check()?;
        let mut shard = self.shards.entry(key.kind.clone()).or_default();
        if shard.data.contains_key(&key.id) {
            return Err(Error::EntityExists(key.to_string()));
        }
        shard.data.insert(key.id.clone(), entity.clone());
        Ok(())
    }

    fn update(
        &self,
        ctx: &Context,
        key: &Key,
        mutator: &mut dyn FnMut(&mut Value) -> Result<()>,
    ) -> Result<()> {
        ctx.check()?;
        let mut shard = self.shards.entry(key.kind.clone()).or_default();
        let mut entity = shard.data.get(&key.id).cloned().unwrap_or(Value::Null);
        mutator(&mut entity)?;
        shard.data.insert(key.id.clone(), entity);
        Ok(())
    }

    fn delete(&self, ctx: &Context, key: &Key) -> Result<()> {
        ctx.check()?;
        if let Some(mut shard) = self.shards.get_mut(&key.kind) {
            shard.data.remove(&key.id);
        }
        Ok(())
    }

    fn reserve_id(&self, kind: &str) -> Result<Key> {
        Ok(Key::int(kind, self.allocate_id()))
    }
}
