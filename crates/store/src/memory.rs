//! Ordered in-memory datastore.
//!
//! The embedded-emulator variant of the backing store: one ordered map
//! behind a read/write lock. Queries evaluate against a point-in-time
//! snapshot of the kind being scanned, so a scan observes a consistent
//! view even while writers proceed.

use parking_lot::RwLock;
use runboard_core::{Context, Error, Key, KeyId, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::query::Query;
use crate::{Datastore, EntityIterator, SnapshotIterator};

/// In-memory [`Datastore`] over a single ordered map.
#[derive(Debug, Default)]
pub struct MemoryDatastore {
    entities: RwLock<BTreeMap<Key, Value>>,
    next_id: AtomicI64,
}

impl MemoryDatastore {
    /// Create a new empty store.
    pub fn new() -> Self {
        MemoryDatastore {
            entities: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(0),
        }
    }

    /// Total number of entities across all kinds.
    pub fn len(&self) -> usize {
        self.entities.read().len()
    }

    /// Whether the store holds no entities.
    pub fn is_empty(&self) -> bool {
        self.entities.read().is_empty()
    }

    fn allocate_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn snapshot_kind(&self, kind: &str) -> Vec<(Key, Value)> {
        self.entities
            .read()
            .iter()
            .filter(|(key, _)| key.kind == kind)
            .map(|(key, entity)| (key.clone(), entity.clone()))
            .collect()
    }
}

impl Datastore for MemoryDatastore {
    fn run(&self, ctx: &Context, query: Query) -> Result<Box<dyn EntityIterator>> {
        ctx.check()?;
        let rows = query.evaluate(self.snapshot_kind(query.kind()));
        Ok(Box::new(SnapshotIterator::new(rows, ctx.clone())))
    }

    fn get(&self, ctx: &Context, key: &Key) -> Result<Value> {
        ctx.check()?;
        self.entities
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| Error::NotFound(key.to_string()))
    }

    fn put(&self, ctx: &Context, key: &Key, entity: &Value) -> Result<Key> {
        ctx.check()?;
        let key = match &key.id {
            KeyId::Int(0) => Key::int(key.kind.clone(), self.allocate_id()),
            _ => key.clone(),
        };
        self.entities.write().insert(key.clone(), entity.clone());
        Ok(key)
    }

    fn insert(&self, ctx: &Context, key: &Key, entity: &Value) -> Result<()> {
        ctx.check()?;
        let mut entities = self.entities.write();
        if entities.contains_key(key) {
            return Err(Error::EntityExists(key.to_string()));
        }
        entities.insert(key.clone(), entity.clone());
        Ok(())
    }

    fn update(
        &self,
        ctx: &Context,
        key: &Key,
        mutator: &mut dyn FnMut(&mut Value) -> Result<()>,
    ) -> Result<()> {
        ctx.check()?;
        let mut entities = self.entities.write();
        let mut entity = entities.get(key).cloned().unwrap_or(Value::Null);
        mutator(&mut entity)?;
        entities.insert(key.clone(), entity);
        Ok(())
    }

    fn delete(&self, ctx: &Context, key: &Key) -> Result<()> {
        ctx.check()?;
        self.entities.write().remove(key);
        Ok(())
    }

    fn reserve_id(&self, kind: &str) -> Result<Key> {
        Ok(Key::int(kind, self.allocate_id()))
    }
}
