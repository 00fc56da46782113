//! Loader plans, prefetched snapshots and the handler context
//!
//! Processing an event is split in two phases. The loader declares every key
//! the handler will read ([`LoadPlan`]); the store resolves the plan into a
//! [`Snapshot`]; the handler then works against a [`HandlerContext`] that
//! serves reads from the snapshot (and its own staged writes) and collects
//! every write into a [`WriteSet`]. The write set is committed atomically, so
//! a failing handler leaves no trace in the store.

use crate::error::IndexerError;
use crate::keys::{Collection, EntityKey};
use crate::records::{
    Entity, EventRecord, EventsSummary, HolographableContractRecord, NftRecord,
    TransactionRecord, UserRecord, GLOBAL_EVENTS_SUMMARY_KEY,
};
use crate::types::EventKind;
use std::collections::{BTreeMap, BTreeSet};

/// Keys declared by the loader phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadPlan {
    keys: BTreeSet<EntityKey>,
}

impl LoadPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a key; declaring a key that does not exist is fine.
    pub fn declare(&mut self, key: EntityKey) -> &mut Self {
        self.keys.insert(key);
        self
    }

    pub fn contains(&self, key: &EntityKey) -> bool {
        self.keys.contains(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &EntityKey> {
        self.keys.iter()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Prefetched state for every key of a [`LoadPlan`]; `None` marks an absent entity.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    entries: BTreeMap<EntityKey, Option<Entity>>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: EntityKey, entity: Option<Entity>) {
        self.entries.insert(key, entity);
    }
}

/// Writes staged by one handler run. `None` deletes the key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSet {
    writes: BTreeMap<EntityKey, Option<Entity>>,
}

impl WriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, entity: Entity) {
        self.writes.insert(entity.key(), Some(entity));
    }

    pub fn delete(&mut self, key: EntityKey) {
        self.writes.insert(key, None);
    }

    pub fn get(&self, key: &EntityKey) -> Option<&Option<Entity>> {
        self.writes.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EntityKey, &Option<Entity>)> {
        self.writes.iter()
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

/// State visible to one handler run.
#[derive(Debug)]
pub struct HandlerContext {
    snapshot: Snapshot,
    writes: WriteSet,
}

macro_rules! typed_getter {
    ($(#[$doc:meta])* $name:ident, $variant:ident, $record:ty) => {
        $(#[$doc])*
        pub fn $name(&self, id: &str) -> Result<Option<$record>, IndexerError> {
            let key = EntityKey::new(Collection::$variant, id);
            match self.read(&key)? {
                None => Ok(None),
                Some(Entity::$variant(record)) => Ok(Some(record.clone())),
                Some(_) => Err(IndexerError::EntityMismatch { key }),
            }
        }
    };
}

impl HandlerContext {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            snapshot,
            writes: WriteSet::new(),
        }
    }

    /// Read a key, preferring this run's staged writes over the snapshot.
    pub fn read(&self, key: &EntityKey) -> Result<Option<&Entity>, IndexerError> {
        if let Some(staged) = self.writes.get(key) {
            return Ok(staged.as_ref());
        }
        match self.snapshot.entries.get(key) {
            Some(entity) => Ok(entity.as_ref()),
            None => Err(IndexerError::UndeclaredRead { key: key.clone() }),
        }
    }

    typed_getter!(transaction, Transaction, TransactionRecord);
    typed_getter!(contract, HolographableContract, HolographableContractRecord);
    typed_getter!(user, User, UserRecord);
    typed_getter!(nft, Nft, NftRecord);

    /// The singleton summary, if it has been created.
    pub fn summary(&self) -> Result<Option<EventsSummary>, IndexerError> {
        let key = EntityKey::new(Collection::EventsSummary, GLOBAL_EVENTS_SUMMARY_KEY);
        match self.read(&key)? {
            None => Ok(None),
            Some(Entity::EventsSummary(summary)) => Ok(Some(summary.clone())),
            Some(_) => Err(IndexerError::EntityMismatch { key }),
        }
    }

    pub fn event_record(&self, kind: EventKind, id: &str) -> Result<Option<EventRecord>, IndexerError> {
        let key = EntityKey::new(Collection::Event(kind), id);
        match self.read(&key)? {
            None => Ok(None),
            Some(Entity::Event(record)) if record.kind() == kind => Ok(Some(record.clone())),
            Some(_) => Err(IndexerError::EntityMismatch { key }),
        }
    }

    pub fn set(&mut self, entity: Entity) {
        self.writes.put(entity);
    }

    pub fn into_write_set(self) -> WriteSet {
        self.writes
    }
}
