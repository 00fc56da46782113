//! EntityStore trait with RocksDB and in-memory implementations
//!
//! Provides keyed get/set/delete per entity collection, prefetching of a
//! loader plan, and atomic commit of one event's write set.
//! RocksDB keeps each collection in its own column family.

use crate::context::{LoadPlan, Snapshot, WriteSet};
use crate::keys::{
    decode_entity_key, decode_watch_key, encode_entity_key, encode_watch_key, Collection, EntityKey,
};
use crate::records::{Entity, WatchMeta};
use alloy_primitives::Address;
use anyhow::{Context, Result};
use rocksdb::{ColumnFamilyDescriptor, Options, WriteBatch, DB};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

/// Column family holding dynamically watched contracts.
const WATCHED_CF: &str = "watched";

/// Column families for entity collections.
const ENTITY_CFS: [&str; 6] = ["transactions", "contracts", "users", "nfts", "events", "summary"];

/// Trait defining the interface for entity storage.
///
/// All methods return Results for proper error handling.
/// A missing entity is `Ok(None)`, never an error.
pub trait EntityStore {
    /// Get an entity by key.
    fn get(&self, key: &EntityKey) -> Result<Option<Entity>>;

    /// Store an entity under its own key.
    fn set(&self, entity: &Entity) -> Result<()>;

    /// Atomically apply every write of one handler run.
    fn commit(&self, writes: &WriteSet) -> Result<()>;

    /// Delete an entity. Deleting a missing key is a no-op.
    fn delete(&self, key: &EntityKey) -> Result<()> {
        let mut writes = WriteSet::new();
        writes.delete(key.clone());
        self.commit(&writes)
    }

    /// Keys of every stored entity in a collection, in key order.
    fn keys(&self, collection: Collection) -> Result<Vec<EntityKey>>;

    /// Resolve every declared key of a loader plan.
    fn load(&self, plan: &LoadPlan) -> Result<Snapshot> {
        let mut snapshot = Snapshot::new();
        for key in plan.keys() {
            let entity = self
                .get(key)
                .with_context(|| format!("Failed to load {}", key))?;
            snapshot.insert(key.clone(), entity);
        }
        Ok(snapshot)
    }

    /// Persist a dynamically watched contract.
    fn put_watch(&self, addr: Address, meta: &WatchMeta) -> Result<()>;

    /// Get watch metadata for an address.
    fn get_watch(&self, addr: Address) -> Result<Option<WatchMeta>>;

    /// All persisted watches, ordered by address.
    fn watched_contracts(&self) -> Result<Vec<(Address, WatchMeta)>>;
}

fn encode_entity(entity: &Entity) -> Result<Vec<u8>> {
    postcard::to_allocvec(entity).context("Failed to serialize entity")
}

fn decode_entity(key: &EntityKey, bytes: &[u8]) -> Result<Entity> {
    let entity: Entity = postcard::from_bytes(bytes)
        .with_context(|| format!("Failed to deserialize entity {}", key))?;
    if entity.key() != *key {
        anyhow::bail!("Stored entity {} does not match its key {}", entity.key(), key);
    }
    Ok(entity)
}

/// RocksDB-backed implementation of EntityStore.
///
/// Uses column families to organize collections:
/// - transactions, contracts, users, nfts: domain entities
/// - events: per-event records of every kind
/// - summary: the global events summary
/// - watched: dynamically discovered contracts
pub struct RocksEntityStore {
    db: DB,
}

impl RocksEntityStore {
    /// Open or create a RocksDB database at the given path.
    ///
    /// Creates all required column families if they don't exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let column_families = ENTITY_CFS
            .iter()
            .chain(std::iter::once(&WATCHED_CF))
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, column_families)
            .context("Failed to open RocksDB database")?;

        Ok(Self { db })
    }

    /// Get a column family handle by name.
    fn get_cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .with_context(|| format!("Column family '{}' not found", name))
    }

    fn collection_cf(&self, collection: Collection) -> Result<&rocksdb::ColumnFamily> {
        self.get_cf(collection.column_family())
    }
}

impl EntityStore for RocksEntityStore {
    fn get(&self, key: &EntityKey) -> Result<Option<Entity>> {
        let cf = self.collection_cf(key.collection)?;
        match self
            .db
            .get_cf(cf, encode_entity_key(key))
            .with_context(|| format!("Failed to get {}", key))?
        {
            Some(bytes) => Ok(Some(decode_entity(key, &bytes)?)),
            None => Ok(None),
        }
    }

    fn set(&self, entity: &Entity) -> Result<()> {
        let key = entity.key();
        let cf = self.collection_cf(key.collection)?;
        let value = encode_entity(entity)?;
        self.db
            .put_cf(cf, encode_entity_key(&key), &value)
            .with_context(|| format!("Failed to put {}", key))?;
        Ok(())
    }

    fn commit(&self, writes: &WriteSet) -> Result<()> {
        let mut batch = WriteBatch::default();
        for (key, entity) in writes.iter() {
            let cf = self.collection_cf(key.collection)?;
            match entity {
                Some(entity) => batch.put_cf(cf, encode_entity_key(key), encode_entity(entity)?),
                None => batch.delete_cf(cf, encode_entity_key(key)),
            }
        }
        self.db
            .write(batch)
            .context("Failed to commit write set")?;
        Ok(())
    }

    fn keys(&self, collection: Collection) -> Result<Vec<EntityKey>> {
        let cf = self.collection_cf(collection)?;
        let mut keys = Vec::new();
        // The events family holds every event kind
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (key, _) = item.context("Failed to read iterator")?;
            let key = decode_entity_key(&key).context("Failed to decode entity key")?;
            if key.collection == collection {
                keys.push(key);
            }
        }
        Ok(keys)
    }

    fn put_watch(&self, addr: Address, meta: &WatchMeta) -> Result<()> {
        let cf = self.get_cf(WATCHED_CF)?;
        let value = postcard::to_allocvec(meta).context("Failed to serialize watch meta")?;
        self.db
            .put_cf(cf, encode_watch_key(addr), &value)
            .context("Failed to put watch meta")?;
        Ok(())
    }

    fn get_watch(&self, addr: Address) -> Result<Option<WatchMeta>> {
        let cf = self.get_cf(WATCHED_CF)?;
        match self
            .db
            .get_cf(cf, encode_watch_key(addr))
            .context("Failed to get watch meta")?
        {
            Some(bytes) => {
                let meta = postcard::from_bytes(&bytes)
                    .context("Failed to deserialize watch meta")?;
                Ok(Some(meta))
            }
            None => Ok(None),
        }
    }

    fn watched_contracts(&self) -> Result<Vec<(Address, WatchMeta)>> {
        let cf = self.get_cf(WATCHED_CF)?;
        let mut watched = Vec::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (key, value) = item.context("Failed to read iterator")?;
            let addr = decode_watch_key(&key).context("Failed to decode watch key")?;
            let meta: WatchMeta = postcard::from_bytes(&value)
                .context("Failed to deserialize watch meta")?;
            watched.push((addr, meta));
        }
        Ok(watched)
    }
}

/// In-memory implementation of EntityStore.
///
/// Entities are kept postcard-encoded so reads go through the same
/// serialization as the RocksDB store. Used by tests and dry runs.
#[derive(Default)]
pub struct MemoryEntityStore {
    entities: Mutex<BTreeMap<EntityKey, Vec<u8>>>,
    watched: Mutex<BTreeMap<Address, WatchMeta>>,
}

impl MemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entities in a collection.
    pub fn count(&self, collection: Collection) -> Result<usize> {
        Ok(self.keys(collection)?.len())
    }

    fn lock_entities(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<EntityKey, Vec<u8>>>> {
        self.entities
            .lock()
            .map_err(|_| anyhow::anyhow!("Entity map lock poisoned"))
    }

    fn lock_watched(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<Address, WatchMeta>>> {
        self.watched
            .lock()
            .map_err(|_| anyhow::anyhow!("Watch map lock poisoned"))
    }
}

impl EntityStore for MemoryEntityStore {
    fn get(&self, key: &EntityKey) -> Result<Option<Entity>> {
        let entities = self.lock_entities()?;
        entities
            .get(key)
            .map(|bytes| decode_entity(key, bytes))
            .transpose()
    }

    fn set(&self, entity: &Entity) -> Result<()> {
        let value = encode_entity(entity)?;
        self.lock_entities()?.insert(entity.key(), value);
        Ok(())
    }

    fn commit(&self, writes: &WriteSet) -> Result<()> {
        // Encode everything first so a serialization failure leaves the map untouched
        let mut encoded = Vec::with_capacity(writes.len());
        for (key, entity) in writes.iter() {
            let value = entity.as_ref().map(encode_entity).transpose()?;
            encoded.push((key.clone(), value));
        }

        let mut entities = self.lock_entities()?;
        for (key, value) in encoded {
            match value {
                Some(value) => entities.insert(key, value),
                None => entities.remove(&key),
            };
        }
        Ok(())
    }

    fn keys(&self, collection: Collection) -> Result<Vec<EntityKey>> {
        Ok(self
            .lock_entities()?
            .keys()
            .filter(|k| k.collection == collection)
            .cloned()
            .collect())
    }

    fn put_watch(&self, addr: Address, meta: &WatchMeta) -> Result<()> {
        self.lock_watched()?.insert(addr, *meta);
        Ok(())
    }

    fn get_watch(&self, addr: Address) -> Result<Option<WatchMeta>> {
        Ok(self.lock_watched()?.get(&addr).copied())
    }

    fn watched_contracts(&self) -> Result<Vec<(Address, WatchMeta)>> {
        Ok(self
            .lock_watched()?
            .iter()
            .map(|(addr, meta)| (*addr, *meta))
            .collect())
    }
}
