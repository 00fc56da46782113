//! Entity key encoding and decoding utilities
//!
//! Every entity is addressed by a collection plus a string id.
//! Stored keys use a single-byte collection prefix followed by the id bytes;
//! per-event records add the event kind's tag as a second byte.
//! This keeps keys deterministic and groups each collection together in RocksDB.

use crate::types::EventKind;
use alloy_primitives::Address;
use anyhow::{Context, Result};
use std::fmt;
use std::str::FromStr;

/// Entity collections held by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Transaction,
    HolographableContract,
    User,
    Nft,
    EventsSummary,
    Event(EventKind),
}

impl Collection {
    /// RocksDB column family holding this collection.
    pub fn column_family(&self) -> &'static str {
        match self {
            Collection::Transaction => "transactions",
            Collection::HolographableContract => "contracts",
            Collection::User => "users",
            Collection::Nft => "nfts",
            Collection::EventsSummary => "summary",
            Collection::Event(_) => "events",
        }
    }

    fn prefix(&self) -> u8 {
        match self {
            Collection::Transaction => b'T',
            Collection::HolographableContract => b'C',
            Collection::User => b'U',
            Collection::Nft => b'N',
            Collection::EventsSummary => b'S',
            Collection::Event(_) => b'E',
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Collection::Transaction => f.write_str("Transaction"),
            Collection::HolographableContract => f.write_str("HolographableContract"),
            Collection::User => f.write_str("User"),
            Collection::Nft => f.write_str("NFT"),
            Collection::EventsSummary => f.write_str("EventsSummary"),
            Collection::Event(kind) => write!(f, "{}_{}", kind.contract(), kind),
        }
    }
}

impl FromStr for Collection {
    type Err = anyhow::Error;

    /// Accepts the display names above; a bare event name selects its record collection.
    fn from_str(s: &str) -> Result<Self> {
        let collection = match s {
            "Transaction" => Collection::Transaction,
            "HolographableContract" => Collection::HolographableContract,
            "User" => Collection::User,
            "NFT" | "Nft" => Collection::Nft,
            "EventsSummary" => Collection::EventsSummary,
            other => {
                let name = other.rsplit('_').next().unwrap_or(other);
                Collection::Event(
                    name.parse::<EventKind>()
                        .with_context(|| format!("Unknown collection: {}", s))?,
                )
            }
        };
        Ok(collection)
    }
}

/// Address of one entity: collection plus string id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey {
    pub collection: Collection,
    pub id: String,
}

impl EntityKey {
    pub fn new(collection: Collection, id: impl Into<String>) -> Self {
        Self {
            collection,
            id: id.into(),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.collection, self.id)
    }
}

/// Encode an entity key.
///
/// Format: collection prefix (1 byte) [+ event kind tag (1 byte)] + id (UTF-8)
pub fn encode_entity_key(key: &EntityKey) -> Vec<u8> {
    let mut encoded = Vec::with_capacity(key.id.len() + 2);
    encoded.push(key.collection.prefix());
    if let Collection::Event(kind) = key.collection {
        encoded.push(kind.tag());
    }
    encoded.extend_from_slice(key.id.as_bytes());
    encoded
}

/// Decode an entity key produced by [`encode_entity_key`].
pub fn decode_entity_key(bytes: &[u8]) -> Result<EntityKey> {
    let (&prefix, rest) = bytes.split_first().context("Empty entity key")?;
    let (collection, id_bytes) = match prefix {
        b'T' => (Collection::Transaction, rest),
        b'C' => (Collection::HolographableContract, rest),
        b'U' => (Collection::User, rest),
        b'N' => (Collection::Nft, rest),
        b'S' => (Collection::EventsSummary, rest),
        b'E' => {
            let (&tag, id) = rest.split_first().context("Event key missing kind tag")?;
            let kind = EventKind::ALL
                .get(tag as usize)
                .copied()
                .with_context(|| format!("Unknown event kind tag: {}", tag))?;
            (Collection::Event(kind), id)
        }
        other => anyhow::bail!("Unknown collection prefix: 0x{:02x}", other),
    };
    let id = std::str::from_utf8(id_bytes)
        .context("Entity id is not valid UTF-8")?
        .to_string();
    Ok(EntityKey { collection, id })
}

/// Encode a watched contract key.
///
/// Format: byte 'W' (0x57) + address (20 bytes)
/// Total length: 21 bytes
pub fn encode_watch_key(addr: Address) -> Vec<u8> {
    let mut key = Vec::with_capacity(21);
    key.push(b'W');
    key.extend_from_slice(addr.as_slice());
    key
}

/// Decode a watched contract key.
pub fn decode_watch_key(bytes: &[u8]) -> Result<Address> {
    if bytes.len() != 21 || bytes[0] != b'W' {
        anyhow::bail!("Invalid watch key length or prefix ({} bytes)", bytes.len());
    }
    Ok(Address::from_slice(&bytes[1..]))
}
