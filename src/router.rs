//! Event routing by watched address
//!
//! Statically configured contracts are registered per schema. Contracts found
//! at runtime through deployments are watched for every Holographable schema.

use crate::config::ContractEntry;
use crate::records::WatchMeta;
use crate::store::EntityStore;
use crate::types::{ContractKind, EventLog};
use alloy_primitives::Address;
use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::info;

/// Set-backed registry of watched (schema, address) pairs.
#[derive(Debug, Default)]
pub struct EventRouter {
    configured: HashMap<ContractKind, HashSet<Address>>,
    discovered: BTreeMap<Address, WatchMeta>,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a router from configured contracts.
    pub fn from_config(entries: &[ContractEntry]) -> Self {
        let mut router = Self::new();
        for entry in entries {
            router.add_configured(entry.kind, entry.address);
        }
        router
    }

    /// Register a statically configured contract.
    pub fn add_configured(&mut self, kind: ContractKind, address: Address) {
        self.configured.entry(kind).or_default().insert(address);
    }

    /// Whether the event's source is registered for the event's schema.
    pub fn accepts(&self, event: &EventLog) -> bool {
        let kind = event.kind().contract();
        let configured = self
            .configured
            .get(&kind)
            .is_some_and(|set| set.contains(&event.src_address));
        configured || (kind.is_holographable() && self.discovered.contains_key(&event.src_address))
    }

    /// Whether `address` was already discovered.
    ///
    /// Configured entries do not count: they cover a single schema, while a
    /// discovered contract is routed for every Holographable schema.
    pub fn is_watched(&self, address: Address) -> bool {
        self.discovered.contains_key(&address)
    }

    /// Watch a discovered contract. Returns `false` if it was already watched.
    pub fn watch_address(&mut self, address: Address, meta: WatchMeta) -> bool {
        if self.is_watched(address) {
            return false;
        }
        self.discovered.insert(address, meta);
        true
    }

    /// Discovered contracts, ordered by address.
    pub fn discovered(&self) -> impl Iterator<Item = (&Address, &WatchMeta)> {
        self.discovered.iter()
    }

    /// Reload watches persisted by earlier runs.
    pub fn restore(&mut self, store: &dyn EntityStore) -> Result<usize> {
        let watched = store
            .watched_contracts()
            .context("Failed to load watched contracts")?;
        let mut restored = 0;
        for (address, meta) in watched {
            if self.watch_address(address, meta) {
                restored += 1;
            }
        }
        info!("Restored {} watched contracts", restored);
        Ok(restored)
    }
}
