//! Dynamic discovery of Holographable contracts
//!
//! A deployment event names a contract that will emit its own events later.
//! The deployed address is persisted as a watch and added to the router
//! before the deployment's own entities are reconciled.

use crate::handlers::dispatch_entry;
use crate::records::WatchMeta;
use crate::router::EventRouter;
use crate::store::EntityStore;
use crate::types::EventLog;
use alloy_primitives::Address;
use anyhow::{Context, Result};
use tracing::{debug, info};

/// Request to start watching a newly deployed contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationIntent {
    pub address: Address,
    pub meta: WatchMeta,
}

/// Registration requested by `event`, if its kind discovers contracts.
pub fn registration_intent(event: &EventLog) -> Option<RegistrationIntent> {
    let discover = dispatch_entry(event.kind()).discovers?;
    let address = discover(event)?;
    Some(RegistrationIntent {
        address,
        meta: WatchMeta {
            chain_id: event.chain_id,
            start_block: event.block_number,
        },
    })
}

/// Apply a registration. Returns `false` when the address was already watched.
///
/// The watch is persisted before the router sees it, so a failed write
/// leaves the router unchanged. A watch already in the store keeps its
/// original metadata.
pub fn apply_registration(
    store: &dyn EntityStore,
    router: &mut EventRouter,
    intent: RegistrationIntent,
) -> Result<bool> {
    if router.is_watched(intent.address) {
        debug!("Contract {:?} already watched", intent.address);
        return Ok(false);
    }

    let stored = store
        .get_watch(intent.address)
        .with_context(|| format!("Failed to read watch for {:?}", intent.address))?;
    if let Some(meta) = stored {
        debug!("Contract {:?} already persisted, restoring watch", intent.address);
        router.watch_address(intent.address, meta);
        return Ok(false);
    }

    store
        .put_watch(intent.address, &intent.meta)
        .with_context(|| format!("Failed to persist watch for {:?}", intent.address))?;
    router.watch_address(intent.address, intent.meta);

    info!(
        "Watching contract {:?} from chain {} block {}",
        intent.address, intent.meta.chain_id, intent.meta.start_block
    );
    Ok(true)
}
