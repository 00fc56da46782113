//! Handler dispatch table
//!
//! Every event kind maps to one [`DispatchEntry`]: the domain entities it
//! touches and whether it discovers a new contract. [`loader`] turns an entry
//! into the keys to prefetch; [`handle`] runs the reconciliations against the
//! prefetched state in a fixed order (transaction, domain entities, per-event
//! record, summary).

use crate::context::{HandlerContext, LoadPlan};
use crate::error::IndexerError;
use crate::indexer::Outcome;
use crate::keys::{Collection, EntityKey};
use crate::reconcile::{
    build_event_record, increment_summary, reconcile_contract, reconcile_nft,
    reconcile_transaction, reconcile_user,
};
use crate::records::{event_record_id, nft_id, ContractType, Entity, GLOBAL_EVENTS_SUMMARY_KEY};
use crate::types::{address_id, hash_id, EventKind, EventLog, EventParams};
use alloy_primitives::{Address, B256, U256};
use tracing::debug;

/// One domain reconciliation performed by a handler.
#[derive(Clone, Copy)]
pub enum DomainStep {
    /// Observe a tracked contract, with a type hint.
    Contract {
        address: fn(&EventLog) -> Option<Address>,
        hint: ContractType,
    },
    /// Create the transaction origin's user.
    User,
    /// Apply an NFT transfer.
    Nft {
        transfer: fn(&EventLog) -> Option<NftTransfer>,
    },
}

/// Token movement extracted from a transfer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NftTransfer {
    pub contract: Address,
    pub token_id: U256,
    pub to: Address,
}

/// Dispatch configuration for one event kind.
pub struct DispatchEntry {
    pub kind: EventKind,
    pub domain: &'static [DomainStep],
    /// Address to register with the router, for kinds that discover contracts
    pub discovers: Option<fn(&EventLog) -> Option<Address>>,
}

fn edition_target(event: &EventLog) -> Option<Address> {
    match &event.params {
        EventParams::EditionInitialized(p) => Some(p.target),
        _ => None,
    }
}

fn deployed_contract(event: &EventLog) -> Option<Address> {
    match &event.params {
        EventParams::BridgeableContractDeployed(p) => Some(p.contract_address),
        _ => None,
    }
}

fn source_contract(event: &EventLog) -> Option<Address> {
    Some(event.src_address)
}

fn token_transfer(event: &EventLog) -> Option<NftTransfer> {
    match &event.params {
        EventParams::Transfer(p) => Some(NftTransfer {
            contract: event.src_address,
            token_id: p.token_id,
            to: p.to,
        }),
        _ => None,
    }
}

/// Dispatch entries, indexed by [`EventKind::tag`].
pub static DISPATCH_TABLE: [DispatchEntry; 11] = [
    DispatchEntry {
        kind: EventKind::EditionInitialized,
        domain: &[DomainStep::Contract {
            address: edition_target,
            hint: ContractType::HolographOpenEditionERC721,
        }],
        discovers: None,
    },
    DispatchEntry {
        kind: EventKind::HolographableContractEvent,
        domain: &[],
        discovers: None,
    },
    DispatchEntry {
        kind: EventKind::BridgeableContractDeployed,
        domain: &[
            DomainStep::Contract {
                address: deployed_contract,
                hint: ContractType::Unknown,
            },
            DomainStep::User,
        ],
        discovers: Some(deployed_contract),
    },
    DispatchEntry {
        kind: EventKind::AvailableOperatorJob,
        domain: &[],
        discovers: None,
    },
    DispatchEntry {
        kind: EventKind::CrossChainMessageSent,
        domain: &[],
        discovers: None,
    },
    DispatchEntry {
        kind: EventKind::FailedOperatorJob,
        domain: &[],
        discovers: None,
    },
    DispatchEntry {
        kind: EventKind::FinishedOperatorJob,
        domain: &[],
        discovers: None,
    },
    DispatchEntry {
        kind: EventKind::Transfer,
        domain: &[DomainStep::Nft {
            transfer: token_transfer,
        }],
        discovers: None,
    },
    DispatchEntry {
        kind: EventKind::SecondarySaleFees,
        domain: &[DomainStep::Contract {
            address: source_contract,
            hint: ContractType::CxipERC721,
        }],
        discovers: None,
    },
    DispatchEntry {
        kind: EventKind::MintFeePayout,
        domain: &[],
        discovers: None,
    },
    DispatchEntry {
        kind: EventKind::Sale,
        domain: &[],
        discovers: None,
    },
];

/// Dispatch entry for an event kind.
pub fn dispatch_entry(kind: EventKind) -> &'static DispatchEntry {
    &DISPATCH_TABLE[kind.tag() as usize]
}

fn summary_key() -> EntityKey {
    EntityKey::new(Collection::EventsSummary, GLOBAL_EVENTS_SUMMARY_KEY)
}

/// Loader phase: every key the handler may read. Performs no writes.
pub fn loader(event: &EventLog, hash: B256) -> LoadPlan {
    let kind = event.kind();
    let mut plan = LoadPlan::new();
    plan.declare(summary_key())
        .declare(EntityKey::new(Collection::Transaction, hash_id(hash)))
        .declare(EntityKey::new(
            Collection::Event(kind),
            event_record_id(hash, event.log_index),
        ));

    for step in dispatch_entry(kind).domain {
        match step {
            DomainStep::Contract { address, .. } => {
                if let Some(addr) = address(event) {
                    plan.declare(EntityKey::new(
                        Collection::HolographableContract,
                        address_id(addr),
                    ));
                }
            }
            DomainStep::User => {
                if let Some(origin) = event.tx_origin {
                    plan.declare(EntityKey::new(Collection::User, address_id(origin)));
                }
            }
            DomainStep::Nft { transfer } => {
                if let Some(t) = transfer(event) {
                    plan.declare(EntityKey::new(Collection::Nft, nft_id(t.contract, t.token_id)));
                }
            }
        }
    }
    plan
}

/// Handler phase: stage every write for `event` into `ctx`.
///
/// Returns [`Outcome::Duplicate`] without staging anything when the event's
/// record already exists.
pub fn handle(
    event: &EventLog,
    hash: B256,
    ctx: &mut HandlerContext,
) -> Result<Outcome, IndexerError> {
    let kind = event.kind();
    let record_id = event_record_id(hash, event.log_index);

    if ctx.event_record(kind, &record_id)?.is_some() {
        debug!("{} {} already recorded", kind, record_id);
        return Ok(Outcome::Duplicate);
    }

    // 1. Transaction
    let prior_tx = ctx.transaction(&hash_id(hash))?;
    if let Some(tx) = reconcile_transaction(prior_tx.as_ref(), event, hash) {
        ctx.set(Entity::Transaction(tx));
    }

    // 2. Domain entities
    for step in dispatch_entry(kind).domain {
        match step {
            DomainStep::Contract { address, hint } => {
                let Some(addr) = address(event) else { continue };
                let prior = ctx.contract(&address_id(addr))?;
                if let Some(contract) =
                    reconcile_contract(prior.as_ref(), addr, event.chain_id, *hint)
                {
                    debug!(
                        "Contract {} on chains {:?} as {}",
                        contract.id, contract.chain_ids, contract.contract_type
                    );
                    ctx.set(Entity::HolographableContract(contract));
                }
            }
            DomainStep::User => {
                let Some(origin) = event.tx_origin else { continue };
                let prior = ctx.user(&address_id(origin))?;
                if let Some(user) = reconcile_user(prior.as_ref(), Some(origin)) {
                    ctx.set(Entity::User(user));
                }
            }
            DomainStep::Nft { transfer } => {
                let Some(t) = transfer(event) else { continue };
                let id = nft_id(t.contract, t.token_id);
                let prior = ctx.nft(&id)?;
                if let Some(nft) =
                    reconcile_nft(prior.as_ref(), event, &id, t.contract, t.token_id, t.to)
                {
                    ctx.set(Entity::Nft(nft));
                }
            }
        }
    }

    // 3. Per-event record
    ctx.set(Entity::Event(build_event_record(record_id, event, &event.params)));

    // 4. Summary
    let summary = increment_summary(ctx.summary()?.as_ref(), kind)?;
    ctx.set(Entity::EventsSummary(summary));

    Ok(Outcome::Applied)
}
