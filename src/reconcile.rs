//! Entity reconciliation
//!
//! Pure functions computing the next state of an entity from its prior state
//! (if any) and an incoming event. Each returns `None` when no write is needed,
//! which keeps replays from touching the store.

use crate::error::IndexerError;
use crate::records::{
    ContractType, EventRecord, EventsSummary, HolographableContractRecord, NftRecord,
    TransactionRecord, UserRecord, GLOBAL_EVENTS_SUMMARY_KEY,
};
use crate::types::{address_id, hash_id, EventKind, EventLog, EventParams};
use alloy_primitives::{Address, B256, U256};
use tracing::warn;

/// Fold one log into its transaction.
///
/// The first write fixes block and origin fields; later logs only append
/// their index. A log index already present yields no write.
pub fn reconcile_transaction(
    prior: Option<&TransactionRecord>,
    event: &EventLog,
    hash: B256,
) -> Option<TransactionRecord> {
    match prior {
        None => Some(TransactionRecord {
            id: hash_id(hash),
            hash,
            chain_id: event.chain_id,
            block_number: event.block_number,
            block_timestamp: event.block_timestamp,
            from: event.tx_origin,
            to: event.tx_to,
            log_indexes: vec![event.log_index],
        }),
        Some(tx) if tx.log_indexes.contains(&event.log_index) => None,
        Some(tx) => {
            let mut next = tx.clone();
            next.log_indexes.push(event.log_index);
            Some(next)
        }
    }
}

/// Fold an observation of `address` on `chain_id` into its tracked contract.
///
/// Chain ids only grow. An `Unknown` type is upgraded by a concrete hint;
/// a concrete type is kept against a conflicting hint, which is logged.
pub fn reconcile_contract(
    prior: Option<&HolographableContractRecord>,
    address: Address,
    chain_id: u64,
    hint: ContractType,
) -> Option<HolographableContractRecord> {
    let Some(contract) = prior else {
        return Some(HolographableContractRecord {
            id: address_id(address),
            chain_ids: vec![chain_id],
            contract_address: address,
            contract_type: hint,
        });
    };

    let mut next = contract.clone();
    let mut changed = false;

    if !next.chain_ids.contains(&chain_id) {
        next.chain_ids.push(chain_id);
        changed = true;
    }

    if hint.is_known() && hint != next.contract_type {
        if next.contract_type.is_known() {
            warn!(
                "Conflicting type hint for contract {}: keeping {}, ignoring {}",
                next.id, next.contract_type, hint
            );
        } else {
            next.contract_type = hint;
            changed = true;
        }
    }

    changed.then_some(next)
}

/// Create the user for a transaction origin, once.
pub fn reconcile_user(prior: Option<&UserRecord>, origin: Option<Address>) -> Option<UserRecord> {
    match (prior, origin) {
        (None, Some(address)) => Some(UserRecord {
            id: address_id(address),
            address,
        }),
        _ => None,
    }
}

/// Apply a transfer of `token_id` on `contract` to the NFT's owner.
///
/// On the chain the token was last seen on, the owner only moves forward in
/// (block number, log index) order. A transfer on another chain is a bridged
/// token and replaces the owner and chain.
pub fn reconcile_nft(
    prior: Option<&NftRecord>,
    event: &EventLog,
    id: &str,
    contract: Address,
    token_id: U256,
    to: Address,
) -> Option<NftRecord> {
    let position = (event.block_number, event.log_index);
    match prior {
        None => Some(NftRecord {
            id: id.to_string(),
            chain_id: event.chain_id,
            contract_address: contract,
            token_id,
            owner: to,
            last_transfer_block: event.block_number,
            last_transfer_log_index: event.log_index,
        }),
        Some(nft)
            if nft.chain_id == event.chain_id
                && position <= (nft.last_transfer_block, nft.last_transfer_log_index) =>
        {
            None
        }
        Some(nft) => {
            let mut next = nft.clone();
            next.chain_id = event.chain_id;
            next.owner = to;
            next.last_transfer_block = event.block_number;
            next.last_transfer_log_index = event.log_index;
            Some(next)
        }
    }
}

/// Increment the counter of `kind`. A missing summary counts as all zeros.
pub fn increment_summary(
    prior: Option<&EventsSummary>,
    kind: EventKind,
) -> Result<EventsSummary, IndexerError> {
    let mut next = prior.cloned().unwrap_or_default();
    let counter = next.count_mut(kind);
    *counter = counter
        .checked_add(1)
        .ok_or(IndexerError::CounterOverflow { kind })?;
    Ok(next)
}

/// Per-event record for a newly processed log.
pub fn build_event_record(id: String, event: &EventLog, data: &EventParams) -> EventRecord {
    EventRecord {
        id,
        log_index: event.log_index,
        events_summary: GLOBAL_EVENTS_SUMMARY_KEY.to_string(),
        data: data.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CrossChainMessageSent, Transfer};
    use alloy_primitives::{address, b256};

    const HASH: B256 = b256!("00000000000000000000000000000000000000000000000000000000000000aa");
    const CONTRACT: Address = address!("00000000000000000000000000000000000000a1");
    const ALICE: Address = address!("70997970c51812dc3a010c7d01b50e0d17dc79c8");
    const BOB: Address = address!("3c44cdddb6a900fa2b585dd299e03d12fa4293bc");

    fn event(chain_id: u64, block_number: u64, log_index: u64) -> EventLog {
        EventLog {
            chain_id,
            block_number,
            block_timestamp: 1_700_000_000 + block_number,
            src_address: CONTRACT,
            transaction_hash: Some(HASH),
            log_index,
            tx_origin: Some(ALICE),
            tx_to: Some(CONTRACT),
            params: EventParams::CrossChainMessageSent(CrossChainMessageSent {
                message_hash: B256::ZERO,
            }),
        }
    }

    #[test]
    fn test_transaction_created_then_appended() {
        let first = reconcile_transaction(None, &event(1, 10, 3), HASH).unwrap();
        assert_eq!(first.log_indexes, vec![3]);
        assert_eq!(first.from, Some(ALICE));
        assert_eq!(first.id, hash_id(HASH));

        let second = reconcile_transaction(Some(&first), &event(1, 10, 1), HASH).unwrap();
        assert_eq!(second.log_indexes, vec![3, 1]);
        assert_eq!(second.block_number, 10);
    }

    #[test]
    fn test_transaction_duplicate_log_index_is_noop() {
        let first = reconcile_transaction(None, &event(1, 10, 3), HASH).unwrap();
        assert_eq!(reconcile_transaction(Some(&first), &event(1, 10, 3), HASH), None);
    }

    #[test]
    fn test_transaction_keeps_first_block_fields() {
        let first = reconcile_transaction(None, &event(1, 10, 0), HASH).unwrap();
        let next = reconcile_transaction(Some(&first), &event(1, 99, 1), HASH).unwrap();
        assert_eq!(next.block_number, 10);
        assert_eq!(next.block_timestamp, first.block_timestamp);
    }

    #[test]
    fn test_contract_created_with_hint() {
        let c = reconcile_contract(None, CONTRACT, 1, ContractType::CxipERC721).unwrap();
        assert_eq!(c.chain_ids, vec![1]);
        assert_eq!(c.contract_type, ContractType::CxipERC721);
        assert_eq!(c.id, "0x00000000000000000000000000000000000000a1");
    }

    #[test]
    fn test_contract_chain_ids_grow_without_duplicates() {
        let c = reconcile_contract(None, CONTRACT, 1, ContractType::Unknown).unwrap();
        let c = reconcile_contract(Some(&c), CONTRACT, 2, ContractType::Unknown).unwrap();
        assert_eq!(c.chain_ids, vec![1, 2]);
        assert_eq!(reconcile_contract(Some(&c), CONTRACT, 1, ContractType::Unknown), None);
    }

    #[test]
    fn test_contract_type_upgrade_and_stickiness() {
        let c = reconcile_contract(None, CONTRACT, 1, ContractType::Unknown).unwrap();
        let upgraded = reconcile_contract(Some(&c), CONTRACT, 1, ContractType::CxipERC721).unwrap();
        assert_eq!(upgraded.contract_type, ContractType::CxipERC721);

        // Conflicting concrete hint is ignored
        assert_eq!(
            reconcile_contract(
                Some(&upgraded),
                CONTRACT,
                1,
                ContractType::HolographOpenEditionERC721
            ),
            None
        );

        // Never downgraded, even alongside a chain id change
        let on_chain_3 =
            reconcile_contract(Some(&upgraded), CONTRACT, 3, ContractType::Unknown).unwrap();
        assert_eq!(on_chain_3.contract_type, ContractType::CxipERC721);
        assert_eq!(on_chain_3.chain_ids, vec![1, 3]);
    }

    #[test]
    fn test_user_created_once() {
        assert_eq!(reconcile_user(None, None), None);
        let user = reconcile_user(None, Some(ALICE)).unwrap();
        assert_eq!(user.address, ALICE);
        assert_eq!(reconcile_user(Some(&user), Some(ALICE)), None);
    }

    #[test]
    fn test_nft_owner_moves_forward_only() {
        let id = "nft";
        let nft = reconcile_nft(None, &event(1, 10, 5), id, CONTRACT, U256::from(7u64), ALICE)
            .unwrap();
        assert_eq!(nft.owner, ALICE);

        // Older transfer on the same chain is ignored
        assert_eq!(
            reconcile_nft(Some(&nft), &event(1, 10, 4), id, CONTRACT, U256::from(7u64), BOB),
            None
        );
        assert_eq!(
            reconcile_nft(Some(&nft), &event(1, 10, 5), id, CONTRACT, U256::from(7u64), BOB),
            None
        );

        let moved = reconcile_nft(Some(&nft), &event(1, 11, 0), id, CONTRACT, U256::from(7u64), BOB)
            .unwrap();
        assert_eq!(moved.owner, BOB);
        assert_eq!((moved.last_transfer_block, moved.last_transfer_log_index), (11, 0));
    }

    #[test]
    fn test_nft_bridged_transfer_replaces_chain() {
        let id = "nft";
        let nft = reconcile_nft(None, &event(1, 500, 0), id, CONTRACT, U256::from(7u64), ALICE)
            .unwrap();
        let bridged = reconcile_nft(Some(&nft), &event(2, 3, 0), id, CONTRACT, U256::from(7u64), BOB)
            .unwrap();
        assert_eq!(bridged.chain_id, 2);
        assert_eq!(bridged.owner, BOB);
    }

    #[test]
    fn test_summary_increment_from_missing() {
        let summary = increment_summary(None, EventKind::Sale).unwrap();
        assert_eq!(summary.count(EventKind::Sale), 1);
        assert_eq!(summary.id, GLOBAL_EVENTS_SUMMARY_KEY);
        let summary = increment_summary(Some(&summary), EventKind::Sale).unwrap();
        assert_eq!(summary.count(EventKind::Sale), 2);
    }

    #[test]
    fn test_summary_overflow_is_error() {
        let mut summary = EventsSummary::default();
        *summary.count_mut(EventKind::Transfer) = u64::MAX;
        let err = increment_summary(Some(&summary), EventKind::Transfer).unwrap_err();
        assert!(matches!(err, IndexerError::CounterOverflow { kind: EventKind::Transfer }));
    }

    #[test]
    fn test_event_record_fields() {
        let ev = event(1, 10, 4);
        let data = EventParams::Transfer(Transfer {
            from: Address::ZERO,
            to: ALICE,
            token_id: U256::from(1u64),
        });
        let record = build_event_record("id4".to_string(), &ev, &data);
        assert_eq!(record.log_index, 4);
        assert_eq!(record.events_summary, GLOBAL_EVENTS_SUMMARY_KEY);
        assert_eq!(record.kind(), EventKind::Transfer);
    }
}
