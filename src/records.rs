//! Record types for materialized entities
//!
//! These structs represent the data stored in the entity store.
//! They use postcard for binary serialization, which is compact and deterministic,
//! and serde_json (camelCase) for the query tool's output.

use crate::keys::{Collection, EntityKey};
use crate::types::{address_id, hash_id, EventKind, EventParams};
use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Well-known id of the singleton summary record.
pub const GLOBAL_EVENTS_SUMMARY_KEY: &str = "GlobalEventsSummary";

/// Transaction that emitted one or more indexed logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    /// Same as the hash rendering
    pub id: String,
    pub hash: B256,
    pub chain_id: u64,
    pub block_number: u64,
    pub block_timestamp: u64,
    /// Transaction origin (sender)
    pub from: Option<Address>,
    /// Transaction recipient
    pub to: Option<Address>,
    /// Log indexes seen for this transaction, in arrival order, without duplicates
    pub log_indexes: Vec<u64>,
}

/// Classification of a tracked Holographable contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContractType {
    CxipERC721,
    HolographOpenEditionERC721,
    #[default]
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl ContractType {
    pub fn is_known(&self) -> bool {
        !matches!(self, ContractType::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContractType::CxipERC721 => "CxipERC721",
            ContractType::HolographOpenEditionERC721 => "HolographOpenEditionERC721",
            ContractType::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ContractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContractType {
    type Err = std::convert::Infallible;

    /// Unrecognized names are not an error: they resolve to `Unknown`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "CxipERC721" => ContractType::CxipERC721,
            "HolographOpenEditionERC721" => ContractType::HolographOpenEditionERC721,
            _ => ContractType::Unknown,
        })
    }
}

/// Holographable contract observed on one or more chains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HolographableContractRecord {
    pub id: String,
    /// Chains the contract has been observed on; unique members, arrival order
    pub chain_ids: Vec<u64>,
    pub contract_address: Address,
    pub contract_type: ContractType,
}

/// Wallet that originated at least one indexed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub address: Address,
}

/// Token minted by a Holographable contract, with its current owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NftRecord {
    pub id: String,
    pub chain_id: u64,
    pub contract_address: Address,
    pub token_id: U256,
    pub owner: Address,
    /// Block of the last transfer applied to `owner`
    pub last_transfer_block: u64,
    /// Log index of the last transfer applied to `owner`
    pub last_transfer_log_index: u64,
}

/// One record per processed log, keyed by transaction hash + log index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub id: String,
    pub log_index: u64,
    /// Always [`GLOBAL_EVENTS_SUMMARY_KEY`]
    pub events_summary: String,
    pub data: EventParams,
}

impl EventRecord {
    pub fn kind(&self) -> EventKind {
        self.data.kind()
    }
}

/// Per-event-type occurrence counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsSummary {
    pub id: String,
    #[serde(rename = "editionsMetadataRenderer_EditionInitializedCount")]
    pub editions_metadata_renderer_edition_initialized_count: u64,
    #[serde(rename = "holographRegistry_HolographableContractEventCount")]
    pub holograph_registry_holographable_contract_event_count: u64,
    #[serde(rename = "holographFactory_BridgeableContractDeployedCount")]
    pub holograph_factory_bridgeable_contract_deployed_count: u64,
    #[serde(rename = "holographOperator_AvailableOperatorJobCount")]
    pub holograph_operator_available_operator_job_count: u64,
    #[serde(rename = "holographOperator_CrossChainMessageSentCount")]
    pub holograph_operator_cross_chain_message_sent_count: u64,
    #[serde(rename = "holographOperator_FailedOperatorJobCount")]
    pub holograph_operator_failed_operator_job_count: u64,
    #[serde(rename = "holographOperator_FinishedOperatorJobCount")]
    pub holograph_operator_finished_operator_job_count: u64,
    #[serde(rename = "holographableContract_TransferCount")]
    pub holographable_contract_transfer_count: u64,
    #[serde(rename = "holographableContract_SecondarySaleFeesCount")]
    pub holographable_contract_secondary_sale_fees_count: u64,
    #[serde(rename = "holographDropERC721_MintFeePayoutCount")]
    pub holograph_drop_erc721_mint_fee_payout_count: u64,
    #[serde(rename = "holographDropERC721_SaleCount")]
    pub holograph_drop_erc721_sale_count: u64,
}

impl Default for EventsSummary {
    fn default() -> Self {
        Self {
            id: GLOBAL_EVENTS_SUMMARY_KEY.to_string(),
            editions_metadata_renderer_edition_initialized_count: 0,
            holograph_registry_holographable_contract_event_count: 0,
            holograph_factory_bridgeable_contract_deployed_count: 0,
            holograph_operator_available_operator_job_count: 0,
            holograph_operator_cross_chain_message_sent_count: 0,
            holograph_operator_failed_operator_job_count: 0,
            holograph_operator_finished_operator_job_count: 0,
            holographable_contract_transfer_count: 0,
            holographable_contract_secondary_sale_fees_count: 0,
            holograph_drop_erc721_mint_fee_payout_count: 0,
            holograph_drop_erc721_sale_count: 0,
        }
    }
}

impl EventsSummary {
    /// Counter for one event kind.
    pub fn count(&self, kind: EventKind) -> u64 {
        match kind {
            EventKind::EditionInitialized => self.editions_metadata_renderer_edition_initialized_count,
            EventKind::HolographableContractEvent => {
                self.holograph_registry_holographable_contract_event_count
            }
            EventKind::BridgeableContractDeployed => {
                self.holograph_factory_bridgeable_contract_deployed_count
            }
            EventKind::AvailableOperatorJob => self.holograph_operator_available_operator_job_count,
            EventKind::CrossChainMessageSent => self.holograph_operator_cross_chain_message_sent_count,
            EventKind::FailedOperatorJob => self.holograph_operator_failed_operator_job_count,
            EventKind::FinishedOperatorJob => self.holograph_operator_finished_operator_job_count,
            EventKind::Transfer => self.holographable_contract_transfer_count,
            EventKind::SecondarySaleFees => self.holographable_contract_secondary_sale_fees_count,
            EventKind::MintFeePayout => self.holograph_drop_erc721_mint_fee_payout_count,
            EventKind::Sale => self.holograph_drop_erc721_sale_count,
        }
    }

    /// Mutable counter for one event kind.
    pub fn count_mut(&mut self, kind: EventKind) -> &mut u64 {
        match kind {
            EventKind::EditionInitialized => {
                &mut self.editions_metadata_renderer_edition_initialized_count
            }
            EventKind::HolographableContractEvent => {
                &mut self.holograph_registry_holographable_contract_event_count
            }
            EventKind::BridgeableContractDeployed => {
                &mut self.holograph_factory_bridgeable_contract_deployed_count
            }
            EventKind::AvailableOperatorJob => {
                &mut self.holograph_operator_available_operator_job_count
            }
            EventKind::CrossChainMessageSent => {
                &mut self.holograph_operator_cross_chain_message_sent_count
            }
            EventKind::FailedOperatorJob => &mut self.holograph_operator_failed_operator_job_count,
            EventKind::FinishedOperatorJob => {
                &mut self.holograph_operator_finished_operator_job_count
            }
            EventKind::Transfer => &mut self.holographable_contract_transfer_count,
            EventKind::SecondarySaleFees => {
                &mut self.holographable_contract_secondary_sale_fees_count
            }
            EventKind::MintFeePayout => &mut self.holograph_drop_erc721_mint_fee_payout_count,
            EventKind::Sale => &mut self.holograph_drop_erc721_sale_count,
        }
    }
}

/// Any stored entity, tagged with its collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Entity {
    Transaction(TransactionRecord),
    HolographableContract(HolographableContractRecord),
    User(UserRecord),
    Nft(NftRecord),
    EventsSummary(EventsSummary),
    Event(EventRecord),
}

impl Entity {
    /// The key this entity is stored under.
    pub fn key(&self) -> EntityKey {
        match self {
            Entity::Transaction(r) => EntityKey::new(Collection::Transaction, r.id.clone()),
            Entity::HolographableContract(r) => {
                EntityKey::new(Collection::HolographableContract, r.id.clone())
            }
            Entity::User(r) => EntityKey::new(Collection::User, r.id.clone()),
            Entity::Nft(r) => EntityKey::new(Collection::Nft, r.id.clone()),
            Entity::EventsSummary(r) => EntityKey::new(Collection::EventsSummary, r.id.clone()),
            Entity::Event(r) => EntityKey::new(Collection::Event(r.kind()), r.id.clone()),
        }
    }

    /// JSON view of the inner record.
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            Entity::Transaction(r) => serde_json::to_value(r),
            Entity::HolographableContract(r) => serde_json::to_value(r),
            Entity::User(r) => serde_json::to_value(r),
            Entity::Nft(r) => serde_json::to_value(r),
            Entity::EventsSummary(r) => serde_json::to_value(r),
            Entity::Event(r) => serde_json::to_value(r),
        }
    }
}

/// Metadata persisted for every dynamically watched contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchMeta {
    /// Chain on which the deployment was first seen
    pub chain_id: u64,
    /// Block at which the contract was discovered
    pub start_block: u64,
}

/// Id of a per-event record: transaction hash followed by the decimal log index.
pub fn event_record_id(hash: B256, log_index: u64) -> String {
    format!("{}{}", hash_id(hash), log_index)
}

/// Id of an NFT: contract address followed by the decimal token id.
pub fn nft_id(contract: Address, token_id: U256) -> String {
    format!("{}{}", address_id(contract), token_id)
}
