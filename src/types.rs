//! Decoded Holograph event types
//!
//! The event envelope delivered by the router, the contract schemas it comes
//! from, and the decoded parameters of every event kind we materialize.
//! Envelopes arrive as JSON (one object per line); the parameter structs are
//! also embedded in the stored per-event records, so every custom serde
//! helper here branches on `is_human_readable` to stay postcard-compatible.

use alloy_primitives::{Address, B256, U256};
use anyhow::{Context, Result};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Contract schemas that emit the events we index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ContractKind {
    EditionsMetadataRenderer,
    HolographRegistry,
    HolographFactory,
    HolographOperator,
    HolographableContract,
    HolographDropERC721,
}

impl ContractKind {
    pub const ALL: [ContractKind; 6] = [
        ContractKind::EditionsMetadataRenderer,
        ContractKind::HolographRegistry,
        ContractKind::HolographFactory,
        ContractKind::HolographOperator,
        ContractKind::HolographableContract,
        ContractKind::HolographDropERC721,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContractKind::EditionsMetadataRenderer => "EditionsMetadataRenderer",
            ContractKind::HolographRegistry => "HolographRegistry",
            ContractKind::HolographFactory => "HolographFactory",
            ContractKind::HolographOperator => "HolographOperator",
            ContractKind::HolographableContract => "HolographableContract",
            ContractKind::HolographDropERC721 => "HolographDropERC721",
        }
    }

    /// Schemas served by contracts deployed through the factory.
    ///
    /// Addresses discovered at runtime are routed for every schema in this set.
    pub fn is_holographable(&self) -> bool {
        matches!(
            self,
            ContractKind::HolographableContract | ContractKind::HolographDropERC721
        )
    }
}

impl fmt::Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContractKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        ContractKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .with_context(|| format!("Unknown contract kind: {}", s))
    }
}

/// Every event kind the indexer materializes.
///
/// The discriminant doubles as the key tag of the kind's record collection,
/// so variants must never be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    EditionInitialized,
    HolographableContractEvent,
    BridgeableContractDeployed,
    AvailableOperatorJob,
    CrossChainMessageSent,
    FailedOperatorJob,
    FinishedOperatorJob,
    Transfer,
    SecondarySaleFees,
    MintFeePayout,
    Sale,
}

impl EventKind {
    pub const ALL: [EventKind; 11] = [
        EventKind::EditionInitialized,
        EventKind::HolographableContractEvent,
        EventKind::BridgeableContractDeployed,
        EventKind::AvailableOperatorJob,
        EventKind::CrossChainMessageSent,
        EventKind::FailedOperatorJob,
        EventKind::FinishedOperatorJob,
        EventKind::Transfer,
        EventKind::SecondarySaleFees,
        EventKind::MintFeePayout,
        EventKind::Sale,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::EditionInitialized => "EditionInitialized",
            EventKind::HolographableContractEvent => "HolographableContractEvent",
            EventKind::BridgeableContractDeployed => "BridgeableContractDeployed",
            EventKind::AvailableOperatorJob => "AvailableOperatorJob",
            EventKind::CrossChainMessageSent => "CrossChainMessageSent",
            EventKind::FailedOperatorJob => "FailedOperatorJob",
            EventKind::FinishedOperatorJob => "FinishedOperatorJob",
            EventKind::Transfer => "Transfer",
            EventKind::SecondarySaleFees => "SecondarySaleFees",
            EventKind::MintFeePayout => "MintFeePayout",
            EventKind::Sale => "Sale",
        }
    }

    /// The contract schema that declares this event.
    pub fn contract(&self) -> ContractKind {
        match self {
            EventKind::EditionInitialized => ContractKind::EditionsMetadataRenderer,
            EventKind::HolographableContractEvent => ContractKind::HolographRegistry,
            EventKind::BridgeableContractDeployed => ContractKind::HolographFactory,
            EventKind::AvailableOperatorJob
            | EventKind::CrossChainMessageSent
            | EventKind::FailedOperatorJob
            | EventKind::FinishedOperatorJob => ContractKind::HolographOperator,
            EventKind::Transfer | EventKind::SecondarySaleFees => {
                ContractKind::HolographableContract
            }
            EventKind::MintFeePayout | EventKind::Sale => ContractKind::HolographDropERC721,
        }
    }

    /// Single-byte tag used in record keys.
    pub fn tag(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .with_context(|| format!("Unknown event kind: {}", s))
    }
}

/// Decoded log entry with chain, block and transaction metadata.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawEventLog")]
pub struct EventLog {
    pub chain_id: u64,
    pub block_number: u64,
    /// Unix epoch seconds
    pub block_timestamp: u64,
    /// Address of the contract that emitted the log
    pub src_address: Address,
    /// Absent only for malformed deliveries; rejected before any write.
    pub transaction_hash: Option<B256>,
    pub log_index: u64,
    /// Externally owned account that originated the transaction, if known
    pub tx_origin: Option<Address>,
    pub tx_to: Option<Address>,
    pub params: EventParams,
}

impl EventLog {
    pub fn kind(&self) -> EventKind {
        self.params.kind()
    }

    /// Parse one NDJSON line.
    pub fn from_json(line: &str) -> Result<Self> {
        serde_json::from_str(line).context("Failed to decode event")
    }
}

/// Wire form of [`EventLog`]: params stay untyped until the event name is known.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEventLog {
    chain_id: u64,
    block_number: u64,
    block_timestamp: u64,
    src_address: Address,
    #[serde(default)]
    transaction_hash: Option<B256>,
    log_index: u64,
    #[serde(default)]
    tx_origin: Option<Address>,
    #[serde(default)]
    tx_to: Option<Address>,
    event: String,
    #[serde(default)]
    params: serde_json::Value,
}

impl TryFrom<RawEventLog> for EventLog {
    type Error = anyhow::Error;

    fn try_from(raw: RawEventLog) -> Result<Self> {
        let kind: EventKind = raw.event.parse()?;
        let params = EventParams::decode(kind, raw.params)
            .with_context(|| format!("Invalid params for {}", kind))?;
        Ok(EventLog {
            chain_id: raw.chain_id,
            block_number: raw.block_number,
            block_timestamp: raw.block_timestamp,
            src_address: raw.src_address,
            transaction_hash: raw.transaction_hash,
            log_index: raw.log_index,
            tx_origin: raw.tx_origin,
            tx_to: raw.tx_to,
            params,
        })
    }
}

/// Decoded parameters, one variant per event kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventParams {
    EditionInitialized(EditionInitialized),
    HolographableContractEvent(HolographableContractEvent),
    BridgeableContractDeployed(BridgeableContractDeployed),
    AvailableOperatorJob(AvailableOperatorJob),
    CrossChainMessageSent(CrossChainMessageSent),
    FailedOperatorJob(FailedOperatorJob),
    FinishedOperatorJob(FinishedOperatorJob),
    Transfer(Transfer),
    SecondarySaleFees(SecondarySaleFees),
    MintFeePayout(MintFeePayout),
    Sale(Sale),
}

impl EventParams {
    pub fn kind(&self) -> EventKind {
        match self {
            EventParams::EditionInitialized(_) => EventKind::EditionInitialized,
            EventParams::HolographableContractEvent(_) => EventKind::HolographableContractEvent,
            EventParams::BridgeableContractDeployed(_) => EventKind::BridgeableContractDeployed,
            EventParams::AvailableOperatorJob(_) => EventKind::AvailableOperatorJob,
            EventParams::CrossChainMessageSent(_) => EventKind::CrossChainMessageSent,
            EventParams::FailedOperatorJob(_) => EventKind::FailedOperatorJob,
            EventParams::FinishedOperatorJob(_) => EventKind::FinishedOperatorJob,
            EventParams::Transfer(_) => EventKind::Transfer,
            EventParams::SecondarySaleFees(_) => EventKind::SecondarySaleFees,
            EventParams::MintFeePayout(_) => EventKind::MintFeePayout,
            EventParams::Sale(_) => EventKind::Sale,
        }
    }

    /// Decode the JSON params object of an event of the given kind.
    pub fn decode(kind: EventKind, value: serde_json::Value) -> Result<Self> {
        let params = match kind {
            EventKind::EditionInitialized => {
                EventParams::EditionInitialized(serde_json::from_value(value)?)
            }
            EventKind::HolographableContractEvent => {
                EventParams::HolographableContractEvent(serde_json::from_value(value)?)
            }
            EventKind::BridgeableContractDeployed => {
                EventParams::BridgeableContractDeployed(serde_json::from_value(value)?)
            }
            EventKind::AvailableOperatorJob => {
                EventParams::AvailableOperatorJob(serde_json::from_value(value)?)
            }
            EventKind::CrossChainMessageSent => {
                EventParams::CrossChainMessageSent(serde_json::from_value(value)?)
            }
            EventKind::FailedOperatorJob => {
                EventParams::FailedOperatorJob(serde_json::from_value(value)?)
            }
            EventKind::FinishedOperatorJob => {
                EventParams::FinishedOperatorJob(serde_json::from_value(value)?)
            }
            EventKind::Transfer => EventParams::Transfer(serde_json::from_value(value)?),
            EventKind::SecondarySaleFees => {
                EventParams::SecondarySaleFees(serde_json::from_value(value)?)
            }
            EventKind::MintFeePayout => EventParams::MintFeePayout(serde_json::from_value(value)?),
            EventKind::Sale => EventParams::Sale(serde_json::from_value(value)?),
        };
        Ok(params)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditionInitialized {
    pub target: Address,
    pub description: String,
    #[serde(rename = "imageURI")]
    pub image_uri: String,
    #[serde(rename = "animationURI")]
    pub animation_uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HolographableContractEvent {
    #[serde(alias = "_holographableContract")]
    pub holographable_contract: Address,
    #[serde(alias = "_payload", with = "hex_bytes")]
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeableContractDeployed {
    pub contract_address: Address,
    pub hash: B256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableOperatorJob {
    pub job_hash: B256,
    #[serde(with = "hex_bytes")]
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossChainMessageSent {
    pub message_hash: B256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedOperatorJob {
    pub job_hash: B256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishedOperatorJob {
    pub job_hash: B256,
    pub operator: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    #[serde(alias = "_from")]
    pub from: Address,
    #[serde(alias = "_to")]
    pub to: Address,
    #[serde(alias = "_tokenId", alias = "_value", deserialize_with = "deserialize_u256")]
    pub token_id: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecondarySaleFees {
    #[serde(deserialize_with = "deserialize_u256")]
    pub token_id: U256,
    pub recipients: Vec<Address>,
    #[serde(deserialize_with = "deserialize_u256_vec")]
    pub bps: Vec<U256>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintFeePayout {
    #[serde(deserialize_with = "deserialize_u256")]
    pub mint_fee_amount: U256,
    pub mint_fee_recipient: Address,
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub to: Address,
    #[serde(deserialize_with = "deserialize_u256")]
    pub quantity: U256,
    #[serde(deserialize_with = "deserialize_u256")]
    pub price_per_token: U256,
    #[serde(deserialize_with = "deserialize_u256")]
    pub first_purchased_token_id: U256,
}

// Hex and integer deserialization helpers

/// Pad an odd-length hex string with a leading zero.
pub(crate) fn pad_hex_string(s: &str) -> String {
    if s.len() % 2 == 1 {
        format!("0{}", s)
    } else {
        s.to_string()
    }
}

/// Parse a uint256 given as decimal or 0x-prefixed hex.
pub fn parse_u256(s: &str) -> Result<U256> {
    let s = s.trim();
    match s.strip_prefix("0x") {
        Some("") => Ok(U256::ZERO),
        Some(hex) => U256::from_str_radix(hex, 16)
            .map_err(|e| anyhow::anyhow!("Invalid hex uint256 {}: {}", s, e)),
        None => U256::from_str_radix(s, 10)
            .map_err(|e| anyhow::anyhow!("Invalid decimal uint256 {}: {}", s, e)),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonUint {
    Number(u64),
    Text(String),
}

impl JsonUint {
    fn into_u256<E: de::Error>(self) -> Result<U256, E> {
        match self {
            JsonUint::Number(n) => Ok(U256::from(n)),
            JsonUint::Text(s) => parse_u256(&s).map_err(E::custom),
        }
    }
}

/// Deserialize a uint256 from a JSON number, decimal or hex string.
///
/// Binary formats fall through to the native `U256` encoding.
fn deserialize_u256<'de, D>(deserializer: D) -> Result<U256, D::Error>
where
    D: Deserializer<'de>,
{
    if deserializer.is_human_readable() {
        JsonUint::deserialize(deserializer)?.into_u256()
    } else {
        U256::deserialize(deserializer)
    }
}

/// Deserialize a list of uint256 values (see [`deserialize_u256`]).
fn deserialize_u256_vec<'de, D>(deserializer: D) -> Result<Vec<U256>, D::Error>
where
    D: Deserializer<'de>,
{
    if deserializer.is_human_readable() {
        Vec::<JsonUint>::deserialize(deserializer)?
            .into_iter()
            .map(JsonUint::into_u256)
            .collect()
    } else {
        Vec::<U256>::deserialize(deserializer)
    }
}

/// Byte strings: `0x` hex in JSON, raw bytes in binary formats.
mod hex_bytes {
    use super::pad_hex_string;
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
        } else {
            serializer.serialize_bytes(bytes)
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            let s = s.strip_prefix("0x").unwrap_or(&s);
            hex::decode(pad_hex_string(s)).map_err(de::Error::custom)
        } else {
            deserializer.deserialize_byte_buf(BytesVisitor)
        }
    }

    struct BytesVisitor;

    impl<'de> de::Visitor<'de> for BytesVisitor {
        type Value = Vec<u8>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a byte buffer")
        }

        fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Vec<u8>, E> {
            Ok(v.to_vec())
        }

        fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Vec<u8>, E> {
            Ok(v)
        }
    }
}

/// Render an address the way entity ids are keyed: lowercase, 0x-prefixed.
pub fn address_id(addr: Address) -> String {
    format!("0x{:x}", addr)
}

/// Render a hash the way entity ids are keyed: lowercase, 0x-prefixed.
pub fn hash_id(hash: B256) -> String {
    format!("0x{:x}", hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, b256};

    #[test]
    fn test_decode_bridgeable_contract_deployed() {
        let line = r#"{
            "chainId": 1,
            "blockNumber": 100,
            "blockTimestamp": 1700000000,
            "srcAddress": "0x6d2f6b1c9e0e3a5bbb1a7a1d5d7bd6e12f8b14e2",
            "transactionHash": "0x00000000000000000000000000000000000000000000000000000000000000aa",
            "logIndex": 3,
            "txOrigin": "0x70997970c51812dc3a010c7d01b50e0d17dc79c8",
            "event": "BridgeableContractDeployed",
            "params": {
                "contractAddress": "0x00000000000000000000000000000000000000a1",
                "hash": "0x0000000000000000000000000000000000000000000000000000000000000001"
            }
        }"#;
        let event = EventLog::from_json(line).unwrap();
        assert_eq!(event.kind(), EventKind::BridgeableContractDeployed);
        assert_eq!(event.chain_id, 1);
        assert_eq!(event.log_index, 3);
        assert_eq!(event.tx_to, None);
        assert_eq!(
            event.transaction_hash,
            Some(b256!("00000000000000000000000000000000000000000000000000000000000000aa"))
        );
        match event.params {
            EventParams::BridgeableContractDeployed(p) => {
                assert_eq!(p.contract_address, address!("00000000000000000000000000000000000000a1"));
            }
            other => panic!("unexpected params: {:?}", other),
        }
    }

    #[test]
    fn test_decode_missing_transaction_hash_is_kept_absent() {
        let line = r#"{"chainId":1,"blockNumber":1,"blockTimestamp":1,
            "srcAddress":"0x00000000000000000000000000000000000000a1","logIndex":0,
            "event":"CrossChainMessageSent",
            "params":{"messageHash":"0x0000000000000000000000000000000000000000000000000000000000000002"}}"#;
        let event = EventLog::from_json(line).unwrap();
        assert_eq!(event.transaction_hash, None);
    }

    #[test]
    fn test_decode_uint_forms() {
        let value = serde_json::json!({
            "tokenId": "0x05",
            "recipients": ["0x00000000000000000000000000000000000000b1"],
            "bps": [250, "1000"]
        });
        let params = EventParams::decode(EventKind::SecondarySaleFees, value).unwrap();
        match params {
            EventParams::SecondarySaleFees(p) => {
                assert_eq!(p.token_id, U256::from(5u64));
                assert_eq!(p.bps, vec![U256::from(250u64), U256::from(1000u64)]);
            }
            other => panic!("unexpected params: {:?}", other),
        }
    }

    #[test]
    fn test_decode_legacy_underscore_names() {
        let value = serde_json::json!({
            "_from": "0x0000000000000000000000000000000000000000",
            "_to": "0x00000000000000000000000000000000000000b2",
            "_tokenId": "42"
        });
        let params = EventParams::decode(EventKind::Transfer, value).unwrap();
        assert_eq!(
            params,
            EventParams::Transfer(Transfer {
                from: Address::ZERO,
                to: address!("00000000000000000000000000000000000000b2"),
                token_id: U256::from(42u64),
            })
        );
    }

    #[test]
    fn test_unknown_event_rejected() {
        let line = r#"{"chainId":1,"blockNumber":1,"blockTimestamp":1,
            "srcAddress":"0x00000000000000000000000000000000000000a1","logIndex":0,
            "event":"Approval","params":{}}"#;
        assert!(EventLog::from_json(line).is_err());
    }

    #[test]
    fn test_params_survive_postcard() {
        let params = EventParams::AvailableOperatorJob(AvailableOperatorJob {
            job_hash: b256!("0000000000000000000000000000000000000000000000000000000000000009"),
            payload: vec![0xde, 0xad, 0xbe, 0xef],
        });
        let bytes = postcard::to_allocvec(&params).unwrap();
        let decoded: EventParams = postcard::from_bytes(&bytes).unwrap();
        assert_eq!(params, decoded);
    }

    #[test]
    fn test_kind_contract_mapping() {
        assert_eq!(EventKind::Sale.contract(), ContractKind::HolographDropERC721);
        assert_eq!(EventKind::Transfer.contract(), ContractKind::HolographableContract);
        assert!(EventKind::MintFeePayout.contract().is_holographable());
        assert!(!EventKind::BridgeableContractDeployed.contract().is_holographable());
        assert_eq!("Sale".parse::<EventKind>().unwrap(), EventKind::Sale);
    }

    #[test]
    fn test_parse_u256() {
        assert_eq!(parse_u256("0x").unwrap(), U256::ZERO);
        assert_eq!(parse_u256("0xff").unwrap(), U256::from(255u64));
        assert_eq!(parse_u256("255").unwrap(), U256::from(255u64));
        assert!(parse_u256("nope").is_err());
    }
}
