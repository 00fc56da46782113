//! CLI implementation for holoctl
//!
//! Provides a developer-friendly command-line interface for inspecting
//! the materialized entities. All commands output pretty JSON.

use crate::config::parse_address;
use crate::keys::{Collection, EntityKey};
use crate::records::{event_record_id, nft_id, GLOBAL_EVENTS_SUMMARY_KEY};
use crate::store::{EntityStore, RocksEntityStore};
use crate::types::{address_id, hash_id, pad_hex_string, parse_u256, EventKind};
use alloy_primitives::B256;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::PathBuf;

/// Holograph entity store CLI tool
#[derive(Parser)]
#[command(name = "holoctl")]
#[command(about = "Inspect Holograph entities materialized by the indexer")]
pub struct Cli {
    /// Path to the RocksDB database directory
    #[arg(short, long, default_value = "./holograph_db")]
    db_path: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Get a transaction
    GetTransaction {
        /// Transaction hash (64 hex chars, with or without 0x prefix)
        hash: String,
    },
    /// Get a tracked Holographable contract
    GetContract {
        /// Contract address (hex, with or without 0x prefix)
        address: String,
    },
    /// Get a user
    GetUser {
        /// Wallet address (hex, with or without 0x prefix)
        address: String,
    },
    /// Get an NFT and its current owner
    GetNft {
        /// Contract address (hex, with or without 0x prefix)
        contract: String,
        /// Token id (decimal or 0x hex)
        token_id: String,
    },
    /// Get the record of one processed event
    GetEvent {
        /// Event name (e.g. Transfer, SecondarySaleFees)
        kind: String,
        /// Transaction hash (64 hex chars, with or without 0x prefix)
        hash: String,
        /// Log index within the transaction
        log_index: u64,
    },
    /// Get the global events summary
    GetSummary,
    /// List dynamically watched contracts
    ListWatched,
    /// List entity ids stored in one collection
    ListEntities {
        /// Collection (Transaction, HolographableContract, User, NFT, or an event name)
        collection: String,
    },
    /// Delete one entity
    DeleteEntity {
        /// Collection (Transaction, HolographableContract, User, NFT, or an event name)
        collection: String,
        /// Entity id as stored (lowercase 0x hex)
        id: String,
    },
}

/// Parse a hex string into a 32-byte hash (B256).
fn parse_hash(s: &str) -> Result<B256> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    let s = pad_hex_string(s);
    let bytes = hex::decode(&s).with_context(|| format!("Invalid hex hash: {}", s))?;
    if bytes.len() != 32 {
        anyhow::bail!("Hash must be 32 bytes (64 hex chars), got {} bytes", bytes.len());
    }
    Ok(B256::from_slice(&bytes))
}

/// Look up one entity and render it, or `null` when absent.
fn get_entity(store: &dyn EntityStore, key: EntityKey) -> Result<Value> {
    let entity = store
        .get(&key)
        .with_context(|| format!("Failed to get {}", key))?;
    let value = match entity {
        Some(entity) => entity.to_json().context("Failed to render entity")?,
        None => Value::Null,
    };
    Ok(json!({
        "collection": key.collection.to_string(),
        "id": key.id,
        "entity": value,
    }))
}

/// Execute one command against a store.
pub fn execute(store: &dyn EntityStore, command: Commands) -> Result<Value> {
    let result = match command {
        Commands::GetTransaction { hash } => {
            let hash = parse_hash(&hash)?;
            get_entity(store, EntityKey::new(Collection::Transaction, hash_id(hash)))?
        }
        Commands::GetContract { address } => {
            let addr = parse_address(&address)?;
            get_entity(
                store,
                EntityKey::new(Collection::HolographableContract, address_id(addr)),
            )?
        }
        Commands::GetUser { address } => {
            let addr = parse_address(&address)?;
            get_entity(store, EntityKey::new(Collection::User, address_id(addr)))?
        }
        Commands::GetNft { contract, token_id } => {
            let addr = parse_address(&contract)?;
            let token_id = parse_u256(&token_id)?;
            get_entity(store, EntityKey::new(Collection::Nft, nft_id(addr, token_id)))?
        }
        Commands::GetEvent {
            kind,
            hash,
            log_index,
        } => {
            let kind: EventKind = kind.parse()?;
            let hash = parse_hash(&hash)?;
            get_entity(
                store,
                EntityKey::new(Collection::Event(kind), event_record_id(hash, log_index)),
            )?
        }
        Commands::GetSummary => {
            let key = EntityKey::new(Collection::EventsSummary, GLOBAL_EVENTS_SUMMARY_KEY);
            let summary = store.get(&key).context("Failed to get summary")?;
            match summary {
                Some(entity) => entity.to_json().context("Failed to render summary")?,
                None => json!({ "id": GLOBAL_EVENTS_SUMMARY_KEY, "summary": null }),
            }
        }
        Commands::ListWatched => {
            let watched = store
                .watched_contracts()
                .context("Failed to list watched contracts")?;
            let contracts: Vec<Value> = watched
                .iter()
                .map(|(addr, meta)| {
                    json!({
                        "address": address_id(*addr),
                        "chain_id": meta.chain_id,
                        "start_block": meta.start_block,
                    })
                })
                .collect();
            json!({ "count": contracts.len(), "contracts": contracts })
        }
        Commands::ListEntities { collection } => {
            let collection: Collection = collection.parse()?;
            let keys = store
                .keys(collection)
                .with_context(|| format!("Failed to list {}", collection))?;
            let ids: Vec<String> = keys.into_iter().map(|key| key.id).collect();
            json!({
                "collection": collection.to_string(),
                "count": ids.len(),
                "ids": ids,
            })
        }
        Commands::DeleteEntity { collection, id } => {
            let collection: Collection = collection.parse()?;
            if collection == Collection::EventsSummary {
                anyhow::bail!("The events summary cannot be deleted");
            }
            let key = EntityKey::new(collection, id.to_lowercase());
            store
                .delete(&key)
                .with_context(|| format!("Failed to delete {}", key))?;
            json!({
                "status": "ok",
                "collection": key.collection.to_string(),
                "id": key.id,
            })
        }
    };
    Ok(result)
}

/// Run the CLI command and print JSON output.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let store = RocksEntityStore::open(&cli.db_path)
        .with_context(|| format!("Failed to open database at {:?}", cli.db_path))?;

    let result = execute(&store, cli.command)?;

    // Pretty print JSON
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
