//! Holograph indexer - event-driven entity materialization
//!
//! This library folds a stream of decoded Holograph contract events into
//! queryable entities (transactions, tracked contracts, users, NFTs,
//! per-event records and a global summary) held in a persistent store.

pub mod keys;
pub mod records;
pub mod store;
pub mod cli;
pub mod types;
pub mod error;

// Event processing
pub mod context;
pub mod reconcile;
pub mod handlers;
pub mod discovery;
pub mod router;
pub mod indexer;

// Replay driver
pub mod config;
pub mod replay;

// Re-export the main types for convenience
pub use error::IndexerError;
pub use indexer::{Indexer, Outcome};
pub use records::{
    ContractType, Entity, EventRecord, EventsSummary, HolographableContractRecord, NftRecord,
    TransactionRecord, UserRecord, WatchMeta,
};
pub use store::{EntityStore, MemoryEntityStore, RocksEntityStore};
