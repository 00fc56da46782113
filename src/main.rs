//! holoctl - Holograph entity store CLI tool
//!
//! A developer-friendly command-line interface for inspecting the entities
//! the indexer materialized into its RocksDB store.

use holograph_indexer::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
