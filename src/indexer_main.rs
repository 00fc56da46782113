//! Holograph indexer binary
//!
//! Replays decoded Holograph events from NDJSON into the entity store,
//! discovering new Holographable contracts along the way.

use anyhow::{Context, Result};
use clap::Parser;
use holograph_indexer::config::load_contracts;
use holograph_indexer::indexer::Indexer;
use holograph_indexer::replay::{self, ReplayStats};
use holograph_indexer::router::EventRouter;
use holograph_indexer::store::{EntityStore, MemoryEntityStore, RocksEntityStore};
use holograph_indexer::types::EventLog;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Holograph event indexer
#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Materialize Holograph entities from a stream of decoded events")]
struct Args {
    /// NDJSON file with one decoded event per line ("-" for stdin)
    events: PathBuf,

    /// Path to contracts file (one "<ContractName> <address>" per line)
    #[arg(short, long, default_value = "contracts.txt")]
    contracts: PathBuf,

    /// Path to RocksDB database directory
    #[arg(short, long, default_value = "./holograph_db")]
    db_path: PathBuf,

    /// Process events in file order instead of sorting by block position
    #[arg(long)]
    preserve_order: bool,

    /// Use an in-memory store and discard the results
    #[arg(long)]
    dry_run: bool,
}

fn replay_into<S: EntityStore>(
    store: S,
    router: EventRouter,
    events: &[EventLog],
) -> Result<ReplayStats> {
    let mut indexer = Indexer::new(store, router);
    indexer
        .restore_watches()
        .context("Failed to restore watched contracts")?;
    replay::run(&mut indexer, events)
}

fn main() -> Result<()> {
    // Initialize logging on stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    info!("Starting Holograph indexer");
    info!("Events: {:?}", args.events);
    info!("Contracts: {:?}", args.contracts);
    info!("Database: {:?}", args.db_path);

    let contracts = load_contracts(&args.contracts).context("Failed to load contracts")?;
    info!("Loaded {} configured contracts", contracts.len());
    let router = EventRouter::from_config(&contracts);

    let mut loaded = replay::load_events(&args.events).context("Failed to load events")?;
    if !args.preserve_order {
        replay::sort_for_replay(&mut loaded.events);
    }

    let mut stats = if args.dry_run {
        info!("Dry run: using in-memory store");
        replay_into(MemoryEntityStore::new(), router, &loaded.events)?
    } else {
        let store = RocksEntityStore::open(&args.db_path)
            .with_context(|| format!("Failed to open database at {:?}", args.db_path))?;
        replay_into(store, router, &loaded.events)?
    };
    // Lines that never decoded count as rejected events too
    stats.rejected += loaded.rejected;

    println!("{}", serde_json::to_string_pretty(&stats)?);
    info!("Indexer stopped");
    Ok(())
}
