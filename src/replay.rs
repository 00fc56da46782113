//! Replay driver
//!
//! Reads decoded events from NDJSON, orders them and feeds them to the
//! indexer one at a time.

use crate::indexer::{Indexer, Outcome};
use crate::store::EntityStore;
use crate::types::EventLog;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use tracing::{error, info};

/// Per-outcome event counts for one replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplayStats {
    pub applied: u64,
    pub duplicate: u64,
    pub ignored: u64,
    /// Events rejected as malformed
    pub rejected: u64,
}

impl ReplayStats {
    pub fn total(&self) -> u64 {
        self.applied + self.duplicate + self.ignored + self.rejected
    }

    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Applied => self.applied += 1,
            Outcome::Duplicate => self.duplicate += 1,
            Outcome::Ignored => self.ignored += 1,
        }
    }
}

/// Events decoded from an NDJSON stream.
#[derive(Debug, Default)]
pub struct LoadedEvents {
    pub events: Vec<EventLog>,
    /// Lines that failed to decode
    pub rejected: u64,
}

/// Load events from an NDJSON file, or from stdin when `path` is `-`.
pub fn load_events(path: &Path) -> Result<LoadedEvents> {
    if path.as_os_str() == "-" {
        return read_events(io::stdin().lock()).context("Failed to read events from stdin");
    }
    let file =
        File::open(path).with_context(|| format!("Failed to open events file: {:?}", path))?;
    read_events(BufReader::new(file))
        .with_context(|| format!("Failed to read events file: {:?}", path))
}

/// Decode one event per non-empty line.
///
/// A line that does not decode is logged and counted, and reading goes on.
/// Only I/O failures are returned as errors.
pub fn read_events<R: BufRead>(reader: R) -> Result<LoadedEvents> {
    let mut loaded = LoadedEvents::default();
    for (line_num, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read line {}", line_num + 1))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match EventLog::from_json(line) {
            Ok(event) => loaded.events.push(event),
            Err(e) => {
                error!("Rejected malformed event on line {}: {:#}", line_num + 1, e);
                loaded.rejected += 1;
            }
        }
    }
    Ok(loaded)
}

/// Order events by (block timestamp, chain id, block number, log index).
///
/// The sort is stable, so events with equal positions keep file order.
pub fn sort_for_replay(events: &mut [EventLog]) {
    events.sort_by_key(|e| (e.block_timestamp, e.chain_id, e.block_number, e.log_index));
}

/// Feed every event to the indexer.
///
/// Malformed events are logged and counted; any other failure stops the replay.
pub fn run<S: EntityStore>(indexer: &mut Indexer<S>, events: &[EventLog]) -> Result<ReplayStats> {
    let mut stats = ReplayStats::default();
    info!("Replaying {} events", events.len());

    for (i, event) in events.iter().enumerate() {
        match indexer.process(event) {
            Ok(outcome) => stats.record(outcome),
            Err(e) if e.is_event_error() => {
                error!(
                    "Rejected event {} ({} on chain {} block {}): {}",
                    i, event.kind(), event.chain_id, event.block_number, e
                );
                stats.rejected += 1;
            }
            Err(e) => {
                return Err(anyhow::Error::from(e)).with_context(|| {
                    format!(
                        "Failed to process event {} ({} on chain {} block {} log {})",
                        i,
                        event.kind(),
                        event.chain_id,
                        event.block_number,
                        event.log_index
                    )
                });
            }
        }

        if (i + 1) % 1000 == 0 {
            info!("Processed {}/{} events", i + 1, events.len());
        }
    }

    info!(
        "Replay complete: {} applied, {} duplicate, {} ignored, {} rejected",
        stats.applied, stats.duplicate, stats.ignored, stats.rejected
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_contracts;
    use crate::keys::{Collection, EntityKey};
    use crate::records::{Entity, GLOBAL_EVENTS_SUMMARY_KEY};
    use crate::router::EventRouter;
    use crate::store::MemoryEntityStore;
    use crate::types::EventKind;
    use std::io::Cursor;

    const FACTORY: &str = "0x00000000000000000000000000000000000000f2";
    const DEPLOYED: &str = "0x00000000000000000000000000000000000000a1";
    const ZERO_HASH: &str = "0x0000000000000000000000000000000000000000000000000000000000000000";

    fn deployment_line(chain_id: u64, timestamp: u64, hash_byte: u8) -> String {
        format!(
            r#"{{"chainId":{chain_id},"blockNumber":10,"blockTimestamp":{timestamp},"srcAddress":"{FACTORY}","transactionHash":"0x{hash_byte:064x}","logIndex":0,"txOrigin":"0x70997970c51812dc3a010c7d01b50e0d17dc79c8","event":"BridgeableContractDeployed","params":{{"contractAddress":"{DEPLOYED}","hash":"{ZERO_HASH}"}}}}"#
        )
    }

    fn sale_fees_line(chain_id: u64, timestamp: u64, hash_byte: u8) -> String {
        format!(
            r#"{{"chainId":{chain_id},"blockNumber":20,"blockTimestamp":{timestamp},"srcAddress":"{DEPLOYED}","transactionHash":"0x{hash_byte:064x}","logIndex":0,"event":"SecondarySaleFees","params":{{"tokenId":"5","recipients":[],"bps":[]}}}}"#
        )
    }

    fn create_test_indexer() -> Indexer<MemoryEntityStore> {
        let contracts = parse_contracts(&format!("HolographFactory {}", FACTORY)).unwrap();
        Indexer::new(MemoryEntityStore::new(), EventRouter::from_config(&contracts))
    }

    fn summary_count(indexer: &Indexer<MemoryEntityStore>, kind: EventKind) -> u64 {
        match indexer
            .store()
            .get(&EntityKey::new(Collection::EventsSummary, GLOBAL_EVENTS_SUMMARY_KEY))
            .unwrap()
        {
            Some(Entity::EventsSummary(s)) => s.count(kind),
            _ => 0,
        }
    }

    #[test]
    fn test_read_events_skips_blank_lines() {
        let input = format!("{}\n\n{}\n", deployment_line(1, 100, 1), sale_fees_line(2, 200, 2));
        let loaded = read_events(Cursor::new(input)).unwrap();
        assert_eq!(loaded.events.len(), 2);
        assert_eq!(loaded.rejected, 0);
        assert_eq!(loaded.events[1].kind(), EventKind::SecondarySaleFees);
    }

    #[test]
    fn test_bad_lines_do_not_stop_the_replay() {
        let no_log_index = deployment_line(1, 150, 3).replace(r#""logIndex":0,"#, "");
        assert!(!no_log_index.contains("logIndex"));
        let input = format!(
            "{}\n{}\n{{\"not\":\"an event\"}}\n{}\n",
            deployment_line(1, 100, 1),
            no_log_index,
            sale_fees_line(2, 200, 2)
        );
        let loaded = read_events(Cursor::new(input)).unwrap();
        assert_eq!(loaded.rejected, 2);
        assert_eq!(loaded.events.len(), 2);

        let mut indexer = create_test_indexer();
        let stats = run(&mut indexer, &loaded.events).unwrap();
        assert_eq!(stats.applied, 2);
        assert_eq!(summary_count(&indexer, EventKind::BridgeableContractDeployed), 1);
        assert_eq!(summary_count(&indexer, EventKind::SecondarySaleFees), 1);
    }

    #[test]
    fn test_sort_puts_discovery_first() {
        let input = format!("{}\n{}\n", sale_fees_line(2, 200, 2), deployment_line(1, 100, 1));
        let mut events = read_events(Cursor::new(input)).unwrap().events;

        // In file order the sale fees arrive before the contract is known
        let mut unsorted = create_test_indexer();
        let stats = run(&mut unsorted, &events).unwrap();
        assert_eq!(stats.ignored, 1);

        sort_for_replay(&mut events);
        assert_eq!(events[0].kind(), EventKind::BridgeableContractDeployed);
        let mut sorted = create_test_indexer();
        let stats = run(&mut sorted, &events).unwrap();
        assert_eq!(stats.applied, 2);
        assert_eq!(summary_count(&sorted, EventKind::SecondarySaleFees), 1);
    }

    #[test]
    fn test_run_counts_duplicates_and_rejections() {
        let mut events = read_events(Cursor::new(format!(
            "{}\n{}\n",
            deployment_line(1, 100, 1),
            deployment_line(1, 100, 1)
        )))
        .unwrap()
        .events;
        let mut malformed = events[0].clone();
        malformed.transaction_hash = None;
        events.push(malformed);

        let mut indexer = create_test_indexer();
        let stats = run(&mut indexer, &events).unwrap();
        assert_eq!(
            stats,
            ReplayStats {
                applied: 1,
                duplicate: 1,
                ignored: 0,
                rejected: 1,
            }
        );
        assert_eq!(stats.total(), 3);
        assert_eq!(summary_count(&indexer, EventKind::BridgeableContractDeployed), 1);
    }
}
