//! Per-event processing pipeline
//!
//! Ties the pieces together for one event: routing, discovery, validation,
//! loader, prefetch, handler and atomic commit. Every write is computed from
//! state read fresh from the store, so the indexer carries nothing between
//! events apart from the router's watch registry.

use crate::context::HandlerContext;
use crate::discovery::{apply_registration, registration_intent};
use crate::error::IndexerError;
use crate::handlers::{handle, loader};
use crate::router::EventRouter;
use crate::store::EntityStore;
use crate::types::EventLog;
use tracing::{debug, warn};

/// Result of processing one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// All writes for the event were committed.
    Applied,
    /// The event had already been committed; nothing was written.
    Duplicate,
    /// The router does not watch the event's source.
    Ignored,
}

/// Folds decoded events into the entity store.
pub struct Indexer<S: EntityStore> {
    store: S,
    router: EventRouter,
}

impl<S: EntityStore> Indexer<S> {
    pub fn new(store: S, router: EventRouter) -> Self {
        Self { store, router }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn router(&self) -> &EventRouter {
        &self.router
    }

    /// Reload persisted watches into the router.
    pub fn restore_watches(&mut self) -> anyhow::Result<usize> {
        self.router.restore(&self.store)
    }

    /// Process one event.
    ///
    /// On error no entity from the event has been committed.
    /// A discovered contract stays watched even if a later step fails.
    pub fn process(&mut self, event: &EventLog) -> Result<Outcome, IndexerError> {
        let kind = event.kind();
        if !self.router.accepts(event) {
            warn!(
                "Ignoring {} from unwatched {:?} on chain {}",
                kind, event.src_address, event.chain_id
            );
            return Ok(Outcome::Ignored);
        }

        // Registration stands even if validation below rejects the event
        if let Some(intent) = registration_intent(event) {
            apply_registration(&self.store, &mut self.router, intent)?;
        }

        let hash = event.transaction_hash.ok_or(IndexerError::MalformedEvent {
            kind,
            field: "transactionHash",
        })?;

        let plan = loader(event, hash);
        let snapshot = self.store.load(&plan)?;
        let mut ctx = HandlerContext::new(snapshot);

        let outcome = handle(event, hash, &mut ctx)?;
        let writes = ctx.into_write_set();
        if !writes.is_empty() {
            self.store.commit(&writes)?;
        }

        debug!(
            "{} {:?} log {} on chain {}: {:?} ({} writes)",
            kind,
            hash,
            event.log_index,
            event.chain_id,
            outcome,
            writes.len()
        );
        Ok(outcome)
    }
}
