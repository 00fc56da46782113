//! Failure modes of event processing

use crate::keys::EntityKey;
use crate::types::EventKind;

/// Errors that reject a single event.
///
/// None of these are retried here: the caller decides whether to redeliver.
/// When any of them is returned, nothing from the event has been committed.
#[derive(Debug, thiserror::Error)]
pub enum IndexerError {
    /// A required envelope field was missing.
    #[error("malformed {kind} event: missing {field}")]
    MalformedEvent {
        /// Kind of the rejected event.
        kind: EventKind,
        /// Name of the missing field.
        field: &'static str,
    },

    /// The handler read a key its loader did not declare.
    #[error("handler read undeclared key {key}")]
    UndeclaredRead {
        /// The key that was read.
        key: EntityKey,
    },

    /// A stored entity had a different shape than its collection implies.
    #[error("entity at {key} has unexpected type")]
    EntityMismatch {
        /// The key that was read.
        key: EntityKey,
    },

    /// A summary counter would exceed `u64::MAX`.
    #[error("{kind} counter overflow")]
    CounterOverflow {
        /// Counter that overflowed.
        kind: EventKind,
    },

    /// The entity store failed.
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl IndexerError {
    /// Whether the event itself was at fault (as opposed to the store).
    pub fn is_event_error(&self) -> bool {
        matches!(self, IndexerError::MalformedEvent { .. })
    }
}
