//! Error types for registration operations.

use signup_ledger_core::catalog::Category;
use signup_ledger_core::ledger::LedgerError;
use signup_ledger_core::registration::{EventId, Priority, UserId};
use thiserror::Error;

/// Errors surfaced by [`RegistrationService`](crate::RegistrationService).
///
/// Every variant except [`Store`](Self::Store) is a final answer about the
/// request and guarantees nothing was appended. `Store` means the ledger
/// could not be read or written; the request can be retried as a whole.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// A required field was missing or malformed.
    #[error("{0}")]
    Validation(String),

    /// The user already holds this priority on another event of the category.
    #[error("Priority {priority} is already used for another {category} event ({conflicting_event})")]
    DuplicatePriority {
        /// Requested priority
        priority: Priority,
        /// Category shared by both events
        category: Category,
        /// Event already holding the priority
        conflicting_event: EventId,
    },

    /// Withdrawal for a user with no active registration on the event.
    #[error("User {user_id} is not registered for event {event_id}")]
    NotRegistered {
        /// Event the withdrawal targeted
        event_id: EventId,
        /// User who tried to withdraw
        user_id: UserId,
    },

    /// The catalog does not know the event.
    #[error("Event {0} not found")]
    UnknownEvent(EventId),

    /// The ledger failed; nothing was appended by this operation.
    #[error("Ledger failure: {0}")]
    Store(#[from] LedgerError),
}

impl RegistrationError {
    /// Whether retrying the same request may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(_))
    }

    /// Whether this is a lost optimistic-concurrency race.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_conflict())
    }

    /// Short label for logs and metrics.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::DuplicatePriority { .. } => "duplicate_priority",
            Self::NotRegistered { .. } => "not_registered",
            Self::UnknownEvent(_) => "unknown_event",
            Self::Store(_) => "store",
        }
    }
}

/// Result type for registration operations
pub type Result<T> = std::result::Result<T, RegistrationError>;
