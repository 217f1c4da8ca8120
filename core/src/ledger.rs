//! Ledger store trait and related types.
//!
//! The ledger is the only source of truth for registrations: an append-only
//! collection of [`RegistrationRecord`]s with two access paths, by event and
//! by user. Nothing is ever updated in place or deleted.
//!
//! # Implementations
//!
//! - `PostgresLedgerStore` (in `signup-ledger-postgres`): production storage
//! - `InMemoryLedgerStore` (in `signup-ledger-testing`): fast, deterministic tests
//!
//! # Example
//!
//! ```no_run
//! use signup_ledger_core::ledger::{LedgerError, LedgerStore};
//! use signup_ledger_core::projection::Roster;
//! use signup_ledger_core::registration::{EventId, NewRegistration};
//!
//! async fn example<L: LedgerStore>(ledger: &L, draft: NewRegistration) -> Result<(), LedgerError> {
//!     let event_id = EventId::new("73");
//!
//!     // Snapshot the roster, then append only if nobody wrote in between
//!     let roster = Roster::from_records(&ledger.query_by_event(&event_id).await?);
//!     ledger.append_if(draft, roster.head()).await?;
//!
//!     Ok(())
//! }
//! ```

use crate::registration::{EventId, NewRegistration, RegistrationRecord, Sequence, UserId};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Boxed future returned by [`LedgerStore`] methods.
pub type LedgerFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, LedgerError>> + Send + 'a>>;

/// Errors that can occur during ledger operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Conditional append rejected: the event's ledger head moved.
    ///
    /// Another writer appended a record for this event after the caller took
    /// its snapshot. Nothing was appended.
    #[error("Concurrency conflict on event {event_id}: expected head {expected:?}, found {actual:?}")]
    ConcurrencyConflict {
        /// Event whose records changed.
        event_id: EventId,
        /// Head the caller observed.
        expected: Option<Sequence>,
        /// Head currently stored.
        actual: Option<Sequence>,
    },

    /// Database connection or query error.
    #[error("Database error: {0}")]
    Database(String),

    /// A stored record could not be decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The store is not reachable.
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
}

impl LedgerError {
    /// Whether the error is an optimistic-concurrency conflict.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. })
    }
}

/// Append-only store of registration records.
///
/// # Guarantees
///
/// - An append is durable before the returned future resolves.
/// - Sequences are strictly increasing across the whole ledger.
/// - Queries return records in ascending sequence order.
/// - Appends for different events do not block each other.
///
/// # Dyn Compatibility
///
/// Methods return boxed futures instead of using `async fn` so the store can
/// be shared as `Arc<dyn LedgerStore>`.
pub trait LedgerStore: Send + Sync {
    /// Append a record unconditionally.
    ///
    /// # Errors
    ///
    /// - `Database` / `Unavailable`: the record was not persisted
    fn append(&self, record: NewRegistration) -> LedgerFuture<'_, RegistrationRecord>;

    /// Append a record only if the event's ledger head is still `expected_head`.
    ///
    /// The head of an event is the highest sequence among its records, or
    /// `None` when the event has no records. This is the optimistic
    /// concurrency token that serializes read-decide-append sequences across
    /// processes.
    ///
    /// # Errors
    ///
    /// - `ConcurrencyConflict`: the head moved; nothing was appended
    /// - `Database` / `Unavailable`: the record was not persisted
    fn append_if(
        &self,
        record: NewRegistration,
        expected_head: Option<Sequence>,
    ) -> LedgerFuture<'_, RegistrationRecord>;

    /// All records for an event, oldest first.
    ///
    /// An event without records yields an empty vector, not an error.
    ///
    /// # Errors
    ///
    /// - `Database` / `Unavailable`: query failed
    /// - `Serialization`: a stored record could not be decoded
    fn query_by_event<'a>(&'a self, event_id: &'a EventId) -> LedgerFuture<'a, Vec<RegistrationRecord>>;

    /// All records for a user across events, oldest first.
    ///
    /// # Errors
    ///
    /// - `Database` / `Unavailable`: query failed
    /// - `Serialization`: a stored record could not be decoded
    fn query_by_user<'a>(&'a self, user_id: &'a UserId) -> LedgerFuture<'a, Vec<RegistrationRecord>>;
}
