//! In-memory ledger for fast, deterministic tests.

use signup_ledger_core::ledger::{LedgerError, LedgerFuture, LedgerStore};
use signup_ledger_core::registration::{
    EventId, NewRegistration, RegistrationRecord, Sequence, UserId,
};
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug, Default)]
struct LedgerState {
    records: Vec<RegistrationRecord>,
    last_sequence: u64,
    unavailable: bool,
    failing_appends: usize,
    forced_conflicts: usize,
}

impl LedgerState {
    fn head_of(&self, event_id: &EventId) -> Option<Sequence> {
        self.records
            .iter()
            .filter(|r| &r.event_id == event_id)
            .map(|r| r.sequence)
            .max()
    }

    fn check_writable(&mut self) -> Result<(), LedgerError> {
        if self.unavailable {
            return Err(LedgerError::Unavailable("in-memory ledger offline".to_string()));
        }
        if self.failing_appends > 0 {
            self.failing_appends -= 1;
            return Err(LedgerError::Database("injected append failure".to_string()));
        }
        Ok(())
    }

    fn push(&mut self, record: NewRegistration) -> RegistrationRecord {
        self.last_sequence += 1;
        let record = record.into_record(Sequence::new(self.last_sequence));
        self.records.push(record.clone());
        record
    }
}

/// In-memory ledger store.
///
/// Behaves like the production store (global sequence, conditional appends,
/// sequence-ordered queries) and adds knobs for failure injection. Every
/// operation yields to the scheduler once before touching state so that
/// concurrent callers actually interleave.
///
/// # Example
///
/// ```
/// use signup_ledger_testing::InMemoryLedgerStore;
///
/// let ledger = InMemoryLedgerStore::new();
/// ledger.fail_next_appends(1);
/// assert!(ledger.is_empty());
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryLedgerStore {
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryLedgerStore {
    /// Create an empty ledger
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` appends fail with a database error.
    pub fn fail_next_appends(&self, count: usize) {
        self.write().failing_appends = count;
    }

    /// Make the next `count` conditional appends report a concurrency
    /// conflict, as if another process had written in between.
    pub fn force_conflicts(&self, count: usize) {
        self.write().forced_conflicts = count;
    }

    /// Take the whole ledger offline (every operation fails) or back online.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.write().unavailable = unavailable;
    }

    /// Snapshot of every record, in sequence order.
    #[must_use]
    pub fn records(&self) -> Vec<RegistrationRecord> {
        self.read().records.clone()
    }

    /// Number of appended records
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().records.len()
    }

    /// Whether nothing was appended yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().records.is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, LedgerState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, LedgerState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn query<F>(&self, filter: F) -> Result<Vec<RegistrationRecord>, LedgerError>
    where
        F: Fn(&RegistrationRecord) -> bool,
    {
        let state = self.read();
        if state.unavailable {
            return Err(LedgerError::Unavailable("in-memory ledger offline".to_string()));
        }
        Ok(state.records.iter().filter(|r| filter(r)).cloned().collect())
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn append(&self, record: NewRegistration) -> LedgerFuture<'_, RegistrationRecord> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            let mut state = self.write();
            state.check_writable()?;
            Ok(state.push(record))
        })
    }

    fn append_if(
        &self,
        record: NewRegistration,
        expected_head: Option<Sequence>,
    ) -> LedgerFuture<'_, RegistrationRecord> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            let mut state = self.write();
            state.check_writable()?;

            let actual = state.head_of(&record.event_id);
            if state.forced_conflicts > 0 || actual != expected_head {
                state.forced_conflicts = state.forced_conflicts.saturating_sub(1);
                return Err(LedgerError::ConcurrencyConflict {
                    event_id: record.event_id,
                    expected: expected_head,
                    actual,
                });
            }

            Ok(state.push(record))
        })
    }

    fn query_by_event<'a>(
        &'a self,
        event_id: &'a EventId,
    ) -> LedgerFuture<'a, Vec<RegistrationRecord>> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            self.query(|r| &r.event_id == event_id)
        })
    }

    fn query_by_user<'a>(&'a self, user_id: &'a UserId) -> LedgerFuture<'a, Vec<RegistrationRecord>> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            self.query(|r| &r.user_id == user_id)
        })
    }
}
