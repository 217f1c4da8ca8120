//! # Signup Ledger Core
//!
//! Core types and pure logic for capacity-limited event sign-ups.
//!
//! Registration state is never stored directly. Every user action (sign up,
//! join the waitlist, drop out) is appended to an immutable ledger, and the
//! current state of an event or a user is always a projection of that ledger.
//!
//! ## Core Concepts
//!
//! - **Ledger**: append-only sequence of [`registration::RegistrationRecord`]s
//! - **Projection**: pure computation of current state from ledger records
//!   ([`projection::Roster`], [`projection::ActiveRegistrations`])
//! - **Catalog**: read-only event metadata supplied by a collaborator
//!   ([`catalog::EventCatalog`])
//! - **Notifier**: best-effort delivery of user notifications
//!   ([`notification::Notifier`])
//!
//! ## Example
//!
//! ```
//! use signup_ledger_core::projection::Roster;
//!
//! let roster = Roster::from_records(&[]);
//! assert!(roster.attendees().is_empty());
//! assert!(roster.waitlist().is_empty());
//! ```

pub mod catalog;
pub mod ledger;
pub mod notification;
pub mod projection;
pub mod registration;

// Re-export commonly used types
pub use chrono::{DateTime, Utc};

pub use catalog::{Category, EventCatalog, EventDetails};
pub use ledger::{LedgerError, LedgerStore};
pub use notification::{Notification, NotificationError, NotificationKind, Notifier};
pub use projection::{ActiveRegistrations, Membership, Roster};
pub use registration::{
    EventId, NewRegistration, Priority, RegistrationAction, RegistrationRecord, Sequence, UserId,
};

/// Environment module - time abstraction for testability.
///
/// Record timestamps come from an injected [`Clock`](environment::Clock) so
/// that tests can pin or step time deterministically.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use signup_ledger_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let _now = clock.now();
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::environment::{Clock, SystemClock};

    #[test]
    fn system_clock_moves_forward() {
        let clock = SystemClock;
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }
}
