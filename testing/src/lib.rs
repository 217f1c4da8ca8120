//! # Signup Ledger Testing
//!
//! Testing utilities for the signup ledger.
//!
//! This crate provides:
//! - Deterministic clocks ([`FixedClock`], [`SteppingClock`])
//! - An in-memory ledger with failure and conflict injection
//! - An in-memory event catalog with a builder
//! - A notifier that records deliveries and can be told to fail
//! - proptest strategies for domain types
//!
//! ## Example
//!
//! ```
//! use signup_ledger_core::ledger::LedgerStore;
//! use signup_ledger_core::registration::EventId;
//! use signup_ledger_testing::InMemoryLedgerStore;
//!
//! # tokio_test::block_on(async {
//! let ledger = InMemoryLedgerStore::new();
//! let records = ledger.query_by_event(&EventId::new("73")).await;
//! assert_eq!(records, Ok(vec![]));
//! # });
//! ```

use chrono::{DateTime, Duration, Utc};
use signup_ledger_core::environment::Clock;

mod catalog_mocks;
mod ledger_mocks;
mod notifier_mocks;

pub use catalog_mocks::{InMemoryEventCatalog, event_details};
pub use ledger_mocks::InMemoryLedgerStore;
pub use notifier_mocks::RecordingNotifier;

/// Mock implementations of the clock.
pub mod mocks {
    use super::{Clock, DateTime, Duration, Utc};
    use std::sync::atomic::{AtomicI64, Ordering};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use signup_ledger_testing::mocks::FixedClock;
    /// use signup_ledger_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that advances by a fixed step on every read.
    ///
    /// Gives each appended record a distinct, increasing timestamp so that
    /// ordering assertions do not depend on sequence tie-breaks.
    ///
    /// ```
    /// use signup_ledger_testing::mocks::SteppingClock;
    /// use signup_ledger_core::environment::Clock;
    /// use chrono::{Duration, Utc};
    ///
    /// let start = Utc::now();
    /// let clock = SteppingClock::new(start, Duration::seconds(1));
    /// assert_eq!(clock.now(), start);
    /// assert_eq!(clock.now(), start + Duration::seconds(1));
    /// ```
    #[derive(Debug)]
    pub struct SteppingClock {
        start: DateTime<Utc>,
        step_millis: i64,
        ticks: AtomicI64,
    }

    impl SteppingClock {
        /// Create a clock starting at `start` that moves `step` per read
        #[must_use]
        pub fn new(start: DateTime<Utc>, step: Duration) -> Self {
            Self {
                start,
                step_millis: step.num_milliseconds(),
                ticks: AtomicI64::new(0),
            }
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            let tick = self.ticks.fetch_add(1, Ordering::SeqCst);
            self.start + Duration::milliseconds(tick * self.step_millis)
        }
    }

    /// The instant all default test clocks start at (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_epoch() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_735_689_600, 0).unwrap_or_default()
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(test_epoch())
    }

    /// Create a stepping clock starting at [`test_epoch`], one second per read
    #[must_use]
    pub fn stepping_clock() -> SteppingClock {
        SteppingClock::new(test_epoch(), Duration::seconds(1))
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::prelude::*;
    use signup_ledger_core::registration::{Priority, RegistrationAction, UserId};

    /// Any of the three registration actions.
    pub fn action() -> impl Strategy<Value = RegistrationAction> {
        prop_oneof![
            Just(RegistrationAction::Signup),
            Just(RegistrationAction::Waitlist),
            Just(RegistrationAction::Dropout),
        ]
    }

    /// A valid priority in `1..=max`.
    pub fn priority(max: u32) -> impl Strategy<Value = Priority> {
        (1..=max.max(1)).prop_filter_map("priority must be positive", |value| {
            Priority::new(value).ok()
        })
    }

    /// One of `count` distinct user ids (`user-0`, `user-1`, ...).
    pub fn user_id(count: usize) -> impl Strategy<Value = UserId> {
        (0..count.max(1)).prop_map(|index| UserId::new(format!("user-{index}")))
    }

    /// An optional seat capacity.
    pub fn capacity() -> impl Strategy<Value = Option<u32>> {
        prop::option::of(1_u32..6)
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, SteppingClock, stepping_clock, test_clock, test_epoch};
