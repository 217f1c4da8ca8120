//! # Signup Ledger Runtime
//!
//! The admission and promotion engine on top of the ledger.
//!
//! ## Core Components
//!
//! - **[`RegistrationService`]**: sign-up, withdrawal and roster queries
//! - **Admission**: seat-or-waitlist decisions and priority uniqueness
//!   ([`admission`])
//! - **Promotion**: FIFO selection of the user who takes a freed seat
//!   ([`promotion`])
//! - **Locks**: per-event and per-user critical sections ([`locks`])
//! - **Retry**: re-running decisions that lost a conditional append
//!   ([`retry`])
//! - **Metrics**: Prometheus counters and histograms ([`metrics`])
//!
//! ## Example
//!
//! ```
//! use signup_ledger_core::catalog::Category;
//! use signup_ledger_runtime::{RegistrationService, SignupRequest, WithdrawRequest};
//! use signup_ledger_testing::{InMemoryEventCatalog, InMemoryLedgerStore, RecordingNotifier};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let catalog = InMemoryEventCatalog::new().with_event("73", "Yoga", Category::Health, Some(1));
//! let service = RegistrationService::new(
//!     Arc::new(InMemoryLedgerStore::new()),
//!     Arc::new(catalog),
//!     Arc::new(RecordingNotifier::new()),
//! );
//!
//! for user in ["anna", "erik"] {
//!     let request = SignupRequest {
//!         event_id: "73".into(),
//!         user_id: user.into(),
//!         user_email: format!("{user}@example.com"),
//!         event_title: "Yoga".into(),
//!         priority: None,
//!     };
//!     service.sign_up(request).await?;
//! }
//!
//! let outcome = service
//!     .withdraw(WithdrawRequest { event_id: "73".into(), user_id: "anna".into() })
//!     .await?;
//! assert_eq!(outcome.promoted.map(|r| r.user_id.into_inner()), Some("erik".to_string()));
//! # Ok::<(), signup_ledger_runtime::RegistrationError>(())
//! # });
//! ```

/// Seat-or-waitlist decisions and priority uniqueness
pub mod admission;

/// Registration error types
pub mod error;

/// Per-key async locks
pub mod locks;

/// Prometheus metrics for observability
pub mod metrics;

/// Waitlist promotion
pub mod promotion;

/// Retry logic with exponential backoff
pub mod retry;

/// The registration service
pub mod service;

pub use admission::Admission;
pub use error::RegistrationError;
pub use retry::RetryPolicy;
pub use service::{
    AdmissionRequest, RegistrationService, ServiceConfig, SignupOutcome, SignupRequest,
    WithdrawOutcome, WithdrawRequest,
};
