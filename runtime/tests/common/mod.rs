//! Shared fixtures for registration service tests.

#![allow(dead_code)] // Each test binary uses a different subset

use signup_ledger_core::catalog::Category;
use signup_ledger_runtime::{
    RegistrationService, RetryPolicy, ServiceConfig, SignupRequest, WithdrawRequest,
};
use signup_ledger_testing::{
    InMemoryEventCatalog, InMemoryLedgerStore, RecordingNotifier, stepping_clock,
};
use std::sync::Arc;
use std::time::Duration;

/// A service wired to in-memory collaborators, plus handles to inspect them.
pub struct Harness {
    pub service: Arc<RegistrationService>,
    pub ledger: InMemoryLedgerStore,
    pub notifier: RecordingNotifier,
}

/// Catalog used across scenarios.
///
/// - `yoga` (Health, 2 seats)
/// - `crossfit` (Health, 1 seat)
/// - `party` (Social, unlimited)
/// - `talk` (Social, 1 seat)
pub fn catalog() -> InMemoryEventCatalog {
    InMemoryEventCatalog::new()
        .with_event("yoga", "Yoga & Mindfulness", Category::Health, Some(2))
        .with_event("crossfit", "Funktionell träning - Crossfit", Category::Health, Some(1))
        .with_event("party", "Holiday Party", Category::Social, None)
        .with_event("talk", "Tech Talk", Category::Social, Some(1))
}

pub fn fast_config() -> ServiceConfig {
    ServiceConfig {
        conflict_retry: RetryPolicy::builder()
            .max_retries(3)
            .initial_delay(Duration::from_millis(1))
            .max_delay(Duration::from_millis(5))
            .build(),
        notification_timeout: Duration::from_millis(200),
    }
}

pub fn harness() -> Harness {
    harness_with(RecordingNotifier::new())
}

pub fn harness_with(notifier: RecordingNotifier) -> Harness {
    let ledger = InMemoryLedgerStore::new();
    let service = RegistrationService::new(
        Arc::new(ledger.clone()),
        Arc::new(catalog()),
        Arc::new(notifier.clone()),
    )
    .with_clock(Arc::new(stepping_clock()))
    .with_config(fast_config());

    Harness {
        service: Arc::new(service),
        ledger,
        notifier,
    }
}

pub fn signup(event: &str, user: &str) -> SignupRequest {
    SignupRequest {
        event_id: event.to_string(),
        user_id: user.to_string(),
        user_email: email(user),
        event_title: event.to_string(),
        priority: None,
    }
}

pub fn signup_with_priority(event: &str, user: &str, priority: i64) -> SignupRequest {
    SignupRequest {
        priority: Some(priority),
        ..signup(event, user)
    }
}

pub fn dropout(event: &str, user: &str) -> WithdrawRequest {
    WithdrawRequest {
        event_id: event.to_string(),
        user_id: user.to_string(),
    }
}

pub fn email(user: &str) -> String {
    format!("{user}@example.com")
}
