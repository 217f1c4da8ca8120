//! Startup wiring tests using the in-memory backend and the shipped catalog.

#![allow(clippy::expect_used, clippy::unwrap_used)] // Integration tests can use expect for setup

use axum_test::TestServer;
use serde_json::{json, Value};
use signup_ledger_server::{
    build_service, Config, LedgerBackend, NotifierConfig, SmtpConfig, SmtpSecurity, StartupError,
};
use signup_ledger_web::{build_router, AppState};
use std::path::PathBuf;
use std::sync::Arc;

fn memory_config() -> Config {
    let catalog = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("catalog/events.json");
    let mut config = Config::from_lookup(|_| None).expect("defaults are valid");
    config.ledger.backend = LedgerBackend::Memory;
    config.catalog_path = catalog;
    config
}

#[tokio::test]
async fn memory_backend_serves_full_flow() {
    let service = build_service(&memory_config()).await.expect("service builds");
    let server = TestServer::new(build_router(AppState::new(Arc::new(service)))).unwrap();

    let events: Value = server.get("/api/events").await.json();
    let ids: Vec<_> = events
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["62", "73", "84", "95"]);

    server
        .post("/api/signup")
        .json(&json!({
            "eventId": "73",
            "userId": "anna",
            "userEmail": "anna@example.com",
            "eventTitle": "Yoga & Mindfulness",
            "priority": 1,
        }))
        .await
        .assert_status_ok();

    let roster: Value = server.get("/api/attendees/73").await.json();
    assert_eq!(roster["attendees"][0]["userName"], "anna");

    server.get("/ready").await.assert_status_ok();
}

#[tokio::test]
async fn missing_catalog_aborts_startup() {
    let mut config = memory_config();
    config.catalog_path = PathBuf::from("/nonexistent/events.json");

    let result = build_service(&config).await;
    assert!(matches!(result, Err(StartupError::Catalog(_))));
}

fn smtp_config(from_email: &str) -> SmtpConfig {
    SmtpConfig {
        host: "localhost".to_string(),
        port: 1025,
        security: SmtpSecurity::None,
        username: None,
        password: None,
        from_email: from_email.to_string(),
        from_name: "Event Sign-up".to_string(),
        timeout: std::time::Duration::from_secs(1),
    }
}

#[tokio::test]
async fn smtp_notifier_is_wired_from_config() {
    let mut config = memory_config();
    config.notifier = NotifierConfig::Smtp(smtp_config("noreply@example.com"));

    assert!(build_service(&config).await.is_ok());
}

#[tokio::test]
async fn invalid_smtp_sender_aborts_startup() {
    let mut config = memory_config();
    config.notifier = NotifierConfig::Smtp(smtp_config("nobody"));

    let result = build_service(&config).await;
    assert!(matches!(result, Err(StartupError::Notifier(_))));
}
