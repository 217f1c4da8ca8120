//! Signup ledger server.
//!
//! Wires the registration service to its production collaborators:
//!
//! - [`config`]: environment configuration
//! - [`catalog`]: JSON-file event catalog
//! - [`notifier`]: log and SMTP notifiers
//! - [`app`]: startup, HTTP serving and graceful shutdown

pub mod app;
pub mod catalog;
pub mod config;
pub mod notifier;

pub use app::{StartupError, build_service, run};
pub use catalog::{CatalogError, JsonFileCatalog};
pub use config::{
    Config, ConfigError, LedgerBackend, NotifierBackend, NotifierConfig, SmtpConfig, SmtpSecurity,
};
pub use notifier::{ConsoleNotifier, SmtpNotifier, SmtpSetupError};
