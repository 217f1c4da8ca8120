//! Axum HTTP surface for the signup ledger.
//!
//! Handlers are thin adapters: they translate JSON bodies into
//! [`RegistrationService`](signup_ledger_runtime::RegistrationService) calls
//! and map [`RegistrationError`](signup_ledger_runtime::RegistrationError)
//! into [`AppError`] responses.
//!
//! # Request Flow
//!
//! 1. **Correlation** ID is read or generated by the middleware
//! 2. **Extract** the JSON body or path parameter
//! 3. **Call** the registration service
//! 4. **Map** the outcome (or error) to an HTTP response
//!
//! # Example
//!
//! ```ignore
//! use signup_ledger_web::{build_router, AppState};
//!
//! let app = build_router(AppState::new(service));
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use error::{AppError, ErrorCode};
pub use extractors::CorrelationId;
pub use middleware::{correlation_id_layer, CORRELATION_ID_HEADER};
pub use router::build_router;
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
