//! Application state for Axum handlers.

use signup_ledger_runtime::RegistrationService;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// Cloned per request; the service itself is shared behind an `Arc`.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Registration service handling every operation
    pub service: Arc<RegistrationService>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub const fn new(service: Arc<RegistrationService>) -> Self {
        Self { service }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_is_clone() {
        // Axum requires Clone state
        fn assert_clone<T: Clone + Send + Sync + 'static>() {}
        assert_clone::<AppState>();
    }
}
