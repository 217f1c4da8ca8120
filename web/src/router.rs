//! Router configuration.

use crate::handlers;
use crate::middleware::correlation_id_layer;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the complete Axum router.
///
/// # Routes
///
/// - `POST /api/signup` - Sign up (seat or waitlist)
/// - `POST /api/dropout` - Withdraw and promote
/// - `GET /api/attendees/:event_id` - Roster of an event
/// - `GET /api/registrations/:user_id` - Active registrations of a user
/// - `GET /api/events` - Catalog listing
/// - `GET /health` - Liveness
/// - `GET /ready` - Readiness (ledger probe)
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/signup", post(handlers::sign_up))
        .route("/dropout", post(handlers::drop_out))
        .route("/attendees/:event_id", get(handlers::list_attendees))
        .route("/registrations/:user_id", get(handlers::list_registrations))
        .route("/events", get(handlers::list_events));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(correlation_id_layer())
        .with_state(state)
}
