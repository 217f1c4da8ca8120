//! Sign-up, dropout and per-user registration endpoints.

use crate::error::AppError;
use crate::extractors::CorrelationId;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use signup_ledger_core::registration::{RegistrationAction, RegistrationRecord, UserId};
use signup_ledger_runtime::{SignupRequest, WithdrawRequest};

/// Request to sign up for an event.
///
/// Every field is optional at the JSON level so that a missing field is
/// reported as a 400 with the field name.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpBody {
    /// Event to sign up for.
    pub event_id: Option<String>,
    /// Signing-up user.
    pub user_id: Option<String>,
    /// Address for notifications.
    pub user_email: Option<String>,
    /// Event title as shown to the user.
    pub event_title: Option<String>,
    /// Optional priority within the event's category.
    pub priority: Option<i64>,
}

/// Response after a sign-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignUpResponse {
    /// Human-readable summary.
    pub message: String,
    /// `signup` or `waitlist`.
    pub status: RegistrationAction,
}

/// Request to drop out of an event.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DropOutBody {
    /// Event to withdraw from.
    pub event_id: Option<String>,
    /// Withdrawing user.
    pub user_id: Option<String>,
}

/// User promoted from the waitlist by a dropout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotedUser {
    /// Promoted user.
    pub user_id: String,
    /// Address the promotion was sent to.
    pub user_email: String,
}

/// Response after a dropout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropOutResponse {
    /// Human-readable summary.
    pub message: String,
    /// Promoted user, or `null`.
    pub promoted: Option<PromotedUser>,
}

/// One active registration of a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationView {
    /// Event the registration belongs to.
    pub event_id: String,
    /// Event title recorded at sign-up.
    pub event_title: String,
    /// Priority within the event's category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    /// `signup` or `waitlist`.
    pub action: RegistrationAction,
    /// When the registration was recorded.
    pub timestamp: DateTime<Utc>,
}

impl From<RegistrationRecord> for RegistrationView {
    fn from(record: RegistrationRecord) -> Self {
        Self {
            event_id: record.event_id.into_inner(),
            event_title: record.event_title,
            priority: record.priority.map(|p| p.value()),
            action: record.action,
            timestamp: record.timestamp,
        }
    }
}

/// Sign up for an event.
///
/// # Endpoint
///
/// ```text
/// POST /api/signup
/// Content-Type: application/json
///
/// {
///   "eventId": "73",
///   "userId": "anna",
///   "userEmail": "anna@example.com",
///   "eventTitle": "Yoga & Mindfulness",
///   "priority": 1
/// }
/// ```
///
/// # Response
///
/// ```json
/// {"message": "Successfully signed up for event", "status": "signup"}
/// ```
///
/// # Errors
///
/// - 400 `BAD_REQUEST`: missing field or invalid priority
/// - 400 `DUPLICATE_PRIORITY`: priority already used in the category
/// - 404 `NOT_FOUND`: unknown event
/// - 500: ledger failure, safe to retry
pub async fn sign_up(
    State(state): State<AppState>,
    CorrelationId(correlation_id): CorrelationId,
    payload: Result<Json<SignUpBody>, JsonRejection>,
) -> Result<Json<SignUpResponse>, AppError> {
    let Json(body) = payload?;
    tracing::debug!(%correlation_id, event_id = ?body.event_id, "Sign-up request");

    let outcome = state
        .service
        .sign_up(SignupRequest {
            event_id: body.event_id.unwrap_or_default(),
            user_id: body.user_id.unwrap_or_default(),
            user_email: body.user_email.unwrap_or_default(),
            event_title: body.event_title.unwrap_or_default(),
            priority: body.priority,
        })
        .await?;

    Ok(Json(SignUpResponse {
        status: outcome.status(),
        message: outcome.message,
    }))
}

/// Drop out of an event, promoting the first waitlisted user if a seat
/// was freed.
///
/// # Endpoint
///
/// ```text
/// POST /api/dropout
/// Content-Type: application/json
///
/// {"eventId": "73", "userId": "anna"}
/// ```
///
/// # Response
///
/// ```json
/// {
///   "message": "Successfully dropped out from event",
///   "promoted": {"userId": "erik", "userEmail": "erik@example.com"}
/// }
/// ```
///
/// # Errors
///
/// - 400 `BAD_REQUEST`: missing field
/// - 404 `NOT_REGISTERED`: no active registration
/// - 500: ledger failure, safe to retry
pub async fn drop_out(
    State(state): State<AppState>,
    CorrelationId(correlation_id): CorrelationId,
    payload: Result<Json<DropOutBody>, JsonRejection>,
) -> Result<Json<DropOutResponse>, AppError> {
    let Json(body) = payload?;
    tracing::debug!(%correlation_id, event_id = ?body.event_id, "Dropout request");

    let outcome = state
        .service
        .withdraw(WithdrawRequest {
            event_id: body.event_id.unwrap_or_default(),
            user_id: body.user_id.unwrap_or_default(),
        })
        .await?;

    Ok(Json(DropOutResponse {
        message: outcome.message,
        promoted: outcome.promoted.map(|record| PromotedUser {
            user_id: record.user_id.into_inner(),
            user_email: record.user_email,
        }),
    }))
}

/// List a user's active registrations, oldest first.
///
/// # Endpoint
///
/// ```text
/// GET /api/registrations/:user_id
/// ```
///
/// # Response
///
/// ```json
/// [
///   {
///     "eventId": "73",
///     "eventTitle": "Yoga & Mindfulness",
///     "priority": 1,
///     "action": "signup",
///     "timestamp": "2025-11-20T09:00:00Z"
///   }
/// ]
/// ```
pub async fn list_registrations(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<RegistrationView>>, AppError> {
    let user_id: UserId = user_id
        .parse()
        .map_err(|_| AppError::bad_request("userId is required"))?;

    let records = state.service.registrations_of(&user_id).await?;
    Ok(Json(records.into_iter().map(RegistrationView::from).collect()))
}
