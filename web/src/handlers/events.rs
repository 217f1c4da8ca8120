//! Event listing and roster endpoints.

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use signup_ledger_core::catalog::EventDetails;
use signup_ledger_core::registration::{EventId, RegistrationAction, RegistrationRecord};

/// One attendee or waitlisted user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendeeView {
    /// User id.
    pub user_id: String,
    /// User email.
    pub user_email: String,
    /// Display name, the local part of the email address.
    pub user_name: String,
    /// When the user's current entry was recorded.
    pub signup_date: DateTime<Utc>,
    /// `signup` or `waitlist`.
    pub status: RegistrationAction,
}

impl From<&RegistrationRecord> for AttendeeView {
    fn from(record: &RegistrationRecord) -> Self {
        Self {
            user_id: record.user_id.to_string(),
            user_email: record.user_email.clone(),
            user_name: display_name(&record.user_email).to_string(),
            signup_date: record.timestamp,
            status: record.action,
        }
    }
}

/// Roster of one event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendeesResponse {
    /// Seated users, in sign-up order.
    pub attendees: Vec<AttendeeView>,
    /// Waitlisted users, first in line first.
    pub waitlist: Vec<AttendeeView>,
}

/// List catalog events.
///
/// # Endpoint
///
/// ```text
/// GET /api/events
/// ```
#[allow(clippy::unused_async)]
pub async fn list_events(State(state): State<AppState>) -> Json<Vec<EventDetails>> {
    Json(state.service.catalog().list_events())
}

/// Attendees and waitlist of an event.
///
/// An event without registrations has an empty roster.
///
/// # Endpoint
///
/// ```text
/// GET /api/attendees/:event_id
/// ```
///
/// # Response
///
/// ```json
/// {
///   "attendees": [
///     {
///       "userId": "anna",
///       "userEmail": "anna@example.com",
///       "userName": "anna",
///       "signupDate": "2025-11-20T09:00:00Z",
///       "status": "signup"
///     }
///   ],
///   "waitlist": []
/// }
/// ```
pub async fn list_attendees(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<Json<AttendeesResponse>, AppError> {
    let event_id: EventId = event_id
        .parse()
        .map_err(|_| AppError::bad_request("eventId is required"))?;

    let roster = state.service.roster(&event_id).await?;
    Ok(Json(AttendeesResponse {
        attendees: roster.attendees().iter().map(AttendeeView::from).collect(),
        waitlist: roster.waitlist().iter().map(AttendeeView::from).collect(),
    }))
}

fn display_name(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_is_local_part() {
        assert_eq!(display_name("anna.berg@example.com"), "anna.berg");
        assert_eq!(display_name("no-at-sign"), "no-at-sign");
        assert_eq!(display_name(""), "");
    }
}
