//! HTTP error responses.
//!
//! Handlers return [`AppError`], which renders as
//! `{"code": "DUPLICATE_PRIORITY", "message": "..."}` with the matching
//! status. Store failures keep their cause for the log and show the caller
//! a generic retry message.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use signup_ledger_runtime::RegistrationError;
use std::fmt;

const STORE_FAILURE_MESSAGE: &str = "Failed to process the registration, please try again";

/// Machine-readable error kind sent to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Missing or malformed input
    BadRequest,
    /// Priority already used in the same category
    DuplicatePriority,
    /// Withdrawal without an active registration
    NotRegistered,
    /// Unknown resource
    NotFound,
    /// Anything the caller cannot fix
    InternalServerError,
}

impl ErrorCode {
    /// Status sent with this code.
    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::BadRequest | Self::DuplicatePriority => StatusCode::BAD_REQUEST,
            Self::NotRegistered | Self::NotFound => StatusCode::NOT_FOUND,
            Self::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Wire form of the code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BadRequest => "BAD_REQUEST",
            Self::DuplicatePriority => "DUPLICATE_PRIORITY",
            Self::NotRegistered => "NOT_REGISTERED",
            Self::NotFound => "NOT_FOUND",
            Self::InternalServerError => "INTERNAL_SERVER_ERROR",
        }
    }
}

/// Error returned by every handler.
///
/// ```ignore
/// async fn roster(State(state): State<AppState>, Path(id): Path<String>) -> WebResult<Json<Roster>> {
///     Ok(Json(state.service.roster(&EventId::new(id)).await?))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    code: ErrorCode,
    message: String,
    /// Logged, never sent
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Error with a caller-facing message.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Attach the underlying cause.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// 400 for missing or malformed input.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    /// 404 for an id nobody knows.
    #[must_use]
    pub fn not_found(resource: &str, id: impl fmt::Display) -> Self {
        Self::new(ErrorCode::NotFound, format!("{resource} with id {id} not found"))
    }

    /// The code sent to the client.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        self.code
    }

    /// HTTP status of this error
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.code.status()
    }

    /// Message sent to the client.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: ErrorCode,
    message: &'a str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            let cause = self.source.as_ref().map(|e| format!("{e:#}"));
            tracing::error!(
                code = self.code.as_str(),
                cause = cause.as_deref(),
                "{}",
                self.message
            );
        }

        let body = ErrorBody {
            code: self.code,
            message: &self.message,
        };
        (status, Json(body)).into_response()
    }
}

impl From<RegistrationError> for AppError {
    fn from(err: RegistrationError) -> Self {
        match err {
            RegistrationError::Validation(message) => Self::bad_request(message),
            RegistrationError::DuplicatePriority { .. } => {
                Self::new(ErrorCode::DuplicatePriority, err.to_string())
            }
            RegistrationError::NotRegistered { .. } => {
                Self::new(ErrorCode::NotRegistered, err.to_string())
            }
            RegistrationError::UnknownEvent(event_id) => Self::not_found("Event", event_id),
            RegistrationError::Store(cause) => {
                Self::new(ErrorCode::InternalServerError, STORE_FAILURE_MESSAGE)
                    .with_source(anyhow::Error::new(cause))
            }
        }
    }
}

// Body parse failures are 400s here, not axum's default 422.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}
