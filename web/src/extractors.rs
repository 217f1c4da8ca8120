//! Custom Axum extractors.

use crate::middleware::{correlation_id_from, CORRELATION_ID_HEADER};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

/// Correlation ID for request tracing.
///
/// Reads the ID stored by the correlation middleware, falling back to the
/// `X-Correlation-ID` header (or a new UUID v4) when the middleware is not
/// installed.
///
/// # Example
///
/// ```ignore
/// async fn handler(correlation_id: CorrelationId) -> String {
///     format!("Request ID: {}", correlation_id.0)
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let correlation_id = parts
            .extensions
            .get::<Self>()
            .copied()
            .unwrap_or_else(|| Self(correlation_id_from(parts.headers.get(CORRELATION_ID_HEADER))));

        Ok(correlation_id)
    }
}
