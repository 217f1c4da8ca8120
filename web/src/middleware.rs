//! Correlation ids for every request.
//!
//! An incoming `X-Correlation-ID` that parses as a UUID is kept, anything
//! else is replaced by a fresh v4 id. The id is stored in the request
//! extensions as a [`CorrelationId`], the handler runs inside an
//! `http_request` span that carries it, and the response echoes it back.

use crate::extractors::CorrelationId;
use axum::{
    extract::Request,
    http::HeaderValue,
    response::Response,
};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::Instrument;
use uuid::Uuid;

/// Header carrying the correlation id in both directions.
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// Layer that tags requests with a correlation id.
#[must_use]
pub const fn correlation_id_layer() -> CorrelationIdLayer {
    CorrelationIdLayer
}

/// See [`correlation_id_layer`].
#[derive(Clone, Copy, Debug, Default)]
pub struct CorrelationIdLayer;

impl<S> Layer<S> for CorrelationIdLayer {
    type Service = Correlated<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Correlated { inner }
    }
}

/// Service produced by [`CorrelationIdLayer`].
#[derive(Clone, Debug)]
pub struct Correlated<S> {
    inner: S,
}

impl<S> Service<Request> for Correlated<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request) -> Self::Future {
        let id = correlation_id_from(request.headers().get(CORRELATION_ID_HEADER));
        request.extensions_mut().insert(CorrelationId(id));

        let span = tracing::info_span!(
            "http_request",
            correlation_id = %id,
            method = %request.method(),
            path = %request.uri().path(),
        );
        let pending = self.inner.call(request).instrument(span);

        Box::pin(async move {
            let mut response = pending.await?;
            if let Ok(value) = HeaderValue::from_str(&id.hyphenated().to_string()) {
                response.headers_mut().insert(CORRELATION_ID_HEADER, value);
            }
            Ok(response)
        })
    }
}

/// The id a request asked for, or a new one.
pub(crate) fn correlation_id_from(header: Option<&HeaderValue>) -> Uuid {
    header
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| Uuid::try_parse(raw.trim()).ok())
        .unwrap_or_else(Uuid::new_v4)
}
