//! Request id propagation.
//!
//! Every request gets an id (taken from `X-Request-ID` or freshly generated)
//! that is attached to its tracing span and echoed on the response.

use axum::{
    body::Body,
    http::{header::HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

/// Header name for request ID.
pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// Request ID stored in request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    /// Uses the caller's id when it is a usable header value, otherwise a new UUID.
    fn from_header(value: Option<&HeaderValue>) -> Self {
        let id = value
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty() && s.len() <= 128)
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        RequestId(id)
    }
}

/// Middleware that extracts or generates a request ID and runs the rest of
/// the stack inside a `request` span.
pub async fn trace_id(mut req: Request<Body>, next: Next) -> Response {
    let request_id = RequestId::from_header(req.headers().get(REQUEST_ID_HEADER));
    req.extensions_mut().insert(request_id.clone());

    let span = tracing::info_span!(
        "request",
        request_id = %request_id.0,
        method = %req.method(),
        path = %req.uri().path(),
    );

    let start = std::time::Instant::now();
    let mut response = next.run(req).instrument(span.clone()).await;

    span.in_scope(|| {
        tracing::info!(
            status = response.status().as_u16(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Request completed"
        );
    });

    if let Ok(header_value) = HeaderValue::from_str(&request_id.0) {
        response
            .headers_mut()
            .insert(HeaderName::from_static("x-request-id"), header_value);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_from_header() {
        let value = HeaderValue::from_static("req-123_abc.xyz");
        assert_eq!(RequestId::from_header(Some(&value)).0, "req-123_abc.xyz");
    }

    #[test]
    fn test_request_id_generated_when_missing() {
        let id = RequestId::from_header(None);
        assert!(Uuid::parse_str(&id.0).is_ok());
    }

    #[test]
    fn test_request_id_generated_when_blank() {
        let value = HeaderValue::from_static("   ");
        let id = RequestId::from_header(Some(&value));
        assert!(Uuid::parse_str(&id.0).is_ok());
    }

    #[test]
    fn test_request_id_header_constant() {
        assert_eq!(REQUEST_ID_HEADER, "X-Request-ID");
        assert_eq!(
            HeaderName::from_bytes(REQUEST_ID_HEADER.as_bytes()).unwrap(),
            HeaderName::from_static("x-request-id")
        );
    }
}
