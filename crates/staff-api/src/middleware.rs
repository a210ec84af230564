//! # Request Middleware
//!
//! Per-request context tagging and development-mode fault detail.

use axum::body::Body;
use axum::extract::Request;
use axum::http::{HeaderName, HeaderValue, header};
use axum::middleware::Next;
use axum::response::Response;
use std::time::Instant;

use crate::error::FaultDetail;
use staff_domain::RequestContext;

/// Header carrying the request id in both directions
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

const MAX_REQUEST_ID_LEN: usize = 128;

/// Attach a [`RequestContext`] to the request and log its lifecycle.
///
/// A client-supplied `x-request-id` is reused when present; otherwise a new
/// id is generated. The id is echoed on the response.
pub async fn request_context(mut req: Request, next: Next) -> Response {
    let ctx = req
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty() && v.len() <= MAX_REQUEST_ID_LEN)
        .map_or_else(RequestContext::generate, RequestContext::new);

    let method = req.method().clone();
    let uri = req.uri().clone();
    tracing::info!(%method, %uri, request_id = %ctx.request_id, "Incoming request");

    req.extensions_mut().insert(ctx.clone());
    let started = Instant::now();
    let mut response = next.run(req).await;

    if let Ok(value) = HeaderValue::from_str(&ctx.request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    tracing::info!(
        %method,
        %uri,
        status = response.status().as_u16(),
        latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        request_id = %ctx.request_id,
        "Request finished"
    );
    response
}

/// Replace the generic 5xx message with the internal detail.
///
/// Only installed in development.
pub async fn expose_fault_detail(response: Response) -> Response {
    let Some(fault) = response.extensions().get::<FaultDetail>().cloned() else {
        return response;
    };

    let (mut parts, _) = response.into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    let body = serde_json::json!({
        "status": "error",
        "message": fault.message,
        "code": fault.code,
    });

    Response::from_parts(parts, Body::from(body.to_string()))
}

/// Hardening headers set on every response that does not already carry them
pub fn security_headers() -> [(HeaderName, HeaderValue); 11] {
    [
        (
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static(
                "default-src 'self';base-uri 'self';frame-ancestors 'self';object-src 'none';script-src-attr 'none';upgrade-insecure-requests",
            ),
        ),
        (
            HeaderName::from_static("cross-origin-opener-policy"),
            HeaderValue::from_static("same-origin"),
        ),
        (
            HeaderName::from_static("cross-origin-resource-policy"),
            HeaderValue::from_static("same-origin"),
        ),
        (
            HeaderName::from_static("origin-agent-cluster"),
            HeaderValue::from_static("?1"),
        ),
        (header::REFERRER_POLICY, HeaderValue::from_static("no-referrer")),
        (
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=31536000; includeSubDomains"),
        ),
        (header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
        (header::X_DNS_PREFETCH_CONTROL, HeaderValue::from_static("off")),
        (header::X_FRAME_OPTIONS, HeaderValue::from_static("SAMEORIGIN")),
        (
            HeaderName::from_static("x-permitted-cross-domain-policies"),
            HeaderValue::from_static("none"),
        ),
        (header::X_XSS_PROTECTION, HeaderValue::from_static("0")),
    ]
}
