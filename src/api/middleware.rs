//! API Middleware
//!
//! Caller identity extraction and request logging.

use axum::{
    body::Body,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::domain::CallerContext;

pub const USER_ID_HEADER: &str = "X-Request-User-Id";
pub const USER_ROLE_HEADER: &str = "X-Request-User-Role";
pub const USER_FIRST_NAME_HEADER: &str = "X-Request-User-First-Name";
pub const USER_LAST_NAME_HEADER: &str = "X-Request-User-Last-Name";
pub const USER_USERNAME_HEADER: &str = "X-Request-User-Username";
pub const USER_IMAGE_HEADER: &str = "X-Request-User-Image";
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-Id";

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// =========================================================================
// Caller Context Middleware
// =========================================================================

/// Build the caller context from headers set by the upstream auth layer
///
/// The identity is trusted as-is. Requests without a user id proceed as
/// anonymous; handlers that need a caller reject them.
pub fn caller_from_headers(headers: &HeaderMap) -> CallerContext {
    let correlation_id = headers
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);

    let mut context = CallerContext::new().with_correlation_id(correlation_id);

    if let Some(user_id) = header(headers, USER_ID_HEADER) {
        context = context.with_user(user_id);
    }
    if let Some(role) = header(headers, USER_ROLE_HEADER) {
        context = context.with_role(role);
    }
    context.first_name = header(headers, USER_FIRST_NAME_HEADER).unwrap_or_default();
    context.last_name = header(headers, USER_LAST_NAME_HEADER).unwrap_or_default();
    context.username = header(headers, USER_USERNAME_HEADER).unwrap_or_default();
    context.profile_image = header(headers, USER_IMAGE_HEADER).unwrap_or_default();

    context
}

/// Attach a [`CallerContext`] to every request
pub async fn caller_middleware(mut request: Request<Body>, next: Next) -> Response {
    let context = caller_from_headers(request.headers());
    request.extensions_mut().insert(context);
    next.run(request).await
}

// =========================================================================
// mask_headers_for_logging
// =========================================================================

/// Headers that should be masked in logs
const SENSITIVE_HEADERS: &[&str] = &["authorization", "cookie", "set-cookie"];

/// Mask sensitive headers for logging
pub fn mask_headers_for_logging(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let name_lower = name.as_str().to_lowercase();
            let masked_value = if SENSITIVE_HEADERS.contains(&name_lower.as_str()) {
                "[REDACTED]".to_string()
            } else {
                value.to_str().unwrap_or("[invalid utf8]").to_string()
            };
            (name.to_string(), masked_value)
        })
        .collect()
}

// =========================================================================
// Request Logging Middleware
// =========================================================================

/// Request logging middleware
pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let version = request.version();

    let headers = mask_headers_for_logging(request.headers());

    let correlation_id = request
        .extensions()
        .get::<CallerContext>()
        .and_then(|ctx| ctx.correlation_id);

    let start = std::time::Instant::now();

    tracing::info!(
        method = %method,
        uri = %uri,
        version = ?version,
        correlation_id = ?correlation_id,
        headers = ?headers,
        "Incoming request"
    );

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();

    tracing::info!(
        method = %method,
        uri = %uri,
        status = %status,
        duration_ms = %duration.as_millis(),
        correlation_id = ?correlation_id,
        "Request completed"
    );

    response
}
