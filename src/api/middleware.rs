//! API Middleware
//!
//! Request context and request logging.

use axum::{
    body::Body,
    http::{HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::domain::OperationContext;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const REQUEST_USER_HEADER: &str = "x-request-user-id";

/// Build the operation context from request headers
pub fn operation_context(headers: &HeaderMap) -> OperationContext {
    let header_uuid = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value).ok())
    };

    let mut context = OperationContext::new();
    if let Some(correlation_id) = header_uuid(REQUEST_ID_HEADER) {
        context = context.with_correlation_id(correlation_id);
    }
    if let Some(user_id) = header_uuid(REQUEST_USER_HEADER) {
        context = context.with_request_user(user_id);
    }
    if let Some(user_agent) = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
    {
        context = context.with_user_agent(user_agent);
    }
    context
}

// =========================================================================
// Request Logging Middleware
// =========================================================================

/// Attach an `OperationContext` to the request and log request/response.
///
/// The correlation id is echoed back in `x-request-id`.
pub async fn logging_middleware(mut request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let mut context = operation_context(request.headers());
    let correlation_id = context.ensure_correlation_id();
    request.extensions_mut().insert(context);

    let start = std::time::Instant::now();

    tracing::info!(
        method = %method,
        uri = %uri,
        correlation_id = %correlation_id,
        "Incoming request"
    );

    let mut response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();

    tracing::info!(
        method = %method,
        uri = %uri,
        status = %status,
        duration_ms = duration.as_millis() as u64,
        correlation_id = %correlation_id,
        "Request completed"
    );

    if let Ok(value) = HeaderValue::from_str(&correlation_id.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_context_from_headers() {
        let correlation_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, correlation_id.to_string().parse().unwrap());
        headers.insert(REQUEST_USER_HEADER, user_id.to_string().parse().unwrap());
        headers.insert("user-agent", "ops-cli/1.0".parse().unwrap());

        let context = operation_context(&headers);

        assert_eq!(context.correlation_id, Some(correlation_id));
        assert_eq!(context.request_user_id, Some(user_id));
        assert_eq!(context.user_agent.as_deref(), Some("ops-cli/1.0"));
    }

    #[test]
    fn test_malformed_ids_are_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, "not-a-uuid".parse().unwrap());

        let context = operation_context(&headers);

        assert_eq!(context, OperationContext::new());
    }
}
