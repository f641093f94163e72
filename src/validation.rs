//! Server-side contract enforcement.
//!
//! Requests are checked before they reach a handler; responses are checked
//! before they leave. Both go through the same [`Contract`] the client uses.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use wallets_contract::{Contract, FieldError, RequestParts, ResponseParts, ValidationFailure};

use crate::error::ApiError;

/// Largest request body the middleware buffers.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

pub async fn enforce_contract(
    State(contract): State<Arc<Contract>>,
    request: Request,
    next: Next,
) -> Response {
    let (parts, body) = request.into_parts();
    let body = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            let failure = ValidationFailure::bad_request(vec![FieldError::new(
                "/body",
                format!("failed to read request body: {}", e),
            )]);
            return ApiError::from(failure).into_response();
        }
    };

    let method = parts.method.clone();
    let path = parts.uri.path().to_string();

    let verdict = contract.validate_request(&RequestParts {
        method: &method,
        path: &path,
        content_type: content_type(&parts.headers),
        body: &body,
    });
    if let Err(failure) = verdict {
        tracing::warn!(
            %method,
            %path,
            status = failure.status.as_u16(),
            errors = failure.errors.len(),
            "request rejected by contract"
        );
        metrics::increment_counter!("contract_violations_total", "direction" => "request");
        return ApiError::from(failure).into_response();
    }

    let response = next.run(Request::from_parts(parts, Body::from(body))).await;

    let (parts, body) = response.into_parts();
    let body = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(%method, %path, error = %e, "failed to buffer response body");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let verdict = contract.validate_response(&ResponseParts {
        method: &method,
        path: &path,
        status: parts.status,
        content_type: content_type(&parts.headers),
        body: &body,
    });
    if let Err(failure) = verdict {
        tracing::error!(
            %method,
            %path,
            status = parts.status.as_u16(),
            message = %failure.message,
            "response violates contract"
        );
        metrics::increment_counter!("contract_violations_total", "direction" => "response");
        return ApiError::from(failure).into_response();
    }

    Response::from_parts(parts, Body::from(body))
}

fn content_type(headers: &HeaderMap) -> Option<&str> {
    headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
}
