//! Service-to-service authentication.
//!
//! Protected routes require the shared service key in the `x-api-key`
//! header. Comparison is constant time.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

use crate::error::{ApiError, unauthorized};
use crate::server::AppState;

/// Middleware enforcing the shared service key on protected routes.
pub async fn require_service_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.config.service_api_key.as_deref() else {
        tracing::error!("Service API key is not configured; refusing protected request");
        return ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            "Service authentication is not configured",
        )
        .into_response();
    };

    let presented = request
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok());

    match presented {
        Some(key) if key.as_bytes().ct_eq(expected.as_bytes()).unwrap_u8() == 1 => {
            next.run(request).await
        }
        Some(_) => unauthorized(Some("Invalid API key")).into_response(),
        None => unauthorized(Some("Missing x-api-key header")).into_response(),
    }
}
