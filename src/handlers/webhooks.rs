//! Meta webhook handlers.
//!
//! Subscription verification echoes `hub.challenge` when the verify token
//! matches; event deliveries are acknowledged and logged.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use subtle::ConstantTimeEq;
use utoipa::IntoParams;

use crate::server::AppState;

#[derive(Debug, Deserialize, IntoParams)]
pub struct VerifyQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// Webhook subscription verification.
#[utoipa::path(
    get,
    path = "/webhooks/meta",
    params(VerifyQuery),
    responses(
        (status = 200, description = "Challenge echoed"),
        (status = 403, description = "Verification rejected")
    ),
    tag = "webhooks"
)]
pub async fn verify(State(state): State<AppState>, Query(query): Query<VerifyQuery>) -> Response {
    let Some(expected) = state.config.webhook_verify_token.as_deref() else {
        tracing::warn!("Webhook verification attempted without a configured verify token");
        return StatusCode::FORBIDDEN.into_response();
    };

    let mode_ok = query.mode.as_deref() == Some("subscribe");
    let token_ok = query
        .verify_token
        .as_deref()
        .is_some_and(|t| t.as_bytes().ct_eq(expected.as_bytes()).unwrap_u8() == 1);

    match (mode_ok && token_ok, query.challenge) {
        (true, Some(challenge)) => (StatusCode::OK, challenge).into_response(),
        _ => {
            tracing::warn!("Webhook verification rejected");
            StatusCode::FORBIDDEN.into_response()
        }
    }
}

/// Webhook event delivery. Events are acknowledged immediately; processing
/// is log-only.
#[utoipa::path(
    post,
    path = "/webhooks/meta",
    responses(
        (status = 200, description = "Event acknowledged")
    ),
    tag = "webhooks"
)]
pub async fn receive(body: String) -> Response {
    tracing::info!(payload_len = body.len(), "Webhook event received");
    tracing::debug!(payload = %body, "Webhook event payload");
    (StatusCode::OK, "EVENT_RECEIVED").into_response()
}
