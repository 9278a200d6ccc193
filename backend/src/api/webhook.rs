//! POST /v1/webhooks/payment
//!
//! Takes the raw body: the signature is computed over the exact bytes sent.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use serde_json::json;
use tracing::Instrument;

use crate::api::AppState;
use crate::error::AppError;
use crate::logger::{TraceId, root_span};

pub const SIGNATURE_HEADER: &str = "stripe-signature";

pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let span = root_span("payment_webhook", &TraceId::generate());

    async move {
        // An absent header reaches the verifier as empty, so a missing signing
        // secret is still reported ahead of it.
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        let event = state
            .gateway
            .parse_webhook(&body, signature)
            .inspect_err(|e| tracing::warn!(target: "api", error = %e, "webhook rejected"))?;

        state.confirmations.handle_event(event).await?;

        Ok::<_, AppError>(Json(json!({ "received": true })))
    }
    .instrument(span)
    .await
}
