//! HTTP boundary.

pub mod auth;
pub mod error;
pub mod health;
pub mod reservations;
pub mod slots;
pub mod webhook;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::payment::PaymentGateway;
use crate::reservation::confirmation::ConfirmationProcessor;
use crate::reservation::ledger::HoldLedger;

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<HoldLedger>,
    pub confirmations: Arc<ConfirmationProcessor>,
    pub gateway: Arc<dyn PaymentGateway>,
}

pub fn create_router(state: AppState) -> Router {
    let reservations = Router::new()
        .route("/v1/reservations", get(reservations::list_mine))
        .route("/v1/reservations/hold", post(reservations::create_hold))
        .route(
            "/v1/reservations/{reservation_id}/cancel",
            post(reservations::cancel_hold),
        )
        .route("/v1/events/{event_id}/slots", get(slots::list_slots));

    // Signature-verified; needs the raw body.
    let webhook = Router::new().route("/v1/webhooks/payment", post(webhook::handle_webhook));

    Router::new()
        .route("/health", get(health::health_check))
        .merge(reservations)
        .merge(webhook)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
