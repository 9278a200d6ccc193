use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use tracing::Instrument;
use uuid::Uuid;

use corelib::models::{Reservation, ReservationStatus};

use crate::api::AppState;
use crate::api::auth::CallerId;
use crate::error::AppError;
use crate::logger::{TraceId, annotate_span, root_span};
use crate::pricing::LineItem;
use crate::reservation::model::{HoldReceipt, HoldRequest};

/// Most recent reservations returned by the history endpoint.
pub const HISTORY_LIMIT: usize = 50;

/// Create-hold body. Prices are never accepted from the client; any field
/// not listed here is rejected.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateHoldBody {
    pub restaurant_id: String,
    pub event_id: String,
    pub slot_id: String,
    pub party_size: u32,
    #[serde(default)]
    pub items: Vec<ItemBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ItemBody {
    pub menu_item_id: String,
    pub qty: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldResponse {
    pub reservation_id: Uuid,
    pub assigned_table_ids: Vec<String>,
    pub total_amount: i64,
    pub currency: String,
    pub hold_expires_at_ms: u64,
    pub payment_intent_client_secret: String,
}

impl From<HoldReceipt> for HoldResponse {
    fn from(r: HoldReceipt) -> Self {
        Self {
            reservation_id: r.reservation_id,
            assigned_table_ids: r.table_ids,
            total_amount: r.total_amount,
            currency: r.currency,
            hold_expires_at_ms: r.hold_expires_ms,
            payment_intent_client_secret: r.payment_client_secret,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationView {
    pub reservation_id: Uuid,
    pub restaurant_id: String,
    pub event_id: String,
    pub slot_id: String,
    pub party_size: u32,
    pub table_ids: Vec<String>,
    pub status: ReservationStatus,
    pub hold_expires_at_ms: Option<u64>,
    pub total_amount: i64,
    pub currency: String,
    pub created_at_ms: u64,
    pub slot_start_ms: u64,
    pub slot_end_ms: u64,
    pub reservation_number: Option<String>,
}

impl From<Reservation> for ReservationView {
    fn from(r: Reservation) -> Self {
        Self {
            reservation_id: r.reservation_id,
            restaurant_id: r.restaurant_id,
            event_id: r.event_id,
            slot_id: r.slot_id,
            party_size: r.party_size,
            table_ids: r.table_ids,
            status: r.status,
            hold_expires_at_ms: r.hold_expires_ms,
            total_amount: r.total_amount,
            currency: r.currency,
            created_at_ms: r.created_ms,
            slot_start_ms: r.window.start_ms,
            slot_end_ms: r.window.end_ms,
            reservation_number: r.reservation_number,
        }
    }
}

/// POST /v1/reservations/hold
pub async fn create_hold(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    body: Result<Json<CreateHoldBody>, JsonRejection>,
) -> Result<Json<HoldResponse>, AppError> {
    let Json(body) = body.map_err(|e| AppError::Validation(e.body_text()))?;

    let span = root_span("create_hold", &TraceId::generate());
    async move {
        annotate_span(Some(&body.restaurant_id), None);

        let items = body
            .items
            .into_iter()
            .map(|i| LineItem {
                item_id: i.menu_item_id,
                quantity: i.qty,
            })
            .collect();

        let req = HoldRequest::new(
            user_id,
            body.restaurant_id,
            body.event_id,
            body.slot_id,
            body.party_size,
            items,
        )?;

        let receipt = state.ledger.create_hold(req).await?;
        annotate_span(None, Some(&receipt.reservation_id));

        Ok::<_, AppError>(Json(HoldResponse::from(receipt)))
    }
    .instrument(span)
    .await
}

/// POST /v1/reservations/{reservation_id}/cancel
pub async fn cancel_hold(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    Path(reservation_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let reservation_id = Uuid::parse_str(&reservation_id)
        .map_err(|_| AppError::NotFound(format!("reservation {reservation_id}")))?;

    let span = root_span("cancel_hold", &TraceId::generate());
    async move {
        annotate_span(None, Some(&reservation_id));
        state.ledger.cancel_hold(&reservation_id, &user_id).await?;

        Ok::<_, AppError>(Json(serde_json::json!({
            "reservationId": reservation_id,
            "status": ReservationStatus::Cancelled,
        })))
    }
    .instrument(span)
    .await
}

/// GET /v1/reservations
pub async fn list_mine(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
) -> Result<Json<Vec<ReservationView>>, AppError> {
    let rows = state
        .ledger
        .list_for_user(&user_id, HISTORY_LIMIT)
        .instrument(root_span("list_reservations", &TraceId::generate()))
        .await?;

    Ok(Json(rows.into_iter().map(ReservationView::from).collect()))
}
