use axum::Json;
use axum::extract::{Path, State};
use serde::Serialize;
use tracing::Instrument;

use corelib::models::Slot;

use crate::api::AppState;
use crate::error::AppError;
use crate::logger::{TraceId, root_span};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotView {
    pub slot_id: String,
    pub event_id: String,
    pub start_ms: u64,
    pub end_ms: u64,
}

impl From<Slot> for SlotView {
    fn from(s: Slot) -> Self {
        Self {
            slot_id: s.slot_id,
            event_id: s.event_id,
            start_ms: s.start_ms,
            end_ms: s.end_ms,
        }
    }
}

/// GET /v1/events/{event_id}/slots
pub async fn list_slots(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<Json<Vec<SlotView>>, AppError> {
    let slots = state
        .ledger
        .list_slots(&event_id)
        .instrument(root_span("list_slots", &TraceId::generate()))
        .await?;

    Ok(Json(slots.into_iter().map(SlotView::from).collect()))
}
