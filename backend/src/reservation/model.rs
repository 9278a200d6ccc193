use uuid::Uuid;

use corelib::models::ReservationStatus;

use crate::error::AppError;
use crate::pricing::LineItem;

/// A validated create-hold request. Build it with [`HoldRequest::new`].
#[derive(Clone, Debug)]
pub struct HoldRequest {
    pub user_id: String,
    pub restaurant_id: String,
    pub event_id: String,
    pub slot_id: String,
    pub party_size: u32,
    pub items: Vec<LineItem>,
}

impl HoldRequest {
    /// Rejects anything malformed before a single query or provider call runs.
    pub fn new(
        user_id: impl Into<String>,
        restaurant_id: impl Into<String>,
        event_id: impl Into<String>,
        slot_id: impl Into<String>,
        party_size: u32,
        items: Vec<LineItem>,
    ) -> Result<Self, AppError> {
        let req = Self {
            user_id: user_id.into(),
            restaurant_id: restaurant_id.into(),
            event_id: event_id.into(),
            slot_id: slot_id.into(),
            party_size,
            items,
        };

        if req.user_id.trim().is_empty() {
            return Err(AppError::Unauthenticated);
        }
        for (name, value) in [
            ("restaurant_id", &req.restaurant_id),
            ("event_id", &req.event_id),
            ("slot_id", &req.slot_id),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::Validation(format!("{name} is required")));
            }
        }
        if req.party_size < 1 {
            return Err(AppError::Validation("party_size must be at least 1".into()));
        }
        for item in &req.items {
            if item.item_id.trim().is_empty() {
                return Err(AppError::Validation("item_id is required".into()));
            }
            if item.quantity < 1 {
                return Err(AppError::Validation(format!(
                    "quantity for item {} must be at least 1",
                    item.item_id
                )));
            }
        }

        Ok(req)
    }
}

/// What the caller gets back from a successful hold.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HoldReceipt {
    pub reservation_id: Uuid,
    pub table_ids: Vec<String>,
    pub total_amount: i64,
    pub currency: String,
    pub hold_expires_ms: u64,
    /// Opaque token the client hands to the payment provider.
    pub payment_client_secret: String,
}

/// Result of the atomic hold commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HoldCommit {
    Committed,
    /// Another commit took some of the chosen tables first.
    TablesTaken { table_ids: Vec<String> },
}

/// Result of one confirmation attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Confirmed { reservation_number: String },
    /// Already CONFIRMED; nothing changed.
    AlreadyConfirmed { reservation_number: Option<String> },
    NotFound,
    /// The candidate number is in use; try another.
    NumberTaken,
    /// Cancelled, or a lapsed hold whose tables have since been taken.
    NotConfirmable { status: ReservationStatus },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled { payment_intent_id: String },
    NotFound,
    NotHeld { status: ReservationStatus },
}
