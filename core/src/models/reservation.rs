use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::TimeWindow;

/// Lifecycle of a reservation.
///
/// HOLD -> CONFIRMED on payment success. HOLD -> EXPIRED by the expiry sweep.
/// HOLD -> CANCELLED on explicit release by the owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Hold,
    Confirmed,
    Cancelled,
    Expired,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Hold => "HOLD",
            ReservationStatus::Confirmed => "CONFIRMED",
            ReservationStatus::Cancelled => "CANCELLED",
            ReservationStatus::Expired => "EXPIRED",
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReservationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HOLD" => Ok(ReservationStatus::Hold),
            "CONFIRMED" => Ok(ReservationStatus::Confirmed),
            "CANCELLED" => Ok(ReservationStatus::Cancelled),
            "EXPIRED" => Ok(ReservationStatus::Expired),
            other => Err(format!("unknown reservation status: {other}")),
        }
    }
}

/// The central mutable record.
///
/// `window` is a copy of the slot's window taken at creation time so overlap
/// queries never join back against slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub reservation_id: Uuid,
    pub user_id: String,
    pub restaurant_id: String,
    pub event_id: String,
    pub slot_id: String,
    pub party_size: u32,
    pub table_ids: Vec<String>,
    pub status: ReservationStatus,
    /// Present iff `status == Hold`.
    pub hold_expires_ms: Option<u64>,
    /// Minor currency units, priced server side.
    pub total_amount: i64,
    pub currency: String,
    pub created_ms: u64,
    pub payment_intent_id: String,
    pub window: TimeWindow,
    /// Set once, on HOLD -> CONFIRMED.
    pub reservation_number: Option<String>,
}

impl Reservation {
    pub fn commitment(&self) -> Commitment {
        Commitment {
            reservation_id: self.reservation_id,
            status: self.status,
            hold_expires_ms: self.hold_expires_ms,
            window: self.window,
            table_ids: self.table_ids.clone(),
        }
    }
}

/// The slice of a reservation the overlap scan needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commitment {
    pub reservation_id: Uuid,
    pub status: ReservationStatus,
    pub hold_expires_ms: Option<u64>,
    pub window: TimeWindow,
    pub table_ids: Vec<String>,
}
