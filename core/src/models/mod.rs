use serde::{Deserialize, Serialize};

pub mod catalog;
pub mod reservation;

pub use catalog::{Slot, Table};
pub use reservation::{Commitment, Reservation, ReservationStatus};

/// Half-open time window `[start_ms, end_ms)` in Unix epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start_ms: u64,
    pub end_ms: u64,
}

impl TimeWindow {
    pub fn new(start_ms: u64, end_ms: u64) -> Self {
        Self { start_ms, end_ms }
    }

    /// `[s1,e1)` and `[s2,e2)` overlap iff `s1 < e2 && s2 < e1`.
    /// Windows that merely touch (`e1 == s2`) do not overlap.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start_ms < other.end_ms && other.start_ms < self.end_ms
    }

    pub fn is_empty(&self) -> bool {
        self.end_ms <= self.start_ms
    }
}
