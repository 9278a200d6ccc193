use serde::{Deserialize, Serialize};

use super::TimeWindow;

/// A bookable time window within an event. Read-only to the reservation core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub slot_id: String,
    pub event_id: String,
    pub start_ms: u64,
    pub end_ms: u64,
    pub active: bool,
}

impl Slot {
    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(self.start_ms, self.end_ms)
    }
}

/// A physical table of one restaurant.
///
/// Tables sharing a `join_group` may be pushed together to seat one party.
/// A table without a join group is only ever assigned on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub table_id: String,
    pub restaurant_id: String,
    pub name: String,
    pub seats: u32,
    pub join_group: Option<String>,
    pub active: bool,
}
