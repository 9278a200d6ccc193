//! Busy-set computation and the lazy expiry rule.
//!
//! Cost is linear in the number of HOLD/CONFIRMED reservations handed in.
//! There is no time-range index; callers scan one restaurant at a time.

use std::collections::BTreeSet;

use crate::models::{Commitment, ReservationStatus, TimeWindow};

/// Table ids unavailable for a window. Ordered so logs and tests are stable.
pub type BusySet = BTreeSet<String>;

/// Whether a reservation in `status` still holds its tables at `now_ms`.
///
/// CONFIRMED always blocks. HOLD blocks only while its expiry is strictly in
/// the future; a HOLD without an expiry is treated as lapsed. Everything else
/// is released.
pub fn is_blocking(status: ReservationStatus, hold_expires_ms: Option<u64>, now_ms: u64) -> bool {
    match status {
        ReservationStatus::Confirmed => true,
        ReservationStatus::Hold => matches!(hold_expires_ms, Some(exp) if exp > now_ms),
        ReservationStatus::Cancelled | ReservationStatus::Expired => false,
    }
}

impl Commitment {
    pub fn blocks_at(&self, now_ms: u64) -> bool {
        is_blocking(self.status, self.hold_expires_ms, now_ms)
    }
}

/// Union of the tables of every blocking commitment whose window overlaps
/// `window`.
pub fn busy_tables<'a, I>(commitments: I, window: &TimeWindow, now_ms: u64) -> BusySet
where
    I: IntoIterator<Item = &'a Commitment>,
{
    let mut busy = BusySet::new();

    for c in commitments {
        if !c.blocks_at(now_ms) {
            continue;
        }
        if c.window.overlaps(window) {
            busy.extend(c.table_ids.iter().cloned());
        }
    }

    busy
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    const NOW: u64 = 1_700_000_000_000;

    fn commitment(
        status: ReservationStatus,
        hold_expires_ms: Option<u64>,
        window: TimeWindow,
        tables: &[&str],
    ) -> Commitment {
        Commitment {
            reservation_id: Uuid::new_v4(),
            status,
            hold_expires_ms,
            window,
            table_ids: tables.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn evening() -> TimeWindow {
        TimeWindow::new(NOW + 3_600_000, NOW + 7_200_000)
    }

    #[test]
    fn confirmed_overlapping_reservation_is_busy() {
        let rows = vec![commitment(
            ReservationStatus::Confirmed,
            None,
            evening(),
            &["t1", "t2"],
        )];

        let busy = busy_tables(&rows, &evening(), NOW);
        assert_eq!(busy.into_iter().collect::<Vec<_>>(), vec!["t1", "t2"]);
    }

    #[test]
    fn expired_hold_does_not_block() {
        let rows = vec![commitment(
            ReservationStatus::Hold,
            Some(NOW - 1),
            evening(),
            &["t1"],
        )];

        assert!(busy_tables(&rows, &evening(), NOW).is_empty());
    }

    #[test]
    fn hold_expiring_exactly_now_does_not_block() {
        let rows = vec![commitment(
            ReservationStatus::Hold,
            Some(NOW),
            evening(),
            &["t1"],
        )];

        assert!(busy_tables(&rows, &evening(), NOW).is_empty());
    }

    #[test]
    fn live_hold_blocks() {
        let rows = vec![commitment(
            ReservationStatus::Hold,
            Some(NOW + 600_000),
            evening(),
            &["t3"],
        )];

        assert!(busy_tables(&rows, &evening(), NOW).contains("t3"));
    }

    #[test]
    fn adjacent_window_does_not_block() {
        let w = evening();
        let later = TimeWindow::new(w.end_ms, w.end_ms + 3_600_000);
        let rows = vec![commitment(ReservationStatus::Confirmed, None, later, &["t1"])];

        assert!(busy_tables(&rows, &w, NOW).is_empty());
    }

    #[test]
    fn released_statuses_never_block() {
        let rows = vec![
            commitment(ReservationStatus::Cancelled, None, evening(), &["t1"]),
            commitment(ReservationStatus::Expired, None, evening(), &["t2"]),
        ];

        assert!(busy_tables(&rows, &evening(), NOW).is_empty());
    }

    #[test]
    fn hold_without_expiry_is_treated_as_lapsed() {
        assert!(!is_blocking(ReservationStatus::Hold, None, NOW));
    }
}
