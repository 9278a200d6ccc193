use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use corelib::models::{Commitment, Reservation};

use crate::pricing::PricedLine;
use crate::reservation::model::{CancelOutcome, ConfirmOutcome, HoldCommit};

#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// HOLD and CONFIRMED reservations of a restaurant. Expiry is not applied
    /// here; the overlap computation decides what blocks.
    async fn fetch_commitments(&self, restaurant_id: &str) -> Result<Vec<Commitment>>;

    /// Atomically re-validates the reservation's tables against the current
    /// busy set and inserts it in HOLD. Nothing is written on `TablesTaken`.
    async fn commit_hold(
        &self,
        reservation: &Reservation,
        lines: &[PricedLine],
        now_ms: u64,
    ) -> Result<HoldCommit>;

    /// HOLD -> CONFIRMED with `reservation_number`, in one transaction.
    async fn confirm(
        &self,
        reservation_id: &Uuid,
        reservation_number: &str,
        now_ms: u64,
    ) -> Result<ConfirmOutcome>;

    /// HOLD -> CANCELLED for the owning user.
    async fn cancel_hold(&self, reservation_id: &Uuid, user_id: &str) -> Result<CancelOutcome>;

    /// HOLD -> EXPIRED for every hold whose expiry is at or before `now_ms`.
    /// Returns the number of rows moved.
    async fn expire_holds(&self, now_ms: u64) -> Result<u64>;

    async fn fetch_by_id(&self, reservation_id: &Uuid) -> Result<Option<Reservation>>;

    /// Newest first.
    async fn list_for_user(&self, user_id: &str, limit: usize) -> Result<Vec<Reservation>>;
}
