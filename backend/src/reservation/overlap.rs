use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, instrument};

use corelib::models::TimeWindow;
use corelib::overlap::{BusySet, busy_tables};

use crate::logger::warn_if_slow;
use crate::reservation::repository::ReservationRepository;

/// Answers "which tables are taken for this window right now".
///
/// This is a plain read. Anything decided from it must be re-validated by
/// [`ReservationRepository::commit_hold`] before it is written.
#[derive(Clone)]
pub struct OverlapIndex {
    repo: Arc<dyn ReservationRepository>,
}

impl OverlapIndex {
    pub fn new(repo: Arc<dyn ReservationRepository>) -> Self {
        Self { repo }
    }

    #[instrument(skip(self), target = "ledger", fields(restaurant_id = %restaurant_id))]
    pub async fn busy_tables(
        &self,
        restaurant_id: &str,
        window: &TimeWindow,
        now_ms: u64,
    ) -> Result<BusySet> {
        let commitments = warn_if_slow("db_fetch_commitments", Duration::from_millis(100), async {
            self.repo.fetch_commitments(restaurant_id).await
        })
        .await
        .context("commitment scan failed")?;

        let busy = busy_tables(&commitments, window, now_ms);

        debug!(
            scanned = commitments.len(),
            busy = busy.len(),
            "busy set computed"
        );
        Ok(busy)
    }
}
