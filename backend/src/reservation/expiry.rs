use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument};

use crate::logger::warn_if_slow;
use crate::metrics::counters::Counters;
use crate::reservation::repository::ReservationRepository;
use crate::time::now_ms;

/// Moves lapsed holds to EXPIRED so history shows what really happened.
///
/// Availability never depends on this running: the overlap computation
/// already ignores a HOLD once its expiry has passed.
pub struct ExpirySweeper {
    reservations: Arc<dyn ReservationRepository>,
    counters: Counters,
    every: Duration,
}

impl ExpirySweeper {
    pub fn new(
        reservations: Arc<dyn ReservationRepository>,
        counters: Counters,
        every: Duration,
    ) -> Self {
        Self {
            reservations,
            counters,
            every,
        }
    }

    #[instrument(skip(self), target = "expiry")]
    pub async fn sweep_once(&self, now_ms: u64) -> anyhow::Result<u64> {
        let moved = warn_if_slow("db_expire_holds", Duration::from_millis(500), async {
            self.reservations.expire_holds(now_ms).await
        })
        .await?;

        if moved > 0 {
            self.counters
                .holds_expired
                .fetch_add(moved, Ordering::Relaxed);
            info!(moved, "expired lapsed holds");
        } else {
            debug!("no lapsed holds");
        }

        Ok(moved)
    }

    /// Sweeps on a fixed cadence until `shutdown` flips to true.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.sweep_once(now_ms()).await {
                        error!(target: "expiry", error = ?e, "expiry sweep failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!(target: "expiry", "expiry sweeper stopping");
                        return;
                    }
                }
            }
        }
    }
}
