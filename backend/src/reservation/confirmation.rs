use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::db::is_transient;
use crate::error::AppError;
use crate::logger::warn_if_slow;
use crate::metrics::counters::Counters;
use crate::payment::GatewayEvent;
use crate::reservation::model::ConfirmOutcome;
use crate::reservation::number;
use crate::reservation::repository::ReservationRepository;
use crate::time::now_ms;

/// Turns verified "payment succeeded" events into CONFIRMED reservations.
///
/// Deliveries are at-least-once. A reservation that is already CONFIRMED is
/// left exactly as it is, so replays are harmless. Anything the provider could
/// not fix by redelivering (unknown id, cancelled reservation) is acknowledged
/// and logged rather than surfaced as an error.
pub struct ConfirmationProcessor {
    reservations: Arc<dyn ReservationRepository>,
    counters: Counters,
    max_attempts: u32,
}

impl ConfirmationProcessor {
    pub fn new(
        reservations: Arc<dyn ReservationRepository>,
        counters: Counters,
        max_attempts: u32,
    ) -> Self {
        Self {
            reservations,
            counters,
            max_attempts: max_attempts.max(1),
        }
    }

    #[instrument(skip(self, event), target = "confirm")]
    pub async fn handle_event(&self, event: GatewayEvent) -> Result<(), AppError> {
        match event {
            GatewayEvent::PaymentSucceeded {
                intent_id,
                reservation_id: Some(raw),
            } => match Uuid::parse_str(&raw) {
                Ok(id) => self.confirm(&id).await.map(|_| ()),
                Err(_) => {
                    self.counters
                        .confirmations_unknown
                        .fetch_add(1, Ordering::Relaxed);
                    warn!(%intent_id, reservation_id = %raw, "payment for malformed reservation id");
                    Ok(())
                }
            },
            GatewayEvent::PaymentSucceeded {
                intent_id,
                reservation_id: None,
            } => {
                self.counters
                    .confirmations_unknown
                    .fetch_add(1, Ordering::Relaxed);
                warn!(%intent_id, "payment without reservation metadata");
                Ok(())
            }
            GatewayEvent::Other { event_type } => {
                debug!(%event_type, "ignoring webhook event");
                Ok(())
            }
        }
    }

    /// Confirms one reservation, drawing a fresh number on every collision.
    #[instrument(skip(self), target = "confirm", fields(reservation_id = %reservation_id))]
    pub async fn confirm(&self, reservation_id: &Uuid) -> Result<ConfirmOutcome, AppError> {
        for attempt in 1..=self.max_attempts {
            let candidate = number::generate();

            let outcome = warn_if_slow("db_confirm", Duration::from_millis(100), async {
                self.reservations
                    .confirm(reservation_id, &candidate, now_ms())
                    .await
            })
            .await;

            match outcome {
                Ok(ConfirmOutcome::Confirmed { reservation_number }) => {
                    self.counters.confirmations.fetch_add(1, Ordering::Relaxed);
                    info!(%reservation_number, attempt, "reservation confirmed");
                    return Ok(ConfirmOutcome::Confirmed { reservation_number });
                }
                Ok(o @ ConfirmOutcome::AlreadyConfirmed { .. }) => {
                    self.counters
                        .confirmations_duplicate
                        .fetch_add(1, Ordering::Relaxed);
                    debug!("duplicate payment notification; already confirmed");
                    return Ok(o);
                }
                Ok(ConfirmOutcome::NotFound) => {
                    self.counters
                        .confirmations_unknown
                        .fetch_add(1, Ordering::Relaxed);
                    warn!("payment for unknown reservation");
                    return Ok(ConfirmOutcome::NotFound);
                }
                Ok(ConfirmOutcome::NotConfirmable { status }) => {
                    self.counters
                        .confirmations_rejected
                        .fetch_add(1, Ordering::Relaxed);
                    warn!(%status, "payment received for reservation that cannot be confirmed; refund required");
                    return Ok(ConfirmOutcome::NotConfirmable { status });
                }
                Ok(ConfirmOutcome::NumberTaken) => {
                    self.counters
                        .number_collisions
                        .fetch_add(1, Ordering::Relaxed);
                    debug!(%candidate, attempt, "reservation number collision");
                }
                Err(e) if is_transient(&e) && attempt < self.max_attempts => {
                    debug!(attempt, error = %e, "transient storage error during confirm");
                    tokio::time::sleep(Duration::from_millis(10 * u64::from(attempt))).await;
                }
                Err(e) => return Err(AppError::Storage(e.context("confirm failed"))),
            }
        }

        // Surfaced as a storage failure so the provider redelivers later.
        Err(AppError::Storage(anyhow::anyhow!(
            "no free reservation number after {} attempts",
            self.max_attempts
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use corelib::models::{Commitment, Reservation, ReservationStatus};
    use parking_lot::Mutex;

    use crate::pricing::PricedLine;
    use crate::reservation::model::{CancelOutcome, HoldCommit};

    /// Answers `confirm` from a script, recording the numbers it was offered.
    struct ScriptedConfirm {
        script: Mutex<Vec<ConfirmOutcome>>,
        offered: Mutex<Vec<String>>,
    }

    impl ScriptedConfirm {
        fn new(mut script: Vec<ConfirmOutcome>) -> Self {
            script.reverse();
            Self {
                script: Mutex::new(script),
                offered: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ReservationRepository for ScriptedConfirm {
        async fn fetch_commitments(&self, _: &str) -> anyhow::Result<Vec<Commitment>> {
            Ok(vec![])
        }
        async fn commit_hold(&self, _: &Reservation, _: &[PricedLine], _: u64) -> anyhow::Result<HoldCommit> {
            Ok(HoldCommit::Committed)
        }
        async fn confirm(&self, _: &Uuid, number: &str, _: u64) -> anyhow::Result<ConfirmOutcome> {
            self.offered.lock().push(number.to_string());
            match self.script.lock().pop() {
                Some(ConfirmOutcome::Confirmed { .. }) => Ok(ConfirmOutcome::Confirmed {
                    reservation_number: number.to_string(),
                }),
                Some(o) => Ok(o),
                None => Ok(ConfirmOutcome::NumberTaken),
            }
        }
        async fn cancel_hold(&self, _: &Uuid, _: &str) -> anyhow::Result<CancelOutcome> {
            Ok(CancelOutcome::NotFound)
        }
        async fn expire_holds(&self, _: u64) -> anyhow::Result<u64> {
            Ok(0)
        }
        async fn fetch_by_id(&self, _: &Uuid) -> anyhow::Result<Option<Reservation>> {
            Ok(None)
        }
        async fn list_for_user(&self, _: &str, _: usize) -> anyhow::Result<Vec<Reservation>> {
            Ok(vec![])
        }
    }

    fn confirmed() -> ConfirmOutcome {
        ConfirmOutcome::Confirmed {
            reservation_number: String::new(),
        }
    }

    #[tokio::test]
    async fn collision_retries_with_fresh_number() {
        let repo = Arc::new(ScriptedConfirm::new(vec![
            ConfirmOutcome::NumberTaken,
            confirmed(),
        ]));
        let counters = Counters::default();
        let p = ConfirmationProcessor::new(repo.clone(), counters.clone(), 5);

        let out = p.confirm(&Uuid::new_v4()).await.unwrap();

        let offered = repo.offered.lock().clone();
        assert_eq!(offered.len(), 2);
        assert_eq!(
            out,
            ConfirmOutcome::Confirmed {
                reservation_number: offered[1].clone()
            }
        );
        assert_eq!(counters.number_collisions.load(Ordering::Relaxed), 1);
        assert_eq!(counters.confirmations.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let repo = Arc::new(ScriptedConfirm::new(vec![]));
        let p = ConfirmationProcessor::new(repo.clone(), Counters::default(), 3);

        let err = p.confirm(&Uuid::new_v4()).await.unwrap_err();

        assert!(matches!(err, AppError::Storage(_)));
        assert_eq!(err.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(repo.offered.lock().len(), 3);
    }

    #[tokio::test]
    async fn duplicate_delivery_is_acknowledged() {
        let repo = Arc::new(ScriptedConfirm::new(vec![ConfirmOutcome::AlreadyConfirmed {
            reservation_number: Some("EV20250101-AAAA".to_string()),
        }]));
        let counters = Counters::default();
        let p = ConfirmationProcessor::new(repo, counters.clone(), 5);

        let event = GatewayEvent::PaymentSucceeded {
            intent_id: "pi_1".to_string(),
            reservation_id: Some(Uuid::new_v4().to_string()),
        };
        p.handle_event(event).await.unwrap();

        assert_eq!(counters.confirmations_duplicate.load(Ordering::Relaxed), 1);
        assert_eq!(counters.confirmations.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn cancelled_reservation_is_not_an_error() {
        let repo = Arc::new(ScriptedConfirm::new(vec![ConfirmOutcome::NotConfirmable {
            status: ReservationStatus::Cancelled,
        }]));
        let p = ConfirmationProcessor::new(repo, Counters::default(), 5);

        let out = p.confirm(&Uuid::new_v4()).await.unwrap();
        assert!(matches!(out, ConfirmOutcome::NotConfirmable { .. }));
    }

    #[tokio::test]
    async fn events_without_reservation_are_ignored() {
        let repo = Arc::new(ScriptedConfirm::new(vec![]));
        let counters = Counters::default();
        let p = ConfirmationProcessor::new(repo.clone(), counters.clone(), 5);

        p.handle_event(GatewayEvent::PaymentSucceeded {
            intent_id: "pi_1".to_string(),
            reservation_id: None,
        })
        .await
        .unwrap();
        p.handle_event(GatewayEvent::PaymentSucceeded {
            intent_id: "pi_2".to_string(),
            reservation_id: Some("not-a-uuid".to_string()),
        })
        .await
        .unwrap();
        p.handle_event(GatewayEvent::Other {
            event_type: "charge.refunded".to_string(),
        })
        .await
        .unwrap();

        assert!(repo.offered.lock().is_empty());
        assert_eq!(counters.confirmations_unknown.load(Ordering::Relaxed), 2);
    }
}
