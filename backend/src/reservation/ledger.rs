use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use rand::Rng;
use tracing::{Span, debug, field, info, instrument, warn};
use uuid::Uuid;

use corelib::assignment::{Assignment, assign_tables};
use corelib::models::{Reservation, ReservationStatus, Slot, Table};

use crate::catalog::Catalog;
use crate::config::AppConfig;
use crate::db::is_transient;
use crate::error::AppError;
use crate::logger::warn_if_slow;
use crate::metrics::counters::Counters;
use crate::payment::errors::GatewayError;
use crate::payment::{IntentMetadata, IntentRequest, PaymentGateway, PaymentIntent};
use crate::pricing::{PriceLookup, quote};
use crate::reservation::model::{CancelOutcome, HoldCommit, HoldReceipt, HoldRequest};
use crate::reservation::overlap::OverlapIndex;
use crate::reservation::repository::ReservationRepository;
use crate::time::now_ms;

/// Creates, lists and releases holds.
///
/// A hold is: price the order, pick tables from a fresh busy set, open a
/// payment intent, then commit. The commit re-validates the chosen tables
/// inside one transaction; if another commit got there first the tables are
/// re-picked and the commit retried, up to `hold_commit_max_attempts`.
pub struct HoldLedger {
    catalog: Arc<dyn Catalog>,
    prices: Arc<dyn PriceLookup>,
    reservations: Arc<dyn ReservationRepository>,
    overlap: OverlapIndex,
    gateway: Arc<dyn PaymentGateway>,
    config: AppConfig,
    counters: Counters,
}

impl HoldLedger {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        prices: Arc<dyn PriceLookup>,
        reservations: Arc<dyn ReservationRepository>,
        gateway: Arc<dyn PaymentGateway>,
        config: AppConfig,
        counters: Counters,
    ) -> Self {
        Self {
            catalog,
            prices,
            overlap: OverlapIndex::new(reservations.clone()),
            reservations,
            gateway,
            config,
            counters,
        }
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    #[instrument(
        skip(self, req),
        target = "ledger",
        fields(
            restaurant_id = %req.restaurant_id,
            slot_id = %req.slot_id,
            party_size = req.party_size,
            reservation_id = field::Empty
        )
    )]
    pub async fn create_hold(&self, req: HoldRequest) -> Result<HoldReceipt, AppError> {
        let slot = self.bookable_slot(&req).await?;

        let item_ids: Vec<String> = req.items.iter().map(|i| i.item_id.clone()).collect();
        let prices = warn_if_slow("db_unit_prices", Duration::from_millis(100), async {
            self.prices.unit_prices(&req.restaurant_id, &item_ids).await
        })
        .await?;
        let quote = quote(&req.items, &prices)?;

        let tables = warn_if_slow("db_active_tables", Duration::from_millis(100), async {
            self.catalog.fetch_active_tables(&req.restaurant_id).await
        })
        .await?;

        // Fail on capacity before anything is charged.
        let mut assignment = self.pick_tables(&req, &slot, &tables).await?;

        let reservation_id = Uuid::new_v4();
        Span::current().record("reservation_id", field::display(&reservation_id));

        let intent = self
            .open_intent(&req, reservation_id, quote.total_amount)
            .await?;

        let max_attempts = self.config.hold_commit_max_attempts.max(1);
        for attempt in 1..=max_attempts {
            let now = now_ms();
            let hold_expires_ms = now + self.config.hold_duration_ms;

            let reservation = Reservation {
                reservation_id,
                user_id: req.user_id.clone(),
                restaurant_id: req.restaurant_id.clone(),
                event_id: req.event_id.clone(),
                slot_id: req.slot_id.clone(),
                party_size: req.party_size,
                table_ids: assignment.table_ids(),
                status: ReservationStatus::Hold,
                hold_expires_ms: Some(hold_expires_ms),
                total_amount: quote.total_amount,
                currency: self.config.currency.clone(),
                created_ms: now,
                payment_intent_id: intent.intent_id.clone(),
                window: slot.window(),
                reservation_number: None,
            };

            let committed = warn_if_slow("db_commit_hold", Duration::from_millis(100), async {
                self.reservations
                    .commit_hold(&reservation, &quote.lines, now)
                    .await
            })
            .await;

            match committed {
                Ok(HoldCommit::Committed) => {
                    self.counters.holds_created.fetch_add(1, Ordering::Relaxed);
                    info!(
                        attempt,
                        tables = ?reservation.table_ids,
                        total_amount = quote.total_amount,
                        "hold committed"
                    );
                    return Ok(HoldReceipt {
                        reservation_id,
                        table_ids: reservation.table_ids,
                        total_amount: quote.total_amount,
                        currency: reservation.currency,
                        hold_expires_ms,
                        payment_client_secret: intent.client_secret,
                    });
                }
                Ok(HoldCommit::TablesTaken { table_ids }) => {
                    debug!(attempt, ?table_ids, "chosen tables taken concurrently");
                }
                Err(e) if is_transient(&e) => {
                    debug!(attempt, error = %e, "transient storage error during hold commit");
                }
                Err(e) => {
                    self.release_intent(&intent).await;
                    return Err(AppError::Storage(e.context("hold commit failed")));
                }
            }

            if attempt == max_attempts {
                break;
            }

            self.counters
                .hold_commit_retries
                .fetch_add(1, Ordering::Relaxed);
            tokio::time::sleep(self.backoff(attempt)).await;

            assignment = match self.pick_tables(&req, &slot, &tables).await {
                Ok(a) => a,
                // keep the previous pick; the commit re-validates it anyway
                Err(AppError::Storage(e)) if is_transient(&e) => {
                    debug!(attempt, error = %e, "transient storage error re-reading busy set");
                    assignment
                }
                Err(e) => {
                    self.release_intent(&intent).await;
                    return Err(e);
                }
            };
        }

        self.counters
            .holds_conflict_exhausted
            .fetch_add(1, Ordering::Relaxed);
        warn!(max_attempts, "hold commit retries exhausted");
        self.release_intent(&intent).await;

        Err(AppError::Conflict(
            "tables changed while the hold was being placed; retry the request".to_string(),
        ))
    }

    /// Releases a HOLD owned by `user_id` before it lapses.
    #[instrument(skip(self), target = "ledger", fields(reservation_id = %reservation_id))]
    pub async fn cancel_hold(&self, reservation_id: &Uuid, user_id: &str) -> Result<(), AppError> {
        let outcome = warn_if_slow("db_cancel_hold", Duration::from_millis(100), async {
            self.reservations.cancel_hold(reservation_id, user_id).await
        })
        .await?;

        match outcome {
            CancelOutcome::Cancelled { payment_intent_id } => {
                self.counters.holds_cancelled.fetch_add(1, Ordering::Relaxed);
                info!("hold cancelled");

                if let Err(e) = self.gateway.cancel_intent(&payment_intent_id).await {
                    warn!(error = %e, intent_id = %payment_intent_id, "intent cancel after hold release failed");
                }
                Ok(())
            }
            CancelOutcome::NotFound => Err(AppError::NotFound(format!(
                "reservation {reservation_id}"
            ))),
            CancelOutcome::NotHeld { status } => Err(AppError::Conflict(format!(
                "reservation is {status}, only HOLD can be cancelled"
            ))),
        }
    }

    #[instrument(skip(self), target = "ledger")]
    pub async fn list_for_user(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<Reservation>, AppError> {
        let rows = warn_if_slow("db_list_for_user", Duration::from_millis(200), async {
            self.reservations.list_for_user(user_id, limit).await
        })
        .await?;
        Ok(rows)
    }

    #[instrument(skip(self), target = "catalog")]
    pub async fn list_slots(&self, event_id: &str) -> Result<Vec<Slot>, AppError> {
        let slots = self.catalog.fetch_active_slots(event_id).await?;
        Ok(slots)
    }

    async fn bookable_slot(&self, req: &HoldRequest) -> Result<Slot, AppError> {
        let slot = warn_if_slow("db_fetch_slot", Duration::from_millis(50), async {
            self.catalog.fetch_slot(&req.slot_id).await
        })
        .await?;

        let slot = match slot {
            Some(s) if s.active => s,
            _ => return Err(AppError::NotFound(format!("slot {}", req.slot_id))),
        };

        if slot.event_id != req.event_id {
            return Err(AppError::Validation(format!(
                "slot {} does not belong to event {}",
                slot.slot_id, req.event_id
            )));
        }
        if slot.window().is_empty() {
            return Err(AppError::Validation(format!(
                "slot {} has an empty time window",
                slot.slot_id
            )));
        }

        Ok(slot)
    }

    async fn pick_tables(
        &self,
        req: &HoldRequest,
        slot: &Slot,
        tables: &[Table],
    ) -> Result<Assignment, AppError> {
        let busy = self
            .overlap
            .busy_tables(&req.restaurant_id, &slot.window(), now_ms())
            .await?;

        assign_tables(tables, &busy, req.party_size).map_err(|e| {
            self.counters.holds_no_tables.fetch_add(1, Ordering::Relaxed);
            debug!(busy = busy.len(), "no table or pair fits the party");
            AppError::from(e)
        })
    }

    async fn open_intent(
        &self,
        req: &HoldRequest,
        reservation_id: Uuid,
        amount: i64,
    ) -> Result<PaymentIntent, AppError> {
        let intent_req = IntentRequest {
            amount,
            currency: self.config.currency.clone(),
            metadata: IntentMetadata {
                reservation_id,
                restaurant_id: req.restaurant_id.clone(),
                event_id: req.event_id.clone(),
                slot_id: req.slot_id.clone(),
                user_id: req.user_id.clone(),
            },
        };

        let timeout = self.config.payment_timeout();
        let created = tokio::time::timeout(timeout, self.gateway.create_intent(&intent_req))
            .await
            .unwrap_or(Err(GatewayError::Timeout(self.config.payment_timeout_ms)));

        created.map_err(|e| {
            self.counters
                .holds_gateway_failed
                .fetch_add(1, Ordering::Relaxed);
            warn!(error = %e, "payment intent creation failed; no hold written");
            AppError::Gateway(e)
        })
    }

    async fn release_intent(&self, intent: &PaymentIntent) {
        if let Err(e) = self.gateway.cancel_intent(&intent.intent_id).await {
            warn!(error = %e, intent_id = %intent.intent_id, "orphaned payment intent could not be cancelled");
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let base = self.config.hold_commit_backoff_ms;
        let exp = base.saturating_mul(1u64 << (attempt - 1).min(6));
        let jitter = rand::thread_rng().gen_range(0..=base);
        Duration::from_millis(exp + jitter)
    }
}
