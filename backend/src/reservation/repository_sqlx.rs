use std::str::FromStr;

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use sqlx::any::AnyRow;
use sqlx::{AnyConnection, AnyPool, Row};
use tracing::{debug, warn};
use uuid::Uuid;

use corelib::models::{Commitment, Reservation, ReservationStatus, TimeWindow};
use corelib::overlap::{busy_tables, is_blocking};

use crate::catalog::repository_sqlx::non_negative;
use crate::db::is_unique_violation;
use crate::pricing::PricedLine;
use crate::reservation::model::{CancelOutcome, ConfirmOutcome, HoldCommit};
use crate::reservation::repository::ReservationRepository;

const RESERVATION_COLUMNS: &str = r#"
  reservation_id, user_id, restaurant_id, event_id, slot_id, party_size,
  status, hold_expires_ms, total_amount, currency, created_ms,
  payment_intent_id, slot_start_ms, slot_end_ms, reservation_number
"#;

/// SQLx-backed reservation storage.
///
/// Every mutation runs in one transaction scoped to a single reservation.
/// Hold commits and lapsed-hold confirmations additionally bump the
/// restaurant's guard row first, which serialises them per restaurant while
/// the busy set is re-read.
pub struct SqlxReservationRepository {
    pool: AnyPool,
}

impl SqlxReservationRepository {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReservationRepository for SqlxReservationRepository {
    async fn fetch_commitments(&self, restaurant_id: &str) -> anyhow::Result<Vec<Commitment>> {
        let mut conn = self.pool.acquire().await.context("acquire connection")?;
        load_commitments(&mut conn, restaurant_id).await
    }

    async fn commit_hold(
        &self,
        reservation: &Reservation,
        lines: &[PricedLine],
        now_ms: u64,
    ) -> anyhow::Result<HoldCommit> {
        let mut tx = self.pool.begin().await.context("begin hold commit")?;

        bump_ledger(&mut tx, &reservation.restaurant_id).await?;

        let commitments = load_commitments(&mut tx, &reservation.restaurant_id).await?;
        let busy = busy_tables(&commitments, &reservation.window, now_ms);

        let taken: Vec<String> = reservation
            .table_ids
            .iter()
            .filter(|t| busy.contains(*t))
            .cloned()
            .collect();

        if !taken.is_empty() {
            tx.rollback().await.context("rollback hold commit")?;
            debug!(
                reservation_id = %reservation.reservation_id,
                ?taken,
                "hold commit lost race for tables"
            );
            return Ok(HoldCommit::TablesTaken { table_ids: taken });
        }

        let rid = reservation.reservation_id.to_string();

        sqlx::query(
            r#"
INSERT INTO reservations (
  reservation_id, user_id, restaurant_id, event_id, slot_id, party_size,
  status, hold_expires_ms, total_amount, currency, created_ms,
  payment_intent_id, slot_start_ms, slot_end_ms, reservation_number
)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?);
"#,
        )
        .bind(&rid)
        .bind(&reservation.user_id)
        .bind(&reservation.restaurant_id)
        .bind(&reservation.event_id)
        .bind(&reservation.slot_id)
        .bind(i64::from(reservation.party_size))
        .bind(reservation.status.as_str())
        .bind(reservation.hold_expires_ms.map(u64_to_i64).transpose()?)
        .bind(reservation.total_amount)
        .bind(&reservation.currency)
        .bind(u64_to_i64(reservation.created_ms)?)
        .bind(&reservation.payment_intent_id)
        .bind(u64_to_i64(reservation.window.start_ms)?)
        .bind(u64_to_i64(reservation.window.end_ms)?)
        .bind(reservation.reservation_number.clone())
        .execute(&mut *tx)
        .await
        .context("insert reservation")?;

        for (position, table_id) in reservation.table_ids.iter().enumerate() {
            sqlx::query(
                r#"INSERT INTO reservation_tables (reservation_id, table_id, position) VALUES (?, ?, ?);"#,
            )
            .bind(&rid)
            .bind(table_id)
            .bind(position as i64)
            .execute(&mut *tx)
            .await
            .context("insert reservation table")?;
        }

        for line in lines {
            sqlx::query(
                r#"
INSERT INTO reservation_items (reservation_id, item_id, quantity, unit_price)
VALUES (?, ?, ?, ?);
"#,
            )
            .bind(&rid)
            .bind(&line.item_id)
            .bind(i64::from(line.quantity))
            .bind(line.unit_price)
            .execute(&mut *tx)
            .await
            .context("insert reservation item")?;
        }

        tx.commit().await.context("commit hold")?;

        Ok(HoldCommit::Committed)
    }

    async fn confirm(
        &self,
        reservation_id: &Uuid,
        reservation_number: &str,
        now_ms: u64,
    ) -> anyhow::Result<ConfirmOutcome> {
        let rid = reservation_id.to_string();
        let mut tx = self.pool.begin().await.context("begin confirm")?;

        let row = sqlx::query(
            r#"
SELECT restaurant_id, status, hold_expires_ms, slot_start_ms, slot_end_ms, reservation_number
FROM reservations
WHERE reservation_id = ?;
"#,
        )
        .bind(&rid)
        .fetch_optional(&mut *tx)
        .await
        .context("load reservation for confirm")?;

        let Some(row) = row else {
            tx.rollback().await.context("rollback confirm")?;
            return Ok(ConfirmOutcome::NotFound);
        };

        let status = parse_status(&row.get::<String, _>("status"))?;
        let hold_expires_ms = row
            .get::<Option<i64>, _>("hold_expires_ms")
            .map(|v| non_negative(v, "hold_expires_ms"))
            .transpose()?;

        match status {
            ReservationStatus::Confirmed => {
                tx.rollback().await.context("rollback confirm")?;
                return Ok(ConfirmOutcome::AlreadyConfirmed {
                    reservation_number: row.get::<Option<String>, _>("reservation_number"),
                });
            }
            ReservationStatus::Cancelled => {
                tx.rollback().await.context("rollback confirm")?;
                return Ok(ConfirmOutcome::NotConfirmable { status });
            }
            ReservationStatus::Hold if is_blocking(status, hold_expires_ms, now_ms) => {}
            ReservationStatus::Hold | ReservationStatus::Expired => {
                // The tables were released when the hold lapsed. Only confirm if
                // nobody has taken them since.
                let restaurant_id: String = row.get("restaurant_id");
                let window = TimeWindow::new(
                    non_negative(row.get("slot_start_ms"), "slot_start_ms")?,
                    non_negative(row.get("slot_end_ms"), "slot_end_ms")?,
                );

                bump_ledger(&mut tx, &restaurant_id).await?;

                let others: Vec<Commitment> = load_commitments(&mut tx, &restaurant_id)
                    .await?
                    .into_iter()
                    .filter(|c| c.reservation_id != *reservation_id)
                    .collect();
                let busy = busy_tables(&others, &window, now_ms);
                let own = load_table_ids(&mut tx, &rid).await?;

                if own.iter().any(|t| busy.contains(t)) {
                    tx.rollback().await.context("rollback confirm")?;
                    warn!(
                        reservation_id = %reservation_id,
                        "payment arrived for lapsed hold whose tables were re-assigned"
                    );
                    return Ok(ConfirmOutcome::NotConfirmable { status });
                }
            }
        }

        let updated = sqlx::query(
            r#"
UPDATE reservations
SET status = 'CONFIRMED', reservation_number = ?, hold_expires_ms = NULL
WHERE reservation_id = ? AND status <> 'CONFIRMED';
"#,
        )
        .bind(reservation_number)
        .bind(&rid)
        .execute(&mut *tx)
        .await;

        match updated {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                tx.rollback().await.context("rollback confirm")?;
                return Ok(ConfirmOutcome::NumberTaken);
            }
            Err(e) => return Err(anyhow::Error::new(e).context("confirm update failed")),
        }

        tx.commit().await.context("commit confirm")?;

        Ok(ConfirmOutcome::Confirmed {
            reservation_number: reservation_number.to_string(),
        })
    }

    async fn cancel_hold(
        &self,
        reservation_id: &Uuid,
        user_id: &str,
    ) -> anyhow::Result<CancelOutcome> {
        let rid = reservation_id.to_string();
        let mut tx = self.pool.begin().await.context("begin cancel")?;

        let row = sqlx::query(
            r#"SELECT user_id, status, payment_intent_id FROM reservations WHERE reservation_id = ?;"#,
        )
        .bind(&rid)
        .fetch_optional(&mut *tx)
        .await
        .context("load reservation for cancel")?;

        // Someone else's reservation is indistinguishable from a missing one.
        let Some(row) = row.filter(|r| r.get::<String, _>("user_id") == user_id) else {
            tx.rollback().await.context("rollback cancel")?;
            return Ok(CancelOutcome::NotFound);
        };

        let status = parse_status(&row.get::<String, _>("status"))?;
        if status != ReservationStatus::Hold {
            tx.rollback().await.context("rollback cancel")?;
            return Ok(CancelOutcome::NotHeld { status });
        }

        sqlx::query(
            r#"
UPDATE reservations
SET status = 'CANCELLED', hold_expires_ms = NULL
WHERE reservation_id = ? AND status = 'HOLD';
"#,
        )
        .bind(&rid)
        .execute(&mut *tx)
        .await
        .context("cancel update failed")?;

        tx.commit().await.context("commit cancel")?;

        Ok(CancelOutcome::Cancelled {
            payment_intent_id: row.get::<String, _>("payment_intent_id"),
        })
    }

    async fn expire_holds(&self, now_ms: u64) -> anyhow::Result<u64> {
        let res = sqlx::query(
            r#"
UPDATE reservations
SET status = 'EXPIRED', hold_expires_ms = NULL
WHERE status = 'HOLD' AND hold_expires_ms <= ?;
"#,
        )
        .bind(u64_to_i64(now_ms)?)
        .execute(&self.pool)
        .await
        .context("expire holds failed")?;

        Ok(res.rows_affected())
    }

    async fn fetch_by_id(&self, reservation_id: &Uuid) -> anyhow::Result<Option<Reservation>> {
        let mut conn = self.pool.acquire().await.context("acquire connection")?;
        let rid = reservation_id.to_string();

        let row = sqlx::query(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE reservation_id = ?;"
        ))
        .bind(&rid)
        .fetch_optional(&mut *conn)
        .await
        .context("reservation lookup failed")?;

        match row {
            Some(r) => {
                let tables = load_table_ids(&mut conn, &rid).await?;
                Ok(Some(row_to_reservation(&r, tables)?))
            }
            None => Ok(None),
        }
    }

    async fn list_for_user(
        &self,
        user_id: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<Reservation>> {
        let mut conn = self.pool.acquire().await.context("acquire connection")?;

        let rows = sqlx::query(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE user_id = ? \
             ORDER BY created_ms DESC, reservation_id LIMIT ?;"
        ))
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&mut *conn)
        .await
        .context("reservation listing failed")?;

        let mut out = Vec::with_capacity(rows.len());
        for r in rows {
            let rid: String = r.get("reservation_id");
            let tables = load_table_ids(&mut conn, &rid).await?;
            match row_to_reservation(&r, tables) {
                Ok(res) => out.push(res),
                Err(e) => {
                    // history is best-effort; one bad row should not hide the rest
                    warn!(error = %e, reservation_id = %rid, "skipping malformed reservation row");
                }
            }
        }

        Ok(out)
    }
}

/* =========================
Transaction helpers
========================= */

async fn bump_ledger(conn: &mut AnyConnection, restaurant_id: &str) -> anyhow::Result<()> {
    sqlx::query(
        r#"
INSERT INTO restaurant_ledgers (restaurant_id, version)
VALUES (?, 1)
ON CONFLICT (restaurant_id) DO UPDATE SET version = restaurant_ledgers.version + 1;
"#,
    )
    .bind(restaurant_id)
    .execute(&mut *conn)
    .await
    .context("bump restaurant ledger")?;

    Ok(())
}

/// Blocking-candidate rows for a restaurant, one `Commitment` per reservation.
///
/// A malformed row fails the whole read: skipping it could hide a table that
/// is actually taken.
async fn load_commitments(
    conn: &mut AnyConnection,
    restaurant_id: &str,
) -> anyhow::Result<Vec<Commitment>> {
    let rows = sqlx::query(
        r#"
SELECT r.reservation_id, r.status, r.hold_expires_ms, r.slot_start_ms, r.slot_end_ms, t.table_id
FROM reservations r
JOIN reservation_tables t ON t.reservation_id = r.reservation_id
WHERE r.restaurant_id = ? AND r.status IN ('HOLD', 'CONFIRMED')
ORDER BY r.reservation_id, t.position;
"#,
    )
    .bind(restaurant_id)
    .fetch_all(&mut *conn)
    .await
    .context("commitment scan failed")?;

    let mut out: Vec<Commitment> = Vec::new();

    for r in rows {
        let id_str: String = r.get("reservation_id");
        let reservation_id = Uuid::parse_str(&id_str).context("invalid reservation_id")?;
        let table_id: String = r.get("table_id");

        if let Some(last) = out.last_mut().filter(|c| c.reservation_id == reservation_id) {
            last.table_ids.push(table_id);
            continue;
        }

        out.push(Commitment {
            reservation_id,
            status: parse_status(&r.get::<String, _>("status"))?,
            hold_expires_ms: r
                .get::<Option<i64>, _>("hold_expires_ms")
                .map(|v| non_negative(v, "hold_expires_ms"))
                .transpose()?,
            window: TimeWindow::new(
                non_negative(r.get("slot_start_ms"), "slot_start_ms")?,
                non_negative(r.get("slot_end_ms"), "slot_end_ms")?,
            ),
            table_ids: vec![table_id],
        });
    }

    Ok(out)
}

async fn load_table_ids(conn: &mut AnyConnection, rid: &str) -> anyhow::Result<Vec<String>> {
    let rows = sqlx::query(
        r#"SELECT table_id FROM reservation_tables WHERE reservation_id = ? ORDER BY position;"#,
    )
    .bind(rid)
    .fetch_all(&mut *conn)
    .await
    .context("table assignment lookup failed")?;

    Ok(rows.iter().map(|r| r.get::<String, _>("table_id")).collect())
}

/* =========================
Row mapping + conversions
========================= */

fn row_to_reservation(r: &AnyRow, table_ids: Vec<String>) -> anyhow::Result<Reservation> {
    let id_str: String = r.get("reservation_id");
    let reservation_id = Uuid::parse_str(&id_str).context("invalid reservation_id")?;

    let party_size: i64 = r.get("party_size");
    if party_size < 1 || party_size > u32::MAX as i64 {
        return Err(anyhow!("party_size out of range: {party_size}"));
    }

    Ok(Reservation {
        reservation_id,
        user_id: r.get::<String, _>("user_id"),
        restaurant_id: r.get::<String, _>("restaurant_id"),
        event_id: r.get::<String, _>("event_id"),
        slot_id: r.get::<String, _>("slot_id"),
        party_size: party_size as u32,
        table_ids,
        status: parse_status(&r.get::<String, _>("status"))?,
        hold_expires_ms: r
            .get::<Option<i64>, _>("hold_expires_ms")
            .map(|v| non_negative(v, "hold_expires_ms"))
            .transpose()?,
        total_amount: r.get::<i64, _>("total_amount"),
        currency: r.get::<String, _>("currency"),
        created_ms: non_negative(r.get("created_ms"), "created_ms")?,
        payment_intent_id: r.get::<String, _>("payment_intent_id"),
        window: TimeWindow::new(
            non_negative(r.get("slot_start_ms"), "slot_start_ms")?,
            non_negative(r.get("slot_end_ms"), "slot_end_ms")?,
        ),
        reservation_number: r.get::<Option<String>, _>("reservation_number"),
    })
}

fn parse_status(raw: &str) -> anyhow::Result<ReservationStatus> {
    ReservationStatus::from_str(raw).map_err(|e| anyhow!(e))
}

fn u64_to_i64(v: u64) -> anyhow::Result<i64> {
    if v > i64::MAX as u64 {
        return Err(anyhow!("u64 too large for i64: {v}"));
    }
    Ok(v as i64)
}
