use anyhow::{Context, anyhow};
use async_trait::async_trait;
use sqlx::{AnyPool, Row};

use corelib::models::{Slot, Table};

use crate::catalog::Catalog;

/// SQLx-backed catalog. Responsible only for queries and row mapping.
pub struct SqlxCatalog {
    pool: AnyPool,
}

impl SqlxCatalog {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Catalog for SqlxCatalog {
    async fn fetch_slot(&self, slot_id: &str) -> anyhow::Result<Option<Slot>> {
        let row = sqlx::query(
            r#"
SELECT slot_id, event_id, start_ms, end_ms, active
FROM slots
WHERE slot_id = ?;
"#,
        )
        .bind(slot_id)
        .fetch_optional(&self.pool)
        .await
        .context("slot lookup failed")?;

        row.as_ref().map(row_to_slot).transpose()
    }

    async fn fetch_active_tables(&self, restaurant_id: &str) -> anyhow::Result<Vec<Table>> {
        let rows = sqlx::query(
            r#"
SELECT table_id, restaurant_id, name, seats, join_group, active
FROM dining_tables
WHERE restaurant_id = ? AND active = 1
ORDER BY table_id;
"#,
        )
        .bind(restaurant_id)
        .fetch_all(&self.pool)
        .await
        .context("table lookup failed")?;

        let mut out = Vec::with_capacity(rows.len());
        for r in rows {
            match row_to_table(&r) {
                Ok(t) => out.push(t),
                Err(e) => {
                    // A broken table row must not take the whole restaurant offline.
                    tracing::warn!(error = %e, restaurant_id, "skipping malformed table row");
                }
            }
        }

        Ok(out)
    }

    async fn fetch_active_slots(&self, event_id: &str) -> anyhow::Result<Vec<Slot>> {
        let rows = sqlx::query(
            r#"
SELECT slot_id, event_id, start_ms, end_ms, active
FROM slots
WHERE event_id = ? AND active = 1
ORDER BY start_ms, slot_id;
"#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await
        .context("slot listing failed")?;

        rows.iter().map(row_to_slot).collect()
    }
}

/* =========================
Row mapping
========================= */

fn row_to_slot(r: &sqlx::any::AnyRow) -> anyhow::Result<Slot> {
    let start_ms = non_negative(r.get("start_ms"), "start_ms")?;
    let end_ms = non_negative(r.get("end_ms"), "end_ms")?;

    Ok(Slot {
        slot_id: r.get::<String, _>("slot_id"),
        event_id: r.get::<String, _>("event_id"),
        start_ms,
        end_ms,
        active: r.get::<i64, _>("active") == 1,
    })
}

fn row_to_table(r: &sqlx::any::AnyRow) -> anyhow::Result<Table> {
    let table_id: String = r.get("table_id");
    let seats: i64 = r.get("seats");
    if seats <= 0 || seats > u32::MAX as i64 {
        return Err(anyhow!("table {table_id} has invalid seat count {seats}"));
    }

    Ok(Table {
        table_id,
        restaurant_id: r.get::<String, _>("restaurant_id"),
        name: r.get::<String, _>("name"),
        seats: seats as u32,
        join_group: r.get::<Option<String>, _>("join_group"),
        active: r.get::<i64, _>("active") == 1,
    })
}

pub(crate) fn non_negative(v: i64, field: &str) -> anyhow::Result<u64> {
    if v < 0 {
        return Err(anyhow!("negative value for {field}: {v}"));
    }
    Ok(v as u64)
}
