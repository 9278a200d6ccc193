use sqlx::AnyPool;

pub async fn migrate(pool: &AnyPool) -> anyhow::Result<()> {
    // Catalog: read-only to the reservation core
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS slots (
  slot_id TEXT PRIMARY KEY,
  event_id TEXT NOT NULL,
  start_ms BIGINT NOT NULL,
  end_ms BIGINT NOT NULL,
  active INTEGER NOT NULL CHECK (active IN (0,1))
);
"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS dining_tables (
  table_id TEXT PRIMARY KEY,
  restaurant_id TEXT NOT NULL,
  name TEXT NOT NULL,
  seats BIGINT NOT NULL CHECK (seats > 0),
  join_group TEXT,
  active INTEGER NOT NULL CHECK (active IN (0,1))
);
"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS menu_items (
  item_id TEXT PRIMARY KEY,
  restaurant_id TEXT NOT NULL,
  name TEXT NOT NULL,
  unit_price BIGINT NOT NULL CHECK (unit_price >= 0)
);
"#,
    )
    .execute(pool)
    .await?;

    // Reservations
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS reservations (
  reservation_id TEXT PRIMARY KEY,
  user_id TEXT NOT NULL,
  restaurant_id TEXT NOT NULL,
  event_id TEXT NOT NULL,
  slot_id TEXT NOT NULL,
  party_size BIGINT NOT NULL CHECK (party_size >= 1),
  status TEXT NOT NULL,
  hold_expires_ms BIGINT,
  total_amount BIGINT NOT NULL,
  currency TEXT NOT NULL,
  created_ms BIGINT NOT NULL,
  payment_intent_id TEXT NOT NULL,
  slot_start_ms BIGINT NOT NULL,
  slot_end_ms BIGINT NOT NULL,
  reservation_number TEXT,
  CHECK ((status = 'HOLD') = (hold_expires_ms IS NOT NULL))
);
"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS reservation_tables (
  reservation_id TEXT NOT NULL,
  table_id TEXT NOT NULL,
  position BIGINT NOT NULL,
  PRIMARY KEY (reservation_id, table_id)
);
"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS reservation_items (
  reservation_id TEXT NOT NULL,
  item_id TEXT NOT NULL,
  quantity BIGINT NOT NULL CHECK (quantity >= 1),
  unit_price BIGINT NOT NULL,
  PRIMARY KEY (reservation_id, item_id)
);
"#,
    )
    .execute(pool)
    .await?;

    // One guard row per restaurant. Every hold commit bumps it first so that
    // concurrent commits for the same restaurant serialise on this row.
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS restaurant_ledgers (
  restaurant_id TEXT PRIMARY KEY,
  version BIGINT NOT NULL
);
"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE INDEX IF NOT EXISTS idx_reservations_restaurant_status ON reservations(restaurant_id, status);"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(r#"CREATE INDEX IF NOT EXISTS idx_reservations_user ON reservations(user_id, created_ms);"#)
        .execute(pool)
        .await?;

    sqlx::query(
        r#"CREATE UNIQUE INDEX IF NOT EXISTS idx_reservations_number ON reservations(reservation_number);"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(r#"CREATE INDEX IF NOT EXISTS idx_tables_restaurant ON dining_tables(restaurant_id);"#)
        .execute(pool)
        .await?;

    sqlx::query(r#"CREATE INDEX IF NOT EXISTS idx_slots_event ON slots(event_id);"#)
        .execute(pool)
        .await?;

    Ok(())
}
