#![allow(dead_code)]

use std::sync::Arc;

use sqlx::AnyPool;
use sqlx::any::AnyPoolOptions;
use uuid::Uuid;

use backend::catalog::repository_sqlx::SqlxCatalog;
use backend::config::AppConfig;
use backend::db::schema::migrate;
use backend::metrics::counters::Counters;
use backend::payment::mock::MockPaymentGateway;
use backend::pricing::repository_sqlx::SqlxPriceLookup;
use backend::reservation::confirmation::ConfirmationProcessor;
use backend::reservation::ledger::HoldLedger;
use backend::reservation::repository_sqlx::SqlxReservationRepository;

pub const RESTAURANT: &str = "r-harbour";
pub const EVENT: &str = "ev-truffle-night";
pub const SLOT: &str = "slot-1900";
pub const SLOT_START: u64 = 4_102_444_800_000;
pub const SLOT_END: u64 = SLOT_START + 2 * 60 * 60 * 1_000;
pub const WEBHOOK_SECRET: &str = "whsec_integration";

/// Isolated, uniquely named in-memory SQLite database with the full schema.
pub async fn setup_db() -> AnyPool {
    sqlx::any::install_default_drivers();

    let db_name = Uuid::new_v4().to_string();
    let conn_str = format!("sqlite:file:{}?mode=memory&cache=shared", db_name);

    let pool = AnyPoolOptions::new()
        .max_connections(5)
        .connect(&conn_str)
        .await
        .unwrap();

    migrate(&pool).await.unwrap();
    pool
}

pub async fn seed_slot(pool: &AnyPool, slot_id: &str, start_ms: u64, end_ms: u64, active: bool) {
    sqlx::query("INSERT INTO slots (slot_id, event_id, start_ms, end_ms, active) VALUES (?, ?, ?, ?, ?)")
        .bind(slot_id)
        .bind(EVENT)
        .bind(start_ms as i64)
        .bind(end_ms as i64)
        .bind(i64::from(active))
        .execute(pool)
        .await
        .unwrap();
}

pub async fn seed_table(pool: &AnyPool, table_id: &str, seats: u32, join_group: Option<&str>) {
    sqlx::query(
        "INSERT INTO dining_tables (table_id, restaurant_id, name, seats, join_group, active) VALUES (?, ?, ?, ?, ?, 1)",
    )
    .bind(table_id)
    .bind(RESTAURANT)
    .bind(format!("Table {table_id}"))
    .bind(i64::from(seats))
    .bind(join_group.map(str::to_string))
    .execute(pool)
    .await
    .unwrap();
}

pub async fn seed_item(pool: &AnyPool, item_id: &str, unit_price: i64) {
    sqlx::query("INSERT INTO menu_items (item_id, restaurant_id, name, unit_price) VALUES (?, ?, ?, ?)")
        .bind(item_id)
        .bind(RESTAURANT)
        .bind(item_id.to_uppercase())
        .bind(unit_price)
        .execute(pool)
        .await
        .unwrap();
}

/// The default dining room: one bookable slot, a 2-top, a 4-top and a
/// tasting menu with a wine pairing.
pub async fn seed_default(pool: &AnyPool) {
    seed_slot(pool, SLOT, SLOT_START, SLOT_END, true).await;
    seed_table(pool, "t2", 2, None).await;
    seed_table(pool, "t4", 4, None).await;
    seed_item(pool, "tasting", 8_500).await;
    seed_item(pool, "pairing", 4_000).await;
}

pub fn test_config() -> AppConfig {
    AppConfig {
        hold_commit_backoff_ms: 2,
        hold_commit_max_attempts: 8,
        payment_timeout_ms: 200,
        stripe_webhook_secret: Some(WEBHOOK_SECRET.to_string()),
        ..AppConfig::default()
    }
}

pub struct Harness {
    pub pool: AnyPool,
    pub repo: Arc<SqlxReservationRepository>,
    pub gateway: Arc<MockPaymentGateway>,
    pub ledger: Arc<HoldLedger>,
    pub confirmations: Arc<ConfirmationProcessor>,
    pub counters: Counters,
}

pub fn harness(pool: AnyPool, config: AppConfig) -> Harness {
    let repo = Arc::new(SqlxReservationRepository::new(pool.clone()));
    let gateway = Arc::new(MockPaymentGateway::new(config.stripe_webhook_secret.clone()));
    let counters = Counters::default();

    let ledger = Arc::new(HoldLedger::new(
        Arc::new(SqlxCatalog::new(pool.clone())),
        Arc::new(SqlxPriceLookup::new(pool.clone())),
        repo.clone(),
        gateway.clone(),
        config.clone(),
        counters.clone(),
    ));
    let confirmations = Arc::new(ConfirmationProcessor::new(
        repo.clone(),
        counters.clone(),
        config.number_max_attempts,
    ));

    Harness {
        pool,
        repo,
        gateway,
        ledger,
        confirmations,
        counters,
    }
}

pub async fn count_rows(pool: &AnyPool, sql: &str) -> i64 {
    use sqlx::Row;
    sqlx::query(sql).fetch_one(pool).await.unwrap().get::<i64, _>(0)
}
