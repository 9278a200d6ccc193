use std::sync::Arc;

use backend::{
    api::{AppState, create_router},
    catalog::repository_sqlx::SqlxCatalog,
    config::AppConfig,
    db::Db,
    error::AppError,
    logger::init_tracing,
    metrics::counters::Counters,
    payment::{PaymentGateway, mock::MockPaymentGateway, stripe::StripeGateway},
    pricing::repository_sqlx::SqlxPriceLookup,
    reservation::{
        confirmation::ConfirmationProcessor, expiry::ExpirySweeper, ledger::HoldLedger,
        repository::ReservationRepository, repository_sqlx::SqlxReservationRepository,
    },
};
use tokio::sync::watch;

/// Stripe when a key is configured. Outside production the in-process mock
/// stands in so the service can run without provider credentials.
fn build_gateway(cfg: &AppConfig, is_production: bool) -> Result<Arc<dyn PaymentGateway>, AppError> {
    match &cfg.stripe_secret_key {
        Some(key) => {
            let gw = StripeGateway::new(
                cfg.stripe_api_base.clone(),
                key.clone(),
                cfg.stripe_webhook_secret.clone(),
                cfg.payment_timeout(),
            )?;
            Ok(Arc::new(gw))
        }
        None if is_production => Err(AppError::Config(
            "STRIPE_SECRET_KEY is required in production".to_string(),
        )),
        None => {
            tracing::warn!("STRIPE_SECRET_KEY not set; using mock payment gateway");
            Ok(Arc::new(MockPaymentGateway::new(
                cfg.stripe_webhook_secret.clone(),
            )))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let is_production = std::env::var("APP_ENV").unwrap_or_default() == "production";
    init_tracing(is_production);

    tracing::info!("Starting tablehold backend...");

    let cfg = AppConfig::from_env();

    let db = Db::connect(&cfg.database_url).await?;
    db.migrate().await?;
    let pool = (*db.pool).clone();

    let gateway = build_gateway(&cfg, is_production)?;
    if cfg.stripe_webhook_secret.is_none() {
        tracing::warn!("STRIPE_WEBHOOK_SECRET not set; payment webhooks will be refused");
    }

    let counters = Counters::default();
    let reservations: Arc<dyn ReservationRepository> =
        Arc::new(SqlxReservationRepository::new(pool.clone()));

    let ledger = Arc::new(HoldLedger::new(
        Arc::new(SqlxCatalog::new(pool.clone())),
        Arc::new(SqlxPriceLookup::new(pool)),
        reservations.clone(),
        gateway.clone(),
        cfg.clone(),
        counters.clone(),
    ));
    let confirmations = Arc::new(ConfirmationProcessor::new(
        reservations.clone(),
        counters.clone(),
        cfg.number_max_attempts,
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = ExpirySweeper::new(reservations, counters, cfg.expiry_sweep_interval());
    let sweeper_task = tokio::spawn(sweeper.run(shutdown_rx));

    let app = create_router(AppState {
        ledger,
        confirmations,
        gateway,
    });

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!(addr = %cfg.bind_addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = ?e, "failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown signal received");
        })
        .await?;

    let _ = shutdown_tx.send(true);
    if let Err(e) = sweeper_task.await {
        tracing::error!(error = ?e, "expiry sweeper task failed");
    }

    Ok(())
}
