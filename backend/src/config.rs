use std::str::FromStr;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Database connection string.
    pub database_url: String,

    /// Address the HTTP boundary listens on.
    pub bind_addr: String,

    // =========================
    // Hold configuration
    // =========================
    /// ISO currency code every reservation is priced in.
    pub currency: String,

    /// How long a HOLD keeps its tables while payment is pending.
    pub hold_duration_ms: u64,

    /// Commit attempts per hold request before surfacing a conflict.
    ///
    /// Each attempt re-reads the busy set, re-runs assignment and re-validates
    /// inside the commit transaction. Keep it small: the caller is waiting.
    pub hold_commit_max_attempts: u32,

    /// Base backoff between commit attempts. Doubles per attempt.
    pub hold_commit_backoff_ms: u64,

    // =========================
    // Payment configuration
    // =========================
    /// Upper bound on payment-intent creation. The hold fails closed past it.
    pub payment_timeout_ms: u64,

    /// Secret API key for Stripe. Absent outside production means the mock
    /// gateway is used.
    pub stripe_secret_key: Option<String>,

    /// Signing secret for webhook verification. Absent means every webhook
    /// delivery is answered with an internal error.
    pub stripe_webhook_secret: Option<String>,

    pub stripe_api_base: String,

    // =========================
    // Confirmation / expiry
    // =========================
    /// Fresh suffixes tried when a reservation number collides.
    pub number_max_attempts: u32,

    /// Cadence of the HOLD -> EXPIRED sweep.
    pub expiry_sweep_interval_ms: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://tablehold_dev.db?mode=rwc".to_string());

        Self {
            database_url,
            bind_addr: env_or("BIND_ADDR", "0.0.0.0:8080".to_string()),

            // Hold defaults: ten minute payment window.
            currency: env_or("RESERVATION_CURRENCY", "gbp".to_string()),
            hold_duration_ms: env_or("HOLD_DURATION_MS", 10 * 60 * 1_000),
            hold_commit_max_attempts: env_or("HOLD_COMMIT_MAX_ATTEMPTS", 4),
            hold_commit_backoff_ms: env_or("HOLD_COMMIT_BACKOFF_MS", 25),

            payment_timeout_ms: env_or("PAYMENT_TIMEOUT_MS", 10_000),
            stripe_secret_key: env_opt("STRIPE_SECRET_KEY"),
            stripe_webhook_secret: env_opt("STRIPE_WEBHOOK_SECRET"),
            stripe_api_base: env_or("STRIPE_API_BASE", "https://api.stripe.com".to_string()),

            number_max_attempts: env_or("RESERVATION_NUMBER_MAX_ATTEMPTS", 5),
            expiry_sweep_interval_ms: env_or("EXPIRY_SWEEP_INTERVAL_MS", 60_000),
        }
    }

    pub fn payment_timeout(&self) -> Duration {
        Duration::from_millis(self.payment_timeout_ms)
    }

    pub fn expiry_sweep_interval(&self) -> Duration {
        Duration::from_millis(self.expiry_sweep_interval_ms)
    }
}

impl Default for AppConfig {
    /// Defaults with no environment lookups. Used by tests.
    fn default() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            bind_addr: "127.0.0.1:0".to_string(),
            currency: "gbp".to_string(),
            hold_duration_ms: 10 * 60 * 1_000,
            hold_commit_max_attempts: 4,
            hold_commit_backoff_ms: 25,
            payment_timeout_ms: 10_000,
            stripe_secret_key: None,
            stripe_webhook_secret: None,
            stripe_api_base: "https://api.stripe.com".to_string(),
            number_max_attempts: 5,
            expiry_sweep_interval_ms: 60_000,
        }
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(key, value = %raw, "unparseable config value; using default");
                default
            }
        },
        Err(_) => default,
    }
}
