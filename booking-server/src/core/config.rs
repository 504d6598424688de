use rust_decimal::Decimal;
use std::path::PathBuf;

/// Default cancellation fee: 25.00
const DEFAULT_CANCELLATION_FEE: Decimal = Decimal::from_parts(2500, 0, 0, false, 2);

/// Server configuration
///
/// # Environment variables
///
/// Every field can be overridden via environment variable:
///
/// | Variable | Default | Purpose |
/// |----------|---------|---------|
/// | WORK_DIR | /var/lib/booking | Working directory (database, logs) |
/// | HTTP_PORT | 3000 | HTTP API port |
/// | ENVIRONMENT | development | Runtime environment |
/// | STRIPE_SECRET_KEY | (empty) | Payment provider API key |
/// | STRIPE_WEBHOOK_SECRET | (empty) | Webhook signing secret |
/// | CURRENCY | CAD | Default billing currency |
/// | CANCELLATION_FEE | 25.00 | Late-cancellation fee |
/// | FREE_CANCELLATION_HOURS | 24 | Free window before pickup |
///
/// # Example
///
/// ```ignore
/// WORK_DIR=/data/booking HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Working directory for the database and log files
    pub work_dir: String,
    /// HTTP API port
    pub http_port: u16,
    /// Runtime environment: development | staging | production
    pub environment: String,
    /// Payment provider secret key
    pub stripe_secret_key: String,
    /// Webhook endpoint signing secret
    pub stripe_webhook_secret: String,
    /// Default billing currency (ISO code)
    pub currency: String,
    /// Fixed fee charged for cancellation inside the fee window
    pub cancellation_fee: Decimal,
    /// Hours before pickup during which cancellation is free
    pub free_cancellation_hours: i64,
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/booking".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            stripe_secret_key: std::env::var("STRIPE_SECRET_KEY").unwrap_or_default(),
            stripe_webhook_secret: std::env::var("STRIPE_WEBHOOK_SECRET").unwrap_or_default(),
            currency: std::env::var("CURRENCY").unwrap_or_else(|_| "CAD".into()),
            cancellation_fee: std::env::var("CANCELLATION_FEE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_CANCELLATION_FEE),
            free_cancellation_hours: std::env::var("FREE_CANCELLATION_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(24),
        }
    }

    /// Override the work dir and port; used by tests
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config
    }

    /// Path of the embedded database file
    pub fn database_file(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("booking.redb")
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
