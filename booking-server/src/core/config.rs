use crate::pricing::refund::RefundSchedule;

/// Server configuration
///
/// # Environment variables
///
/// All settings can be overridden through environment variables:
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | WORK_DIR | /var/lib/booking | Working directory (database, logs) |
/// | MODIFICATION_WINDOW_HOURS | 48 | Guest changes blocked inside this window |
/// | CLAIM_TTL_MINUTES | 10 | Waitlist claim window |
/// | EXPIRY_SWEEP_SECS | 30 | Claim-expiry sweep interval |
/// | REFUND_RETRY_SECS | 60 | Pending-refund settlement interval |
/// | REFUND_MAX_ATTEMPTS | 5 | Settlement attempts before giving up |
/// | LIMITED_THRESHOLD | 0.30 | available/capacity ratio below which status is LIMITED |
/// | MAX_TXN_RETRIES | 3 | Bounded retries on transient storage errors |
/// | ENVIRONMENT | development | Runtime environment |
#[derive(Debug, Clone)]
pub struct Config {
    /// Working directory for the database file
    pub work_dir: String,
    /// Runtime environment: development | staging | production
    pub environment: String,
    /// Claim-expiry sweep interval (seconds)
    pub expiry_sweep_secs: u64,
    /// Pending-refund settlement interval (seconds)
    pub refund_retry_secs: u64,
    /// Business-rule knobs shared with the command layer
    pub policy: EnginePolicy,
}

/// Business-rule configuration threaded into command handlers
///
/// Centralizes the product's tunables: the modification window, the
/// claim TTL, the LIMITED threshold, and the refund tier table.
#[derive(Debug, Clone)]
pub struct EnginePolicy {
    /// Guest-initiated changes require at least this many hours to the event
    pub modification_window_hours: i64,
    /// How long a NOTIFIED waitlist entry may claim its spot (minutes)
    pub claim_ttl_minutes: i64,
    /// available/capacity ratio below which an instance reads LIMITED
    pub limited_threshold: f64,
    /// Bounded retries for transient storage failures
    pub max_txn_retries: u32,
    /// Settlement attempts per refund before the worker gives up
    pub refund_max_attempts: u32,
    /// Refund tier table
    pub refund_schedule: RefundSchedule,
}

impl Default for EnginePolicy {
    fn default() -> Self {
        Self {
            modification_window_hours: 48,
            claim_ttl_minutes: 10,
            limited_threshold: 0.30,
            max_txn_retries: 3,
            refund_max_attempts: 5,
            refund_schedule: RefundSchedule::default(),
        }
    }
}

impl EnginePolicy {
    /// Claim window in milliseconds
    pub fn claim_ttl_millis(&self) -> i64 {
        self.claim_ttl_minutes * 60_000
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset
    pub fn from_env() -> Self {
        let policy = EnginePolicy {
            modification_window_hours: env_parse("MODIFICATION_WINDOW_HOURS", 48),
            claim_ttl_minutes: env_parse("CLAIM_TTL_MINUTES", 10),
            limited_threshold: env_parse("LIMITED_THRESHOLD", 0.30),
            max_txn_retries: env_parse("MAX_TXN_RETRIES", 3),
            refund_max_attempts: env_parse("REFUND_MAX_ATTEMPTS", 5),
            refund_schedule: RefundSchedule::default(),
        };
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/booking".into()),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            expiry_sweep_secs: env_parse("EXPIRY_SWEEP_SECS", 30),
            refund_retry_secs: env_parse("REFUND_RETRY_SECS", 60),
            policy,
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
