//! Application configuration management.

use std::time::Duration;

use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::Deserialize;

use crate::error::AppError;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Ledger engine configuration.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Daily aggregation schedule.
    #[serde(default)]
    pub aggregation: AggregationConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Whether ledger writes may use database transactions (session mode).
    ///
    /// When false, or when the startup probe fails, the store runs in
    /// best-effort mode.
    #[serde(default = "default_use_transactions")]
    pub use_transactions: bool,
}

fn default_max_connections() -> u32 {
    100
}

fn default_min_connections() -> u32 {
    10
}

fn default_use_transactions() -> bool {
    true
}

/// Ledger engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Upper bound for one atomic unit, in milliseconds.
    #[serde(default = "default_unit_timeout_ms")]
    pub unit_timeout_ms: u64,
    /// How long staff may reverse their own transactions, in hours.
    #[serde(default = "default_reversal_window_hours")]
    pub reversal_window_hours: u32,
    /// Capacity of the audit queue; entries beyond it are dropped.
    #[serde(default = "default_audit_queue_capacity")]
    pub audit_queue_capacity: usize,
}

fn default_unit_timeout_ms() -> u64 {
    5_000
}

fn default_reversal_window_hours() -> u32 {
    24
}

fn default_audit_queue_capacity() -> usize {
    1_024
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            unit_timeout_ms: default_unit_timeout_ms(),
            reversal_window_hours: default_reversal_window_hours(),
            audit_queue_capacity: default_audit_queue_capacity(),
        }
    }
}

impl LedgerConfig {
    /// Timeout applied around each atomic unit.
    #[must_use]
    pub const fn unit_timeout(&self) -> Duration {
        Duration::from_millis(self.unit_timeout_ms)
    }

    /// Staff reversal window.
    #[must_use]
    pub fn reversal_window(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.reversal_window_hours))
    }
}

/// Daily aggregation schedule.
#[derive(Debug, Clone, Deserialize)]
pub struct AggregationConfig {
    /// Local wall-clock time of the daily run (`HH:MM`).
    #[serde(default = "default_run_at")]
    pub run_at: String,
    /// IANA time zone that defines "local midnight".
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_run_at() -> String {
    "00:00".to_string()
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            run_at: default_run_at(),
            timezone: default_timezone(),
        }
    }
}

impl AggregationConfig {
    /// Parses `run_at`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if the value is not `HH:MM`.
    pub fn run_at_time(&self) -> Result<NaiveTime, AppError> {
        NaiveTime::parse_from_str(&self.run_at, "%H:%M")
            .map_err(|e| AppError::Validation(format!("aggregation.run_at '{}': {e}", self.run_at)))
    }

    /// Parses `timezone`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if the zone is unknown.
    pub fn tz(&self) -> Result<Tz, AppError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| AppError::Validation(format!("aggregation.timezone '{}': {e}", self.timezone)))
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Configuration` if configuration cannot be loaded.
    pub fn load() -> Result<Self, AppError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("CASHDESK").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_from_environment() {
        temp_env::with_vars(
            [
                ("CASHDESK__SERVER__PORT", Some("9090")),
                ("CASHDESK__DATABASE__URL", Some("postgres://localhost/cashdesk")),
                ("CASHDESK__DATABASE__USE_TRANSACTIONS", Some("false")),
                ("CASHDESK__LEDGER__UNIT_TIMEOUT_MS", Some("250")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.server.port, 9090);
                assert_eq!(config.server.host, "0.0.0.0");
                assert_eq!(config.database.url, "postgres://localhost/cashdesk");
                assert!(!config.database.use_transactions);
                assert_eq!(config.ledger.unit_timeout(), Duration::from_millis(250));
                assert_eq!(config.ledger.reversal_window_hours, 24);
                assert_eq!(config.aggregation.run_at, "00:00");
            },
        );
    }

    #[test]
    fn test_ledger_defaults() {
        let ledger = LedgerConfig::default();
        assert_eq!(ledger.unit_timeout(), Duration::from_secs(5));
        assert_eq!(ledger.reversal_window(), chrono::Duration::hours(24));
        assert_eq!(ledger.audit_queue_capacity, 1_024);
    }

    #[test]
    fn test_aggregation_parsing() {
        let aggregation = AggregationConfig {
            run_at: "23:30".to_string(),
            timezone: "Asia/Kolkata".to_string(),
        };
        assert_eq!(
            aggregation.run_at_time().unwrap(),
            NaiveTime::from_hms_opt(23, 30, 0).unwrap()
        );
        assert_eq!(aggregation.tz().unwrap(), chrono_tz::Asia::Kolkata);
    }

    #[test]
    fn test_aggregation_rejects_bad_values() {
        let aggregation = AggregationConfig {
            run_at: "midnight".to_string(),
            timezone: "Mars/Olympus".to_string(),
        };
        assert!(matches!(aggregation.run_at_time(), Err(AppError::Validation(_))));
        assert!(matches!(aggregation.tz(), Err(AppError::Validation(_))));
    }
}
