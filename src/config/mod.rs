//! Configuration loading and management
//!
//! The server reads a YAML file (`config/derlg.yaml`, or the path in
//! `DERLG_CONFIG`). Every field has a default, so a missing default file
//! simply yields the default configuration. A handful of environment
//! variables override the file for deployment:
//!
//! | Variable | Field |
//! |---|---|
//! | `DERLG_HOST` | `server.host` |
//! | `DERLG_PORT` | `server.port` |
//! | `DATABASE_URL` | `database.url` |
//! | `DERLG_WEBHOOK_SECRET` | `payments.webhook_secret` |

use crate::core::error::ConfigError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "config/derlg.yaml";

/// Complete server configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub pricing: PricingConfig,
    pub currency: CurrencyConfig,
    pub rate_limit: RateLimitConfig,
    pub scheduler: SchedulerConfig,
    pub payments: PaymentsConfig,
    pub logging: LoggingConfig,
    pub events: EventsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins; empty allows any origin
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            cors_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// MySQL connection string; the in-memory store is used when absent
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
        }
    }
}

/// Rates and thresholds of the pricing and refund rules
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// VAT applied after discounts
    pub tax_rate: f64,
    /// Discount for paying the whole stay upfront
    pub full_payment_discount: f64,
    /// Default upfront percentage of the deposit plan
    pub deposit_percentage: f64,
    pub min_deposit_percentage: f64,
    pub max_deposit_percentage: f64,
    pub student_discount_rate: f64,
    /// Cancelling at least this many days out refunds everything but the fee
    pub full_refund_days: i64,
    /// Cancelling at least this many days out refunds `partial_refund_rate`
    pub partial_refund_days: i64,
    pub partial_refund_rate: f64,
    pub processing_fee_rate: f64,
    pub modification_cutoff_hours: i64,
    /// The second milestone falls due this many days before check-in
    pub milestone_2_lead_days: i64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            tax_rate: 0.10,
            full_payment_discount: 0.05,
            deposit_percentage: 50.0,
            min_deposit_percentage: 50.0,
            max_deposit_percentage: 70.0,
            student_discount_rate: 0.10,
            full_refund_days: 30,
            partial_refund_days: 7,
            partial_refund_rate: 0.50,
            processing_fee_rate: 0.02,
            modification_cutoff_hours: 48,
            milestone_2_lead_days: 7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrencyConfig {
    pub usd_to_khr: f64,
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self { usd_to_khr: 4100.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub requests: usize,
    pub window_secs: u64,
    /// Stricter budget for `/api/auth/*`
    pub auth_requests: usize,
    pub auth_window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests: 100,
            window_secs: 15 * 60,
            auth_requests: 5,
            auth_window_secs: 15 * 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    /// Milestone reminders start this many days before the due date
    pub milestone_reminder_days: i64,
    /// Check-in reminders start this many hours before check-in
    pub check_in_reminder_hours: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 3600,
            milestone_reminder_days: 7,
            check_in_reminder_hours: 24,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PaymentsConfig {
    /// Shared secret expected in `X-Webhook-Secret`; webhooks are refused when unset
    pub webhook_secret: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive, overridden by `RUST_LOG`
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info,derlg=debug,tower_http=info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    pub capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self { capacity: 1024 }
    }
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        serde_yaml::from_str(&content).map_err(|e| {
            ConfigError::ParseError {
                file: Some(path.display().to_string()),
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| {
            ConfigError::ParseError {
                file: None,
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Resolve, read, override from the environment and validate
    pub fn load() -> Result<Self> {
        let explicit = std::env::var("DERLG_CONFIG").ok();
        let mut config = match &explicit {
            Some(path) => Self::from_yaml_file(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_yaml_file(DEFAULT_CONFIG_PATH)?
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply the environment overrides, reading variables through `lookup`
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(host) = lookup("DERLG_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("DERLG_PORT") {
            self.server.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                field: "server.port".to_string(),
                value: port.clone(),
                message: "expected a port number".to_string(),
            })?;
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = Some(url);
        }
        if let Some(secret) = lookup("DERLG_WEBHOOK_SECRET") {
            self.payments.webhook_secret = Some(secret);
        }
        Ok(())
    }

    /// Reject incoherent values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.pricing;
        let rate_fields = [
            ("pricing.tax_rate", p.tax_rate),
            ("pricing.full_payment_discount", p.full_payment_discount),
            ("pricing.student_discount_rate", p.student_discount_rate),
            ("pricing.partial_refund_rate", p.partial_refund_rate),
            ("pricing.processing_fee_rate", p.processing_fee_rate),
        ];
        for (field, value) in rate_fields {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(field, value, "must be between 0 and 1"));
            }
        }

        for (field, value) in [
            ("pricing.min_deposit_percentage", p.min_deposit_percentage),
            ("pricing.max_deposit_percentage", p.max_deposit_percentage),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(invalid(field, value, "must be between 0 and 100"));
            }
        }
        if p.min_deposit_percentage > p.max_deposit_percentage {
            return Err(invalid(
                "pricing.min_deposit_percentage",
                p.min_deposit_percentage,
                "must not exceed max_deposit_percentage",
            ));
        }
        if !(p.min_deposit_percentage..=p.max_deposit_percentage).contains(&p.deposit_percentage) {
            return Err(invalid(
                "pricing.deposit_percentage",
                p.deposit_percentage,
                "must lie within the deposit range",
            ));
        }
        if p.partial_refund_days > p.full_refund_days {
            return Err(invalid(
                "pricing.partial_refund_days",
                p.partial_refund_days,
                "must not exceed full_refund_days",
            ));
        }
        if self.currency.usd_to_khr <= 0.0 {
            return Err(invalid(
                "currency.usd_to_khr",
                self.currency.usd_to_khr,
                "must be positive",
            ));
        }
        if self.rate_limit.window_secs == 0 || self.rate_limit.auth_window_secs == 0 {
            return Err(invalid("rate_limit.window_secs", 0, "must be positive"));
        }
        if self.scheduler.interval_secs == 0 {
            return Err(invalid("scheduler.interval_secs", 0, "must be positive"));
        }
        Ok(())
    }
}

fn invalid(field: &str, value: impl ToString, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pricing.deposit_percentage, 50.0);
        assert_eq!(config.currency.usd_to_khr, 4100.0);
        assert_eq!(config.server.addr(), "0.0.0.0:5000");
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = AppConfig::from_yaml_str(
            r#"
server:
  port: 8080
pricing:
  deposit_percentage: 60
"#,
        )
        .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.pricing.deposit_percentage, 60.0);
        assert_eq!(config.pricing.tax_rate, 0.10);
    }

    #[test]
    fn test_from_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "scheduler:\n  interval_secs: 60").unwrap();
        let config = AppConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.scheduler.interval_secs, 60);

        assert!(AppConfig::from_yaml_file("/nonexistent/derlg.yaml").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("DERLG_PORT", "9000"),
            ("DATABASE_URL", "mysql://root@localhost/derlg"),
            ("DERLG_WEBHOOK_SECRET", "s3cret"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config
            .apply_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(
            config.database.url.as_deref(),
            Some("mysql://root@localhost/derlg")
        );
        assert_eq!(config.payments.webhook_secret.as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_bad_port_override() {
        let mut config = AppConfig::default();
        let err = config
            .apply_overrides(|k| (k == "DERLG_PORT").then(|| "http".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("server.port"));
    }

    #[test]
    fn test_validate_rejects_incoherent_deposit_range() {
        let mut config = AppConfig::default();
        config.pricing.min_deposit_percentage = 80.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.pricing.max_deposit_percentage = 120.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.pricing.deposit_percentage = 40.0;
        assert!(config.validate().is_err());
    }
}
