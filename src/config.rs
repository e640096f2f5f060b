use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use validator::{Validate, ValidationError};

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_CURRENCY: &str = "USD";
const DEFAULT_RETURN_WINDOW_DAYS: i64 = 30;
const DEFAULT_WEBHOOK_TOLERANCE_SECS: u64 = 300;

/// Application configuration with validation.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Database connection URL (Postgres in production, SQLite for tests)
    pub database_url: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment ("development", "test", "production")
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Create missing tables on startup (development/test convenience)
    #[serde(default)]
    pub auto_migrate: bool,

    /// Comma-separated CORS origins; unset means permissive in development
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Payment gateway REST endpoint
    #[serde(default = "default_gateway_url")]
    pub payment_gateway_url: String,

    /// Secret API key for the payment gateway
    #[serde(default)]
    pub payment_gateway_api_key: Option<String>,

    /// Shared secret used to verify incoming payment webhooks
    #[serde(default)]
    pub payment_webhook_secret: Option<String>,

    /// Allowed clock skew for webhook signature timestamps, in seconds
    #[serde(default = "default_webhook_tolerance")]
    pub payment_webhook_tolerance_secs: u64,

    /// Email-service endpoint for outbound notifications; unset logs only
    #[serde(default)]
    pub notification_endpoint: Option<String>,

    /// Tax rate applied to the order subtotal at checkout (0.0 - 1.0)
    #[serde(default = "default_tax_rate")]
    #[validate(custom = "validate_tax_rate")]
    pub tax_rate: f64,

    /// Flat shipping cost for the standard method
    #[serde(default = "default_shipping_cost")]
    pub standard_shipping_cost: Decimal,

    /// Shipping cost for the express method
    #[serde(default = "default_express_shipping_cost")]
    pub express_shipping_cost: Decimal,

    /// Default currency for checkout
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Days after order creation during which a delivered order may be returned
    #[serde(default = "default_return_window")]
    pub return_window_days: i64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_gateway_url() -> String {
    "https://api.payments.example.com/v1".to_string()
}

fn default_webhook_tolerance() -> u64 {
    DEFAULT_WEBHOOK_TOLERANCE_SECS
}

fn default_tax_rate() -> f64 {
    0.0
}

fn default_shipping_cost() -> Decimal {
    Decimal::new(500, 2) // 5.00
}

fn default_express_shipping_cost() -> Decimal {
    Decimal::new(1500, 2) // 15.00
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_return_window() -> i64 {
    DEFAULT_RETURN_WINDOW_DAYS
}

impl AppConfig {
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Minimal configuration for tests and tooling.
    pub fn for_tests(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            host: "127.0.0.1".to_string(),
            port: 0,
            environment: "test".to_string(),
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: true,
            cors_allowed_origins: None,
            payment_gateway_url: default_gateway_url(),
            payment_gateway_api_key: None,
            payment_webhook_secret: Some("whsec_test_secret".to_string()),
            payment_webhook_tolerance_secs: default_webhook_tolerance(),
            notification_endpoint: None,
            tax_rate: 0.0,
            standard_shipping_cost: default_shipping_cost(),
            express_shipping_cost: default_express_shipping_cost(),
            currency: default_currency(),
            return_window_days: DEFAULT_RETURN_WINDOW_DAYS,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid configuration: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid = ["trace", "debug", "info", "warn", "error"];
    if valid.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

fn validate_tax_rate(rate: f64) -> Result<(), ValidationError> {
    if !rate.is_finite() || rate < 0.0 || rate > 1.0 {
        let mut err = ValidationError::new("tax_rate");
        err.message = Some("tax_rate must be a finite value between 0.0 and 1.0".into());
        return Err(err);
    }
    Ok(())
}

/// Loads application configuration.
///
/// Layers sources in this order:
/// 1. Default config (config/default.toml)
/// 2. Environment-specific config (config/{env}.toml)
/// 3. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let environment = env::var("APP__ENVIRONMENT").unwrap_or_else(|_| DEFAULT_ENV.to_string());

    let mut builder = Config::builder();

    let default_path = Path::new(CONFIG_DIR).join("default.toml");
    if default_path.exists() {
        builder = builder.add_source(File::from(default_path));
    }

    let env_path = Path::new(CONFIG_DIR).join(format!("{}.toml", environment));
    if env_path.exists() {
        builder = builder.add_source(File::from(env_path));
    }

    let cfg: AppConfig = builder
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?
        .try_deserialize()?;

    cfg.validate()?;
    Ok(cfg)
}

/// Initializes tracing using the provided log level as the default filter.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("storefront_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validates() {
        let cfg = AppConfig::for_tests("sqlite::memory:");
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.return_window_days, 30);
    }

    #[test]
    fn rejects_out_of_range_tax_rate() {
        let mut cfg = AppConfig::for_tests("sqlite::memory:");
        cfg.tax_rate = 1.5;
        assert!(cfg.validate().is_err());
        cfg.tax_rate = -0.1;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_unknown_log_level() {
        let mut cfg = AppConfig::for_tests("sqlite::memory:");
        cfg.log_level = "loud".to_string();
        assert!(cfg.validate().is_err());
    }
}
