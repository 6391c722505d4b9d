use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const CONFIG_DIR: &str = "config";
const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:5000";
const DEFAULT_PROCESSOR_BASE_URL: &str = "https://production.wompi.co/v1";
const DEFAULT_STOREFRONT_ORIGIN: &str = "http://localhost:3000";
const DEFAULT_CURRENCY: &str = "COP";
const DEFAULT_PHONE_COUNTRY_PREFIX: &str = "57";
const DEFAULT_FREE_SHIPPING_THRESHOLD: i64 = 100_000;
const DEFAULT_FLAT_SHIPPING_FEE: i64 = 8_000;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;
const DEFAULT_ACCEPTANCE_TIMEOUT_SECS: u64 = 10;
const DEFAULT_ORDER_TIMEOUT_SECS: u64 = 15;
const DEFAULT_PAYMENT_TIMEOUT_SECS: u64 = 20;
const DEFAULT_REDIRECT_DELAY_MS: u64 = 1_500;

/// Keys that hold processor credentials. None of them has a built-in default.
const SECRET_KEYS: [&str; 3] = [
    "processor_private_key",
    "processor_public_key",
    "integrity_secret",
];

/// Storefront checkout configuration with validation
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct CheckoutConfig {
    /// Application environment
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Merchant backend base URL (orders, payment bridge, users)
    #[serde(default = "default_api_base_url")]
    #[validate(custom = "validate_base_url")]
    pub api_base_url: String,

    /// Product catalog base URL; falls back to `api_base_url` when unset
    #[serde(default)]
    pub catalog_base_url: Option<String>,

    /// Payment processor public API base URL
    #[serde(default = "default_processor_base_url")]
    #[validate(custom = "validate_base_url")]
    pub processor_base_url: String,

    /// Origin of the storefront, used for the order-status fallback redirect
    #[serde(default = "default_storefront_origin")]
    #[validate(custom = "validate_base_url")]
    pub storefront_origin: String,

    /// Processor merchant identifier
    #[validate(length(min = 1))]
    pub merchant_id: String,

    /// Processor private key, used as bearer for the merchant info endpoint
    #[validate(custom = "validate_secret")]
    pub processor_private_key: String,

    /// Processor public key, used as bearer for card tokenization
    #[validate(custom = "validate_secret")]
    pub processor_public_key: String,

    /// Shared integrity secret for transaction signatures
    #[validate(custom = "validate_secret")]
    pub integrity_secret: String,

    /// ISO 4217 currency code sent to the processor
    #[serde(default = "default_currency")]
    #[validate(length(equal = 3))]
    pub currency: String,

    /// International dialing prefix prepended to customer phone numbers
    #[serde(default = "default_phone_country_prefix")]
    #[validate(length(min = 1, max = 4))]
    pub phone_country_prefix: String,

    /// Subtotal above which shipping is free
    #[serde(default = "default_free_shipping_threshold")]
    #[validate(range(min = 0))]
    pub free_shipping_threshold: i64,

    /// Shipping fee charged at or below the threshold
    #[serde(default = "default_flat_shipping_fee")]
    #[validate(range(min = 0))]
    pub flat_shipping_fee: i64,

    /// Default timeout for merchant API calls (seconds)
    #[serde(default = "default_http_timeout_secs")]
    #[validate(range(min = 1))]
    pub http_timeout_secs: u64,

    #[serde(default = "default_acceptance_timeout_secs")]
    #[validate(range(min = 1))]
    pub acceptance_timeout_secs: u64,

    #[serde(default = "default_order_timeout_secs")]
    #[validate(range(min = 1))]
    pub order_timeout_secs: u64,

    #[serde(default = "default_payment_timeout_secs")]
    #[validate(range(min = 1))]
    pub payment_timeout_secs: u64,

    /// Pause between the success message and the redirect (milliseconds)
    #[serde(default = "default_redirect_delay_ms")]
    pub redirect_delay_ms: u64,
}

impl CheckoutConfig {
    /// Creates a configuration with defaults for everything except endpoints and credentials
    pub fn new(
        api_base_url: impl Into<String>,
        processor_base_url: impl Into<String>,
        merchant_id: impl Into<String>,
        processor_private_key: impl Into<String>,
        processor_public_key: impl Into<String>,
        integrity_secret: impl Into<String>,
    ) -> Self {
        Self {
            environment: default_environment(),
            log_level: default_log_level(),
            log_json: false,
            api_base_url: api_base_url.into(),
            catalog_base_url: None,
            processor_base_url: processor_base_url.into(),
            storefront_origin: default_storefront_origin(),
            merchant_id: merchant_id.into(),
            processor_private_key: processor_private_key.into(),
            processor_public_key: processor_public_key.into(),
            integrity_secret: integrity_secret.into(),
            currency: default_currency(),
            phone_country_prefix: default_phone_country_prefix(),
            free_shipping_threshold: default_free_shipping_threshold(),
            flat_shipping_fee: default_flat_shipping_fee(),
            http_timeout_secs: default_http_timeout_secs(),
            acceptance_timeout_secs: default_acceptance_timeout_secs(),
            order_timeout_secs: default_order_timeout_secs(),
            payment_timeout_secs: default_payment_timeout_secs(),
            redirect_delay_ms: default_redirect_delay_ms(),
        }
    }

    /// Checks if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Catalog base URL, defaulting to the merchant API
    pub fn catalog_base_url(&self) -> &str {
        self.catalog_base_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(&self.api_base_url)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn acceptance_timeout(&self) -> Duration {
        Duration::from_secs(self.acceptance_timeout_secs)
    }

    pub fn order_timeout(&self) -> Duration {
        Duration::from_secs(self.order_timeout_secs)
    }

    pub fn payment_timeout(&self) -> Duration {
        Duration::from_secs(self.payment_timeout_secs)
    }

    pub fn redirect_delay(&self) -> Duration {
        Duration::from_millis(self.redirect_delay_ms)
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.is_production() && !self.processor_base_url.starts_with("https://") {
            let mut err = ValidationError::new("processor_base_url_insecure");
            err.message = Some("The payment processor must be reached over HTTPS in production".into());
            errors.add("processor_base_url", err);
        }

        // Test-mode keys against the production processor are always a misconfiguration
        if self.is_production()
            && (self.processor_private_key.starts_with("prv_test_")
                || self.processor_public_key.starts_with("pub_test_"))
        {
            let mut err = ValidationError::new("processor_keys_test_mode");
            err.message = Some("Sandbox processor keys must not be used in production".into());
            errors.add("processor_private_key", err);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum CheckoutConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_processor_base_url() -> String {
    DEFAULT_PROCESSOR_BASE_URL.to_string()
}

fn default_storefront_origin() -> String {
    DEFAULT_STOREFRONT_ORIGIN.to_string()
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_phone_country_prefix() -> String {
    DEFAULT_PHONE_COUNTRY_PREFIX.to_string()
}

fn default_free_shipping_threshold() -> i64 {
    DEFAULT_FREE_SHIPPING_THRESHOLD
}

fn default_flat_shipping_fee() -> i64 {
    DEFAULT_FLAT_SHIPPING_FEE
}

fn default_http_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

fn default_acceptance_timeout_secs() -> u64 {
    DEFAULT_ACCEPTANCE_TIMEOUT_SECS
}

fn default_order_timeout_secs() -> u64 {
    DEFAULT_ORDER_TIMEOUT_SECS
}

fn default_payment_timeout_secs() -> u64 {
    DEFAULT_PAYMENT_TIMEOUT_SECS
}

fn default_redirect_delay_ms() -> u64 {
    DEFAULT_REDIRECT_DELAY_MS
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

fn validate_base_url(value: &str) -> Result<(), ValidationError> {
    match url::Url::parse(value) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        _ => {
            let mut err = ValidationError::new("base_url");
            err.message = Some("Must be an absolute http(s) URL".into());
            Err(err)
        }
    }
}

fn validate_secret(secret: &str) -> Result<(), ValidationError> {
    let trimmed = secret.trim();

    if trimmed.is_empty() {
        let mut err = ValidationError::new("secret_empty");
        err.message = Some("Processor credentials must not be empty".into());
        return Err(err);
    }

    const DISALLOWED: [&str; 3] = ["changeme", "your-secret-key", "CHANGE_THIS_SECRET"];
    if DISALLOWED
        .iter()
        .any(|&bad| trimmed.eq_ignore_ascii_case(bad))
    {
        let mut err = ValidationError::new("secret_placeholder");
        err.message = Some("Processor credentials must be overridden with real values".into());
        return Err(err);
    }

    Ok(())
}

/// Loads checkout configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults (never for credentials)
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<CheckoutConfig, CheckoutConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());

    load_config_from(Path::new(CONFIG_DIR), &run_env)
}

/// Loads configuration from an explicit directory and profile name
pub fn load_config_from(
    config_dir: &Path,
    run_env: &str,
) -> Result<CheckoutConfig, CheckoutConfigError> {
    info!("Loading configuration for environment: {}", run_env);

    if !config_dir.exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            config_dir.display()
        );
    }

    let config = Config::builder()
        .set_default("environment", run_env)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(
            File::with_name(&format!("{}/default", config_dir.display())).required(false),
        )
        .add_source(
            File::with_name(&format!("{}/{}", config_dir.display(), run_env)).required(false),
        )
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    // Credentials have no fallback: report every missing one up front
    let missing: Vec<&str> = SECRET_KEYS
        .iter()
        .copied()
        .chain(std::iter::once("merchant_id"))
        .filter(|key| config.get_string(key).is_err())
        .collect();
    if !missing.is_empty() {
        error!(
            "Processor credentials are not configured: {}. Set them via APP__<KEY> environment variables.",
            missing.join(", ")
        );
        return Err(CheckoutConfigError::Load(ConfigError::NotFound(format!(
            "{} required but not configured",
            missing.join(", ")
        ))));
    }

    let checkout_config: CheckoutConfig = config.try_deserialize()?;

    checkout_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        CheckoutConfigError::Validation(e)
    })?;

    checkout_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration security validation failed: {:?}", e);
        CheckoutConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(checkout_config)
}
