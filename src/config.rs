use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::env;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const CONFIG_DIR: &str = "config";
const DEFAULT_CART_STORAGE_PATH: &str = "vastra_cart.json";
const DEFAULT_SESSION_DURATION_SECS: u64 = 300; // 5 minute payment window
const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;
const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 10;
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Pricing rules applied by the cart store.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct PricingConfig {
    /// Orders strictly above this subtotal ship free.
    #[serde(default = "default_free_shipping_threshold")]
    pub free_shipping_threshold: Decimal,

    /// Flat shipping fee charged below the threshold.
    #[serde(default = "default_flat_shipping_fee")]
    pub flat_shipping_fee: Decimal,

    /// ISO 4217 currency code.
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            free_shipping_threshold: default_free_shipping_threshold(),
            flat_shipping_fee: default_flat_shipping_fee(),
            currency: default_currency(),
        }
    }
}

/// Direct-transfer (UPI) payment session settings.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct DirectTransferConfig {
    /// Merchant virtual payment address shown in the payment URI.
    #[validate(length(min = 3), custom = "validate_vpa")]
    pub payee_vpa: String,

    /// Merchant display name for the payment URI.
    #[validate(length(min = 1))]
    pub payee_name: String,

    /// How long a payment session stays open before expiring.
    #[serde(default = "default_session_duration_secs")]
    #[validate(range(min = 30, max = 1800))]
    pub session_duration_secs: u64,

    /// Interval between automatic order-status polls.
    #[serde(default = "default_poll_interval_secs")]
    #[validate(range(min = 2, max = 120))]
    pub poll_interval_secs: u64,
}

/// Hosted payment gateway settings.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Publishable key id handed to the hosted payment UI.
    #[validate(length(min = 1))]
    pub key_id: String,
}

/// Hosted backend connection settings.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// Base URL of the hosted commerce backend.
    #[validate(url)]
    pub base_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_backend_timeout_secs")]
    #[validate(range(min = 1, max = 120))]
    pub timeout_secs: u64,
}

/// Notification dispatch settings.
#[derive(Clone, Debug, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct NotificationConfig {
    /// Webhook receiving order-confirmation payloads. When unset, the
    /// logging dispatcher is used instead.
    #[validate(url)]
    pub webhook_url: Option<String>,
}

/// Checkout subsystem configuration with validation.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
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

    /// Path of the durable local cart snapshot.
    #[serde(default = "default_cart_storage_path")]
    pub cart_storage_path: String,

    /// Capacity of the event channel.
    #[serde(default = "default_event_channel_capacity")]
    #[validate(custom = "validate_event_channel_capacity")]
    pub event_channel_capacity: usize,

    #[serde(default)]
    #[validate]
    pub pricing: PricingConfig,

    #[validate]
    pub direct_transfer: DirectTransferConfig,

    #[validate]
    pub gateway: GatewayConfig,

    #[validate]
    pub backend: BackendConfig,

    #[serde(default)]
    #[validate]
    pub notifications: NotificationConfig,
}

#[derive(Debug, Error)]
pub enum CheckoutConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Default value functions
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

fn default_cart_storage_path() -> String {
    DEFAULT_CART_STORAGE_PATH.to_string()
}

fn default_free_shipping_threshold() -> Decimal {
    Decimal::from(2000)
}

fn default_flat_shipping_fee() -> Decimal {
    Decimal::from(200)
}

fn default_currency() -> String {
    "INR".to_string()
}

fn default_session_duration_secs() -> u64 {
    DEFAULT_SESSION_DURATION_SECS
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_backend_timeout_secs() -> u64 {
    DEFAULT_BACKEND_TIMEOUT_SECS
}

fn default_event_channel_capacity() -> usize {
    DEFAULT_EVENT_CHANNEL_CAPACITY
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

/// A virtual payment address looks like `merchant@bank`.
fn validate_vpa(vpa: &str) -> Result<(), ValidationError> {
    let mut parts = vpa.splitn(2, '@');
    let handle = parts.next().unwrap_or("");
    let provider = parts.next().unwrap_or("");
    if handle.is_empty() || provider.is_empty() {
        let mut err = ValidationError::new("payee_vpa");
        err.message = Some("Must be of the form handle@provider".into());
        return Err(err);
    }
    Ok(())
}

fn validate_event_channel_capacity(capacity: usize) -> Result<(), ValidationError> {
    if capacity == 0 {
        let mut err = ValidationError::new("event_channel_capacity");
        err.message = Some("event_channel_capacity must be greater than 0".into());
        return Err(err);
    }
    Ok(())
}

/// Loads configuration from `config/default`, `config/<environment>`, and
/// `VASTRA__`-prefixed environment variables, in increasing precedence.
pub fn load_config() -> Result<CheckoutConfig, CheckoutConfigError> {
    let run_env = env::var("RUN_ENV").unwrap_or_else(|_| DEFAULT_ENV.to_string());

    let builder = Config::builder()
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false));

    let config = builder
        .add_source(Environment::with_prefix("VASTRA").separator("__"))
        .build()?;

    let checkout_config: CheckoutConfig = config.try_deserialize()?;

    checkout_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        CheckoutConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(checkout_config)
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::fmt;

    let default_directive = format!("vastra_checkout={}", level);
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
