//! Configuration management for Trafficwatch
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `TRAFFICWATCH__<SECTION>__<KEY>` environment variables. The binary applies
//! its command-line overrides on top and calls [`Config::validate`] before
//! anything touches the network.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use lettre::Address;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "TRAFFICWATCH";

/// Default Cloudflare GraphQL analytics endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.cloudflare.com/client/v4/graphql";

/// A credential that never shows up in `Debug` output or logs.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    /// Wrap a raw credential
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Access the raw credential
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether no credential was supplied
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("\"\"")
        } else {
            f.write_str("\"***\"")
        }
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Metrics source configuration
    pub metrics: MetricsConfig,

    /// Lookback window configuration
    pub window: WindowConfig,

    /// Alert delivery configuration
    pub notification: NotificationConfig,

    /// In-process scheduling (`watch` command)
    pub schedule: ScheduleConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from defaults, an optional file and the environment.
    ///
    /// The result is not validated; call [`Config::validate`] once all
    /// overrides are applied.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder =
            ::config::Config::builder().add_source(::config::Config::try_from(&Self::default())?);

        if let Some(path) = path {
            if !path.exists() {
                return Err(Error::config(format!(
                    "config file {} does not exist",
                    path.display()
                )));
            }
            builder = builder.add_source(::config::File::from(path).required(true));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__"),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Apply explicit credential overrides (flags or legacy env vars).
    #[must_use]
    pub fn with_overrides(mut self, api_token: Option<String>, zone_tag: Option<String>) -> Self {
        if let Some(token) = api_token.filter(|t| !t.trim().is_empty()) {
            self.metrics.api_token = Secret::new(token);
        }
        if let Some(zone) = zone_tag.filter(|z| !z.trim().is_empty()) {
            self.metrics.zone_tag = zone;
        }
        self
    }

    /// Check every required field, failing on the first problem found.
    pub fn validate(&self) -> Result<()> {
        self.metrics.validate()?;
        self.window.validate()?;
        self.notification.validate()?;
        self.schedule.validate()?;
        Ok(())
    }
}

/// Metrics source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// GraphQL endpoint URL
    pub endpoint: String,
    /// Bearer token for the analytics API
    pub api_token: Secret,
    /// Zone identifier to query
    pub zone_tag: String,
    /// Host name whose requests are counted
    pub target_host: String,
    /// Upper bound on returned groups
    pub max_groups: u32,
    /// HTTP request timeout
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_token: Secret::default(),
            zone_tag: String::new(),
            target_host: String::new(),
            max_groups: 10_000,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl MetricsConfig {
    fn validate(&self) -> Result<()> {
        Url::parse(&self.endpoint)
            .map_err(|e| Error::config(format!("metrics.endpoint is not a valid URL: {e}")))?;
        if self.api_token.is_empty() {
            return Err(Error::config("metrics.api_token is not set"));
        }
        require("metrics.zone_tag", &self.zone_tag)?;
        require("metrics.target_host", &self.target_host)?;
        if self.max_groups == 0 {
            return Err(Error::config("metrics.max_groups must be greater than zero"));
        }
        if self.request_timeout.is_zero() {
            return Err(Error::config("metrics.request_timeout must be greater than zero"));
        }
        Ok(())
    }
}

/// Lookback window configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Trailing interval measured on every run
    #[serde(with = "humantime_serde")]
    pub lookback: Duration,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            lookback: Duration::from_secs(15 * 60),
        }
    }
}

impl WindowConfig {
    fn validate(&self) -> Result<()> {
        if self.lookback.is_zero() {
            return Err(Error::config("window.lookback must be greater than zero"));
        }
        Ok(())
    }
}

/// Alert delivery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Envelope and `From:` address
    pub sender: String,
    /// Display name used in the `From:` header
    pub sender_name: String,
    /// Envelope and `To:` address
    pub recipient: String,
    /// Mail relay endpoint accepting raw MIME messages
    pub relay_url: String,
    /// Optional bearer token for the relay
    pub relay_token: Secret,
    /// HTTP request timeout for the relay
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Send a "monitoring degraded" alert when the metrics query fails
    pub alert_on_query_failure: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            sender: String::new(),
            sender_name: "Cloudflare Alert".to_string(),
            recipient: String::new(),
            relay_url: String::new(),
            relay_token: Secret::default(),
            request_timeout: Duration::from_secs(30),
            alert_on_query_failure: false,
        }
    }
}

impl NotificationConfig {
    fn validate(&self) -> Result<()> {
        require_address("notification.sender", &self.sender)?;
        require_address("notification.recipient", &self.recipient)?;
        if self.sender_name.chars().any(char::is_control) {
            return Err(Error::config(
                "notification.sender_name must not contain control characters",
            ));
        }
        Ok(())
    }
}

/// Scheduling configuration for the `watch` command
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Time between two checks
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15 * 60),
        }
    }
}

impl ScheduleConfig {
    fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(Error::config("schedule.interval must be greater than zero"));
        }
        Ok(())
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log format (json or pretty)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::config(format!("{field} is not set")));
    }
    Ok(())
}

fn require_address(field: &str, value: &str) -> Result<()> {
    require(field, value)?;
    value
        .parse::<Address>()
        .map(|_| ())
        .map_err(|e| Error::config(format!("{field} is not an email address ({e}): {value:?}")))
}
