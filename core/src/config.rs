//! Client configuration.
//!
//! All knobs are fixed when the client is built; there is no per-call
//! override. Values come from code (chainable setters), from JSON via serde
//! (durations as `*_ms` integers), or from `NETWORKING_*` environment
//! variables.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Secondary resolver consulted when the system resolver fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DnsFallback {
    /// Surface the system resolver's failure directly.
    None,
    /// Google public DNS (8.8.8.8, 8.8.4.4).
    #[default]
    Google,
    /// Cloudflare public DNS (1.1.1.1, 1.0.0.1).
    Cloudflare,
}

impl std::str::FromStr for DnsFallback {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "off" => Ok(DnsFallback::None),
            "google" => Ok(DnsFallback::Google),
            "cloudflare" => Ok(DnsFallback::Cloudflare),
            other => Err(ConfigError::Invalid {
                key: "dns_fallback".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value `{value}` for {key}")]
    Invalid { key: String, value: String },
}

/// Timeouts, retry and DNS settings for a `Networking` client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkingConfig {
    #[serde(rename = "connect_timeout_ms", with = "millis")]
    pub connect_timeout: Duration,
    #[serde(rename = "read_timeout_ms", with = "millis")]
    pub read_timeout: Duration,
    #[serde(rename = "write_timeout_ms", with = "millis")]
    pub write_timeout: Duration,
    /// Retry once when the connection could not be established.
    pub retry_on_connection_failure: bool,
    pub dns_fallback: DnsFallback,
}

impl Default for NetworkingConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_TIMEOUT,
            read_timeout: DEFAULT_TIMEOUT,
            write_timeout: DEFAULT_TIMEOUT,
            retry_on_connection_failure: true,
            dns_fallback: DnsFallback::default(),
        }
    }
}

impl NetworkingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read overrides from `NETWORKING_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup; unset keys keep defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(v) = lookup("NETWORKING_CONNECT_TIMEOUT_MS") {
            config.connect_timeout = parse_millis("NETWORKING_CONNECT_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("NETWORKING_READ_TIMEOUT_MS") {
            config.read_timeout = parse_millis("NETWORKING_READ_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("NETWORKING_WRITE_TIMEOUT_MS") {
            config.write_timeout = parse_millis("NETWORKING_WRITE_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("NETWORKING_RETRY_ON_CONNECTION_FAILURE") {
            config.retry_on_connection_failure =
                parse_bool("NETWORKING_RETRY_ON_CONNECTION_FAILURE", &v)?;
        }
        if let Some(v) = lookup("NETWORKING_DNS_FALLBACK") {
            config.dns_fallback = v.parse()?;
        }
        Ok(config)
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set connect, read and write timeouts to the same value.
    pub fn timeouts(self, timeout: Duration) -> Self {
        self.connect_timeout(timeout)
            .read_timeout(timeout)
            .write_timeout(timeout)
    }

    pub fn retry_on_connection_failure(mut self, retry: bool) -> Self {
        self.retry_on_connection_failure = retry;
        self
    }

    pub fn dns_fallback(mut self, fallback: DnsFallback) -> Self {
        self.dns_fallback = fallback;
        self
    }

    /// Upper bound for a single attempt: connect, then send, then receive.
    pub fn attempt_deadline(&self) -> Duration {
        self.connect_timeout + self.write_timeout + self.read_timeout
    }
}

fn parse_millis(key: &str, value: &str) -> Result<Duration, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| ConfigError::Invalid {
            key: key.to_string(),
            value: value.to_string(),
        })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
