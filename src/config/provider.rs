//! Provider-level settings and their resolution into a dialable endpoint.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::error::{ConfigError, Result};
use crate::model::{AttrValue, Diagnostic, Diagnostics};

/// Environment variable consulted when `host` is not configured.
pub const ENV_HOST: &str = "TEMPORAL_HOST";

/// Environment variable consulted when `port` is not configured.
pub const ENV_PORT: &str = "TEMPORAL_PORT";

/// Provider settings as written in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Temporal frontend host.
    #[serde(default)]
    pub host: AttrValue<String>,
    /// Temporal frontend port. Accepts a string or a number.
    #[serde(default, deserialize_with = "string_or_number")]
    pub port: AttrValue<String>,
    /// Seconds allowed for establishing the channel.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Seconds allowed for a single remote call.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Retry settings for transient failures.
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Retry settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per remote call, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Upper bound for any retry delay, in milliseconds.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

/// A fully resolved endpoint, ready to dial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    /// Frontend host.
    pub host: String,
    /// Frontend port.
    pub port: u16,
    /// Channel establishment timeout.
    pub connect_timeout: Duration,
    /// Per-call timeout.
    pub request_timeout: Duration,
}

const fn default_connect_timeout_secs() -> u64 {
    10
}

const fn default_request_timeout_secs() -> u64 {
    30
}

const fn default_max_attempts() -> u32 {
    5
}

const fn default_initial_backoff_ms() -> u64 {
    200
}

const fn default_max_backoff_ms() -> u64 {
    5000
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<AttrValue<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        None => AttrValue::Null,
        Some(Raw::Text(text)) => AttrValue::Known(text),
        Some(Raw::Number(number)) => AttrValue::Known(number.to_string()),
    })
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            host: AttrValue::Null,
            port: AttrValue::Null,
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            retry: RetryConfig::default(),
        }
    }
}

impl EndpointConfig {
    /// Returns the URI the channel dials.
    #[must_use]
    pub fn uri(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl ProviderConfig {
    /// Creates a config with explicit host and port.
    #[must_use]
    pub fn new(host: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            host: AttrValue::Known(host.into()),
            port: AttrValue::Known(port.into()),
            ..Self::default()
        }
    }

    /// Resolves the endpoint using the process environment as fallback.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Rejected`] carrying every attribute problem.
    pub fn resolve(&self) -> Result<EndpointConfig> {
        self.resolve_with(|key| std::env::var(key).ok())
    }

    /// Resolves the endpoint using `env` to look up fallback values.
    ///
    /// Unknown values are rejected outright. Otherwise an explicit value
    /// wins, even when empty, and unset values fall back to the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Rejected`] carrying every attribute problem.
    pub fn resolve_with<F>(&self, env: F) -> Result<EndpointConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut diagnostics = Diagnostics::new();

        if self.host.is_unknown() {
            diagnostics.push(unknown_value("host", "Host", ENV_HOST));
        }
        if self.port.is_unknown() {
            diagnostics.push(unknown_value("port", "Port", ENV_PORT));
        }
        if diagnostics.has_errors() {
            return Err(ConfigError::Rejected { diagnostics }.into());
        }

        let host = explicit_or_env(&self.host, || env(ENV_HOST));
        let port = explicit_or_env(&self.port, || env(ENV_PORT));

        if host.is_empty() {
            diagnostics.push(missing_value("host", "Host", ENV_HOST));
        }

        let parsed_port = if port.is_empty() {
            diagnostics.push(missing_value("port", "Port", ENV_PORT));
            None
        } else {
            match port.trim().parse::<u16>() {
                Ok(p) if p > 0 => Some(p),
                _ => {
                    diagnostics.push(
                        Diagnostic::error("Invalid Temporal Frontend Port")
                            .with_attribute("port")
                            .with_detail(format!(
                                "The Temporal frontend port must be a number between 1 and 65535, got '{port}'."
                            )),
                    );
                    None
                }
            }
        };

        match parsed_port {
            Some(port) if !diagnostics.has_errors() => {
                debug!(temporal_host = %host, temporal_port = port, "Resolved provider endpoint");
                Ok(EndpointConfig {
                    host,
                    port,
                    connect_timeout: Duration::from_secs(self.connect_timeout_secs),
                    request_timeout: Duration::from_secs(self.request_timeout_secs),
                })
            }
            _ => Err(ConfigError::Rejected { diagnostics }.into()),
        }
    }
}

fn explicit_or_env<F>(value: &AttrValue<String>, fallback: F) -> String
where
    F: FnOnce() -> Option<String>,
{
    match value {
        AttrValue::Known(v) => v.clone(),
        AttrValue::Null | AttrValue::Unknown => fallback().unwrap_or_default(),
    }
}

fn unknown_value(attribute: &str, label: &str, env_var: &str) -> Diagnostic {
    Diagnostic::error(format!("Unknown Temporal Frontend {label}"))
        .with_attribute(attribute)
        .with_detail(format!(
            "The provider cannot create the Temporal client as there is an unknown configuration value \
             for the Temporal frontend {attribute}. Either apply the source of the value first, set the \
             value statically in the configuration, or use the {env_var} environment variable."
        ))
}

fn missing_value(attribute: &str, label: &str, env_var: &str) -> Diagnostic {
    Diagnostic::error(format!("Missing Temporal Frontend {label}"))
        .with_attribute(attribute)
        .with_detail(format!(
            "The provider cannot create the Temporal client as there is a missing or empty value \
             for the Temporal frontend {attribute}. Set the {attribute} value in the configuration or \
             use the {env_var} environment variable. If either is already set, ensure the value is not empty."
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn rejected(err: ProviderError) -> Diagnostics {
        match err {
            ProviderError::Config(ConfigError::Rejected { diagnostics }) => diagnostics,
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_explicit_values_resolve() {
        let endpoint = ProviderConfig::new("localhost", "7233")
            .resolve_with(no_env)
            .expect("resolves");

        assert_eq!(endpoint.uri(), "http://localhost:7233");
        assert_eq!(endpoint.connect_timeout, Duration::from_secs(10));
        assert_eq!(endpoint.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_empty_host_yields_single_host_diagnostic() {
        let config = ProviderConfig::new("", "7233");
        let diagnostics = rejected(
            config
                .resolve_with(|_| Some(String::from("ignored")))
                .expect_err("empty host"),
        );

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics.for_attribute("host").len(), 1);
        assert!(diagnostics.for_attribute("port").is_empty());
    }

    #[test]
    fn test_environment_fallback() {
        let config = ProviderConfig::default();
        let endpoint = config
            .resolve_with(|key| match key {
                ENV_HOST => Some(String::from("temporal.internal")),
                ENV_PORT => Some(String::from("7233")),
                _ => None,
            })
            .expect("resolves from env");

        assert_eq!(endpoint.host, "temporal.internal");
        assert_eq!(endpoint.port, 7233);
    }

    #[test]
    fn test_unknown_values_are_reported_first() {
        let config = ProviderConfig {
            host: AttrValue::Unknown,
            port: AttrValue::Unknown,
            ..ProviderConfig::default()
        };
        let diagnostics = rejected(config.resolve_with(no_env).expect_err("unknown"));

        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics.summary().contains("Unknown Temporal Frontend Host"));
        assert!(diagnostics.summary().contains("Unknown Temporal Frontend Port"));
    }

    #[test]
    fn test_missing_and_invalid_accumulate() {
        let diagnostics = rejected(
            ProviderConfig::new("", "seventy")
                .resolve_with(no_env)
                .expect_err("invalid"),
        );

        assert_eq!(diagnostics.error_count(), 2);
        assert_eq!(diagnostics.for_attribute("port").len(), 1);
        assert!(diagnostics.summary().contains("Invalid Temporal Frontend Port"));
    }

    #[test]
    fn test_numeric_port_in_yaml() {
        let config: ProviderConfig =
            serde_yaml::from_str("host: localhost\nport: 7233\nretry:\n  max_attempts: 2\n")
                .expect("parses");

        assert_eq!(config.port, AttrValue::Known(String::from("7233")));
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.retry.initial_backoff_ms, 200);
        assert_eq!(config.request_timeout_secs, 30);
    }
}
