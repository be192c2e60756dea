//! Provider configuration block.
//!
//! The host sends the `provider "anypoint" { ... }` block as JSON. It is
//! validated against [`schema`] and frozen into a [`ProviderConfig`] that every
//! operation of the configured provider shares.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::schema::{Attribute, Diagnostic, Schema};
use crate::validation;

/// Environment variable consulted when `access_token` is not configured.
pub const ACCESS_TOKEN_ENV: &str = "ANYPOINT_ACCESS_TOKEN";

/// Default HTTP timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: i64 = 60;

/// The Anypoint control plane the multi-region APIs talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlPlane {
    /// US control plane.
    #[default]
    Us,
    /// EU control plane.
    Eu,
    /// Government cloud.
    Gov,
}

impl ControlPlane {
    /// Parse the `cplane` attribute.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "us" => Some(Self::Us),
            "eu" => Some(Self::Eu),
            "gov" => Some(Self::Gov),
            _ => None,
        }
    }

    /// Index into the API server list.
    pub fn server_index(self) -> usize {
        match self {
            Self::Us => 0,
            Self::Eu => 1,
            Self::Gov => 2,
        }
    }
}

/// Raw shape of the provider block.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    access_token: Option<String>,
    cplane: Option<String>,
    base_url: Option<String>,
    timeout: Option<i64>,
}

/// Immutable provider configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Bearer token sent with every request.
    pub access_token: String,
    /// Control plane selecting the server of multi-region APIs.
    pub cplane: ControlPlane,
    /// Replaces every API host when set (used for testing and proxies).
    pub base_url: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("access_token", &crate::schema::REDACTED)
            .field("cplane", &self.cplane)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Schema of the provider configuration block.
pub fn schema() -> Schema {
    Schema::v0()
        .with_description("Manages Anypoint Platform organizations through the management APIs.")
        .with_attribute(
            "access_token",
            Attribute::optional_string()
                .sensitive()
                .with_description(format!(
                    "Bearer token used for every API call. Falls back to {}.",
                    ACCESS_TOKEN_ENV
                )),
        )
        .with_attribute(
            "cplane",
            Attribute::optional_string()
                .with_default(json!("us"))
                .with_description("Control plane: us, eu or gov."),
        )
        .with_attribute(
            "base_url",
            Attribute::optional_string()
                .with_description("Overrides the API host of every control plane."),
        )
        .with_attribute(
            "timeout",
            Attribute::optional_int64()
                .with_default(json!(DEFAULT_TIMEOUT_SECS))
                .with_description("HTTP request timeout in seconds."),
        )
}

impl ProviderConfig {
    /// Build the configuration, reading the token fallback from the process
    /// environment.
    pub fn from_value(value: &Value) -> Result<Self, Vec<Diagnostic>> {
        Self::from_value_with_env(value, |name| std::env::var(name).ok())
    }

    /// Build the configuration with an explicit environment lookup.
    pub fn from_value_with_env<F>(value: &Value, env: F) -> Result<Self, Vec<Diagnostic>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut diagnostics = validation::validate(&schema(), value);
        if !diagnostics.is_empty() {
            return Err(diagnostics);
        }

        let raw: RawConfig = if value.is_null() {
            RawConfig::default()
        } else {
            serde_json::from_value(value.clone()).map_err(|e| {
                vec![Diagnostic::error("Invalid provider configuration").with_detail(e.to_string())]
            })?
        };

        let access_token = raw
            .access_token
            .filter(|t| !t.is_empty())
            .or_else(|| env(ACCESS_TOKEN_ENV).filter(|t| !t.is_empty()));
        if access_token.is_none() {
            diagnostics.push(
                Diagnostic::error("Missing access token")
                    .with_detail(format!(
                        "Set access_token in the provider block or the {} environment variable",
                        ACCESS_TOKEN_ENV
                    ))
                    .with_attribute("access_token"),
            );
        }

        let cplane_name = raw.cplane.unwrap_or_else(|| "us".to_string());
        let cplane = ControlPlane::parse(&cplane_name);
        if cplane.is_none() {
            diagnostics.push(
                Diagnostic::error(format!("Unknown control plane '{}'", cplane_name))
                    .with_detail("Expected one of us, eu, gov")
                    .with_attribute("cplane"),
            );
        }

        let timeout = raw.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout <= 0 {
            diagnostics.push(
                Diagnostic::error("Timeout must be positive")
                    .with_detail(format!("Got {}", timeout))
                    .with_attribute("timeout"),
            );
        }

        match (access_token, cplane) {
            (Some(access_token), Some(cplane)) if diagnostics.is_empty() => Ok(Self {
                access_token,
                cplane,
                base_url: raw
                    .base_url
                    .map(|url| url.trim_end_matches('/').to_string())
                    .filter(|url| !url.is_empty()),
                timeout: Duration::from_secs(timeout as u64),
            }),
            _ => Err(diagnostics),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults() {
        let config =
            ProviderConfig::from_value_with_env(&json!({"access_token": "tok"}), no_env).unwrap();
        assert_eq!(config.access_token, "tok");
        assert_eq!(config.cplane, ControlPlane::Us);
        assert_eq!(config.base_url, None);
        assert_eq!(config.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_token_from_environment() {
        let config = ProviderConfig::from_value_with_env(&json!({"cplane": "eu"}), |name| {
            (name == ACCESS_TOKEN_ENV).then(|| "env-token".to_string())
        })
        .unwrap();
        assert_eq!(config.access_token, "env-token");
        assert_eq!(config.cplane.server_index(), 1);
    }

    #[test]
    fn test_missing_token() {
        let diagnostics = ProviderConfig::from_value_with_env(&Value::Null, no_env).unwrap_err();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("access_token"));
    }

    #[test]
    fn test_invalid_cplane_and_timeout() {
        let diagnostics = ProviderConfig::from_value_with_env(
            &json!({"access_token": "tok", "cplane": "apac", "timeout": 0}),
            no_env,
        )
        .unwrap_err();
        let attrs: Vec<_> = diagnostics.iter().filter_map(|d| d.attribute.as_deref()).collect();
        assert_eq!(attrs, vec!["cplane", "timeout"]);
    }

    #[test]
    fn test_type_errors_reported_before_decoding() {
        let diagnostics =
            ProviderConfig::from_value_with_env(&json!({"timeout": "soon"}), no_env).unwrap_err();
        assert!(diagnostics[0].summary.contains("Invalid type"));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let config = ProviderConfig::from_value_with_env(
            &json!({"access_token": "tok", "base_url": "http://127.0.0.1:8080/"}),
            no_env,
        )
        .unwrap();
        assert_eq!(config.base_url.as_deref(), Some("http://127.0.0.1:8080"));
    }

    #[test]
    fn test_debug_hides_token() {
        let config =
            ProviderConfig::from_value_with_env(&json!({"access_token": "s3cret"}), no_env)
                .unwrap();
        assert!(!format!("{:?}", config).contains("s3cret"));
    }

    #[test]
    fn test_schema_is_well_formed() {
        assert!(validation::check_schema(&schema()).is_empty());
        assert!(schema().block.attributes["access_token"].flags.sensitive);
    }
}
