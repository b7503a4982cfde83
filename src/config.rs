//! Configuration loading via `ortho-config`.

use std::ffi::OsString;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

/// Default CM 1.5 API endpoint.
pub const DEFAULT_API_HOST: &str = "us-3.rightscale.com";

/// RightScale account settings derived from environment variables,
/// configuration files, and CLI flags.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "RIGHTSCALE",
    discovery(
        app_name = "keel",
        env_var = "KEEL_CONFIG_PATH",
        config_file_name = "keel.toml",
        dotfile_name = ".keel.toml",
        project_file_name = "keel.toml"
    )
)]
pub struct RightScaleConfig {
    /// Host name of the shard serving the account.
    #[ortho_config(default = DEFAULT_API_HOST.to_owned())]
    pub api_host: String,
    /// OAuth2 refresh token issued from the dashboard. This value is required.
    pub refresh_token: String,
    /// Account number sent with every request when set.
    pub account_id: Option<String>,
    /// Per-request timeout in seconds.
    #[ortho_config(default = 30)]
    pub timeout_secs: u64,
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }
}

impl RightScaleConfig {
    fn require_field(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(format!(
                "missing {}: set {} or add {} to keel.toml",
                metadata.description, metadata.env_var, metadata.toml_key
            )));
        }
        Ok(())
    }

    /// Loads configuration without attempting to parse CLI arguments. Values
    /// merge defaults, configuration files, and environment variables in
    /// that order of precedence.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([OsString::from("keel")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Returns the per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Performs semantic validation on required fields. Error messages include
    /// guidance on how to provide missing values via environment variables or
    /// configuration files.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a required field is empty
    /// and [`ConfigError::InvalidTimeout`] when the timeout is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::require_field(
            &self.refresh_token,
            &FieldMetadata::new(
                "RightScale refresh token",
                "RIGHTSCALE_REFRESH_TOKEN",
                "refresh_token",
            ),
        )?;
        Self::require_field(
            &self.api_host,
            &FieldMetadata::new("API host", "RIGHTSCALE_API_HOST", "api_host"),
        )?;
        if let Some(account) = &self.account_id {
            Self::require_field(
                account,
                &FieldMetadata::new("account number", "RIGHTSCALE_ACCOUNT_ID", "account_id"),
            )?;
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        Ok(())
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Indicates the request timeout is zero.
    #[error("timeout_secs must be greater than zero")]
    InvalidTimeout,
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
