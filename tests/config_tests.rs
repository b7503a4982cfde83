//! Unit tests for configuration loading and validation.

use camino::Utf8PathBuf;
use cap_std::{ambient_authority, fs_utf8::Dir};
use keel::config::{ConfigError, DEFAULT_API_HOST, RightScaleConfig};
use keel::test_support::EnvGuard;
use rstest::*;
use tempfile::TempDir;

#[fixture]
fn valid_config() -> RightScaleConfig {
    RightScaleConfig {
        api_host: String::from(DEFAULT_API_HOST),
        refresh_token: String::from("0123456789abcdef"),
        account_id: Some(String::from("60073")),
        timeout_secs: 30,
    }
}

#[rstest]
fn valid_config_passes_validation(valid_config: RightScaleConfig) {
    valid_config
        .validate()
        .unwrap_or_else(|err| panic!("valid config should pass: {err}"));
    assert_eq!(valid_config.timeout().as_secs(), 30);
}

/// Verifies that validation produces actionable errors mentioning both the
/// environment variable and configuration file for each required field.
#[rstest]
#[case::refresh_token(
    |cfg: &mut RightScaleConfig| cfg.refresh_token.clear(),
    "RIGHTSCALE_REFRESH_TOKEN",
    "refresh_token"
)]
#[case::api_host(
    |cfg: &mut RightScaleConfig| cfg.api_host = String::from("  "),
    "RIGHTSCALE_API_HOST",
    "api_host"
)]
#[case::account_id(
    |cfg: &mut RightScaleConfig| cfg.account_id = Some(String::new()),
    "RIGHTSCALE_ACCOUNT_ID",
    "account_id"
)]
fn validation_errors_are_actionable(
    valid_config: RightScaleConfig,
    #[case] mutate: fn(&mut RightScaleConfig),
    #[case] env_var: &str,
    #[case] toml_key: &str,
) {
    let mut cfg = valid_config;
    mutate(&mut cfg);

    let error = cfg.validate().expect_err("validation should fail");
    let ConfigError::MissingField(ref message) = error else {
        panic!("expected MissingField error, got {error:?}");
    };
    assert!(
        message.contains(env_var),
        "error should mention env var {env_var}: {message}"
    );
    assert!(
        message.contains("keel.toml"),
        "error should mention config file: {message}"
    );
    assert!(
        message.contains(toml_key),
        "error should mention TOML key {toml_key}: {message}"
    );
}

#[rstest]
fn zero_timeout_is_rejected(valid_config: RightScaleConfig) {
    let cfg = RightScaleConfig {
        timeout_secs: 0,
        ..valid_config
    };
    assert_eq!(cfg.validate(), Err(ConfigError::InvalidTimeout));
}

#[tokio::test]
async fn environment_overrides_file_and_defaults_apply() {
    let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf())
        .unwrap_or_else(|path| panic!("temp dir should be utf8: {}", path.display()));
    Dir::open_ambient_dir(&root, ambient_authority())
        .unwrap_or_else(|err| panic!("open temp dir: {err}"))
        .write(
            "keel.toml",
            "refresh_token = \"from-file\"\naccount_id = \"1234\"\n",
        )
        .unwrap_or_else(|err| panic!("write config: {err}"));
    let config_path = root.join("keel.toml");

    let _guard = EnvGuard::set_vars(&[
        ("KEEL_CONFIG_PATH", config_path.as_str()),
        ("RIGHTSCALE_REFRESH_TOKEN", "from-env"),
    ])
    .await;

    let cfg = RightScaleConfig::load_without_cli_args()
        .unwrap_or_else(|err| panic!("config should load: {err}"));

    assert_eq!(cfg.refresh_token, "from-env");
    assert_eq!(cfg.account_id.as_deref(), Some("1234"));
    assert_eq!(cfg.api_host, DEFAULT_API_HOST);
    assert_eq!(cfg.timeout_secs, 30);
}
