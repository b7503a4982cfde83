//! Behavioural smoke test for the CLI entrypoint.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::str::contains;
#[cfg(not(feature = "test-backdoors"))]
use camino::Utf8PathBuf;
#[cfg(not(feature = "test-backdoors"))]
use cap_std::{ambient_authority, fs_utf8::Dir};
#[cfg(not(feature = "test-backdoors"))]
use tempfile::TempDir;

#[test]
fn cli_without_arguments_prints_usage() {
    let mut cmd = cargo_bin_cmd!("keel");
    cmd.assert()
        .failure()
        .code(2)
        .stderr(contains("Usage: keel"));
}

#[test]
fn cli_reports_missing_state_file() {
    let mut cmd = cargo_bin_cmd!("keel");
    cmd.args(["refresh", "does-not-exist.json"]);

    cmd.assert()
        .failure()
        .code(1)
        .stderr(contains("state file does-not-exist.json does not exist"));
}

#[cfg(not(feature = "test-backdoors"))]
#[test]
fn release_binary_ignores_fake_client_switch() {
    let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf())
        .unwrap_or_else(|path| panic!("temp dir should be utf8: {}", path.display()));
    Dir::open_ambient_dir(&root, ambient_authority())
        .unwrap_or_else(|err| panic!("open temp dir: {err}"))
        .write("web-1.json", r#"{"desired": {"name": "web-1"}}"#)
        .unwrap_or_else(|err| panic!("write state: {err}"));

    let mut cmd = cargo_bin_cmd!("keel");
    cmd.current_dir(&root);
    cmd.env("KEEL_FAKE_CLIENT", "1");
    cmd.env("KEEL_CONFIG_PATH", root.join("keel.toml"));
    cmd.env_remove("RIGHTSCALE_REFRESH_TOKEN");
    cmd.args(["apply", root.join("web-1.json").as_str()]);

    cmd.assert()
        .failure()
        .code(1)
        .stderr(contains("configuration error"));
}
