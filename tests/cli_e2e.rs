//! End-to-end CLI tests for the floodtiles binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::method;
use wiremock::{Mock, ResponseTemplate};

mod support;
use support::socket_guard::{socket_skip_return, start_mock_server_or_skip};
use support::{endpoint, tile_body};

fn floodtiles() -> Command {
    let mut cmd = Command::cargo_bin("floodtiles").unwrap();
    cmd.env_remove("FLOODTILES_COOKIE").env_remove("RUST_LOG");
    cmd
}

/// Test that --help displays usage information and exits with code 0.
#[test]
fn test_binary_help_displays_usage() {
    floodtiles()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Batch download floodplain"));
}

/// Test that --version displays version and exits with code 0.
#[test]
fn test_binary_version_displays_version() {
    floodtiles()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("floodtiles"));
}

/// Test that invalid flags exit with the configuration error code.
#[test]
fn test_binary_invalid_flag_returns_config_error() {
    floodtiles()
        .arg("--invalid-flag")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_binary_missing_cookie_returns_config_error() {
    floodtiles()
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--cookie"));
}

#[test]
fn test_binary_cookie_from_environment_is_accepted() {
    let root = TempDir::new().unwrap();
    let savepath = root.path().join("tiles");
    floodtiles()
        .env("FLOODTILES_COOKIE", "FedAuth=abc")
        .args(["--flood-type", "Coastal", "--savepath"])
        .arg(&savepath)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid flood type"));
}

#[test]
fn test_binary_invalid_flood_type_creates_nothing() {
    let root = TempDir::new().unwrap();
    let savepath = root.path().join("tiles");
    floodtiles()
        .args(["--cookie", "FedAuth=abc", "--flood-type", "Coastal", "--savepath"])
        .arg(&savepath)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid flood type 'Coastal'"));
    assert!(!savepath.exists());
}

#[test]
fn test_binary_zero_workers_returns_config_error() {
    floodtiles()
        .args(["--cookie", "FedAuth=abc", "--workers", "0"])
        .assert()
        .code(1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_binary_downloads_tile_and_prints_json_report() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return socket_skip_return();
    };
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(tile_body()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let root = TempDir::new().unwrap();
    let savepath = root.path().join("tiles");
    floodtiles()
        .args(["--cookie", "FedAuth=abc", "--frequency", "1in10", "--tile", "n25w98"])
        .args(["--min-size", "1024", "--json", "-q", "--endpoint"])
        .arg(endpoint(&mock_server))
        .arg("--savepath")
        .arg(&savepath)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"succeeded\": 1"));

    assert!(
        savepath
            .join("Scenario 5/Combined/1in10/Combined_n25w98_1in10.tif")
            .exists()
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_binary_failed_tiles_exit_with_failure_code() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return socket_skip_return();
    };
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let root = TempDir::new().unwrap();
    let savepath = root.path().join("tiles");
    floodtiles()
        .args(["--cookie", "FedAuth=abc", "--frequency", "1in10", "--tile", "n25w98", "-q"])
        .arg("--endpoint")
        .arg(endpoint(&mock_server))
        .arg("--savepath")
        .arg(&savepath)
        .assert()
        .code(2);

    let log = std::fs::read_to_string(savepath.join("download_errors.log")).unwrap();
    assert!(log.contains("(Status 404)"));
}
