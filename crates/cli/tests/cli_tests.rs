#![allow(deprecated)] // cargo_bin is deprecated but still functional

use assert_cmd::Command;
use canopy_core::DagLayout;
use httpmock::Method::{GET, POST};
use httpmock::MockServer;
use predicates::str::contains;
use std::fs;
use std::net::TcpListener;
use tempfile::TempDir;

fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

/// canopyctl isolated from the caller's config and environment.
fn canopyctl(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("canopyctl").unwrap();
    cmd.env("XDG_CONFIG_HOME", home.path())
        .env_remove("CANOPY_CONFIG")
        .env_remove("CANOPY_CHUNK_SIZE")
        .env_remove("RUST_LOG");
    cmd
}

fn write_config(dir: &TempDir, gateway: &str) -> std::path::PathBuf {
    let path = dir.path().join("canopy.toml");
    fs::write(
        &path,
        format!(
            r#"
read_endpoints = ["{gateway}"]
trusted_read_endpoints = ["https://trusted.example/"]
write_endpoints = ["{gateway}"]

[retry]
max_attempts = 2
initial_backoff_ms = 1
max_backoff_ms = 1
"#
        ),
    )
    .unwrap();
    path
}

#[test]
fn help_lists_commands() {
    let home = TempDir::new().unwrap();
    canopyctl(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("put"))
        .stdout(contains("get"))
        .stdout(contains("hash"))
        .stdout(contains("gateways"));
}

#[test]
fn hash_prints_offline_address() {
    let home = TempDir::new().unwrap();
    let file = home.path().join("input.txt");
    fs::write(&file, b"abcd").unwrap();

    let expected = DagLayout::build(b"abcd", 256 * 1024).unwrap().address();

    let output = canopyctl(&home).arg("hash").arg(&file).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let address = stdout.trim();
    assert_eq!(address, expected.to_base58());
    assert!(address.starts_with("Qm"));
    assert_eq!(address.len(), 46);
}

#[test]
fn hash_reads_stdin_and_honours_env_chunk_size() {
    let home = TempDir::new().unwrap();
    let data = b"0123456789abcdef0123";
    let expected = DagLayout::build(data, 8).unwrap().address();

    canopyctl(&home)
        .env("CANOPY_CHUNK_SIZE", "8")
        .arg("hash")
        .arg("-")
        .write_stdin(data.as_slice())
        .assert()
        .success()
        .stdout(contains(expected.to_base58()));
}

#[test]
fn hash_rejects_empty_input() {
    let home = TempDir::new().unwrap();
    canopyctl(&home)
        .arg("hash")
        .arg("-")
        .write_stdin("")
        .assert()
        .failure()
        .stderr(contains("missing data"));
}

#[test]
fn url_uses_trusted_gateway() {
    let home = TempDir::new().unwrap();
    let config = write_config(&home, "http://127.0.0.1:9");
    let address = DagLayout::build(b"abcd", 1024).unwrap().address();

    canopyctl(&home)
        .arg("--config")
        .arg(&config)
        .arg("url")
        .arg(address.to_base58())
        .assert()
        .success()
        .stdout(contains(format!("https://trusted.example/ipfs/{address}")));
}

#[test]
fn url_rejects_bad_address() {
    let home = TempDir::new().unwrap();
    canopyctl(&home)
        .arg("url")
        .arg("not-an-address")
        .assert()
        .failure()
        .stderr(contains("invalid address"));
}

#[test]
fn invalid_config_is_rejected() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("bad.toml");
    fs::write(&config, "chunk_size = 0\n").unwrap();

    canopyctl(&home)
        .arg("--config")
        .arg(&config)
        .arg("gateways")
        .assert()
        .failure()
        .stderr(contains("invalid configuration"));
}

#[test]
fn gateways_lists_configured_endpoints() {
    let home = TempDir::new().unwrap();
    let config = write_config(&home, "http://gateway.example:5001");

    canopyctl(&home)
        .arg("--config")
        .arg(&config)
        .arg("gateways")
        .assert()
        .success()
        .stdout(contains("http://gateway.example:5001 [active]"))
        .stdout(contains("https://trusted.example [active]"));
}

#[test]
fn put_then_get_through_gateway() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    let layout = DagLayout::build(b"abcd", 1024).unwrap();
    let leaf = &layout.leaves[0];

    server.mock(|when, then| {
        when.method(POST).path("/api/v0/block/put");
        then.status(200).json_body(serde_json::json!({
            "Key": leaf.hash.to_base58(),
            "Size": leaf.size()
        }));
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/api/v0/block/get")
            .query_param("arg", leaf.hash.to_base58());
        then.status(200).body(leaf.data.to_vec());
    });

    let home = TempDir::new().unwrap();
    let config = write_config(&home, &server.base_url());
    let input = home.path().join("input.txt");
    fs::write(&input, b"abcd").unwrap();

    canopyctl(&home)
        .arg("--config")
        .arg(&config)
        .arg("put")
        .arg(&input)
        .arg("--url")
        .assert()
        .success()
        .stdout(contains(leaf.hash.to_base58()))
        .stdout(contains("https://trusted.example/ipfs/"));

    let output = home.path().join("output.txt");
    canopyctl(&home)
        .arg("--config")
        .arg(&config)
        .arg("get")
        .arg(leaf.hash.to_base58())
        .arg("-o")
        .arg(&output)
        .assert()
        .success();
    assert_eq!(fs::read(&output).unwrap(), b"abcd");

    canopyctl(&home)
        .arg("--config")
        .arg(&config)
        .arg("get")
        .arg(leaf.hash.to_base58())
        .assert()
        .success()
        .stdout("abcd");
}
