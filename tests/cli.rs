//! Startup failures of the `liveview` binary

use std::io::Write;
use std::process::{Command, Output};

fn liveview(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_liveview"))
        .args(args)
        .env("RUST_LOG", "error")
        .output()
        .unwrap()
}

fn config_file(yaml: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();
    file
}

#[test]
fn test_missing_config_file_exits_nonzero() {
    let output = liveview(&["--config", "/nonexistent/liveview.yaml"]);
    assert!(!output.status.success());
}

#[test]
fn test_config_argument_required() {
    let output = liveview(&[]);
    assert!(!output.status.success());
}

#[test]
fn test_missing_key_exits_nonzero() {
    let config = config_file("device_ids: [cam0]\nliveview_url: 127.0.0.1\n");
    let output = liveview(&["--config", config.path().to_str().unwrap()]);
    assert!(!output.status.success());
}

#[test]
fn test_missing_source_exits_nonzero() {
    let config = config_file(
        "device_ids: [cam0]\nliveview_url: 127.0.0.1\nliveview_port: 0\nsource_path: /nonexistent/clip.mp4\n",
    );
    let output = liveview(&["--config", config.path().to_str().unwrap()]);
    assert!(!output.status.success());
}

#[test]
fn test_port_in_use_exits_nonzero() {
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = taken.local_addr().unwrap().port();
    let config = config_file(&format!(
        "device_ids: [cam0]\nliveview_url: 127.0.0.1\nliveview_port: {}\nsource_path: stub://demo\n",
        port
    ));

    let output = liveview(&["--config", config.path().to_str().unwrap(), "--frame-count", "8"]);
    assert!(!output.status.success());
}
