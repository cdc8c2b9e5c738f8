//! Integration tests for the toolchat CLI

use std::io::Write;
use std::process::{Command, Stdio};

use tempfile::TempDir;

fn toolchat() -> Command {
    Command::new(env!("CARGO_BIN_EXE_toolchat"))
}

/// Write a config file pointing the runner at `sh` so tests need no Python
fn shell_config(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[code_runner]
interpreter = "sh"
args = ["-s"]
timeout_seconds = 5

[forecast]
base_url = "http://127.0.0.1:9"
timeout_seconds = 1
"#,
    )
    .unwrap();
    path
}

#[test]
fn test_cli_help() {
    let output = toolchat().arg("--help").output().expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("toolchat"));
    for command in ["serve", "forecast", "run", "tools"] {
        assert!(stdout.contains(command), "missing {command} in help");
    }
}

#[test]
fn test_tools_lists_definitions() {
    let dir = TempDir::new().unwrap();
    let output = toolchat()
        .arg("--config")
        .arg(shell_config(&dir))
        .arg("tools")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let definitions: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = definitions
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["get_weather_forecast", "run_python_code"]);
}

#[cfg(unix)]
#[test]
fn test_run_reads_stdin_and_exits_with_code_status() {
    let dir = TempDir::new().unwrap();
    let mut child = toolchat()
        .arg("--config")
        .arg(shell_config(&dir))
        .arg("run")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to execute command");

    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"echo from-stdin\nexit 3\n")
        .unwrap();
    let output = child.wait_with_output().unwrap();

    assert_eq!(output.status.code(), Some(3));
    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["stdout"], "from-stdin\n");
    assert_eq!(result["exitCode"], 3);
}

#[cfg(unix)]
#[test]
fn test_run_reads_file() {
    let dir = TempDir::new().unwrap();
    let script = dir.path().join("script.py");
    std::fs::write(&script, "echo from-file\n").unwrap();

    let output = toolchat()
        .arg("--config")
        .arg(shell_config(&dir))
        .arg("run")
        .arg(&script)
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["stdout"], "from-file\n");
}

#[test]
fn test_forecast_rejects_invalid_latitude() {
    let dir = TempDir::new().unwrap();
    let output = toolchat()
        .arg("--config")
        .arg(shell_config(&dir))
        .args(["forecast", "--latitude", "120", "--longitude", "0"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("latitude"), "unexpected stderr: {stderr}");
}

#[test]
fn test_forecast_network_failure_reported_as_json() {
    let dir = TempDir::new().unwrap();
    let output = toolchat()
        .arg("--config")
        .arg(shell_config(&dir))
        .args(["forecast", "--latitude", "-33.9", "--longitude", "18.4", "--json"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(result["error"].is_string(), "unexpected output: {result}");
}

#[test]
fn test_invalid_config_is_reported() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[logging]\nlevel = \"loud\"\n").unwrap();

    let output = toolchat()
        .arg("--config")
        .arg(&path)
        .arg("tools")
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid log level"), "unexpected stderr: {stderr}");
}
