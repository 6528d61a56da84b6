//! CLI integration tests

use std::process::{Command, Output};

fn fleetctl(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_fleetctl"))
        .args(args)
        .env_remove("FLEET_CONFIG")
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = fleetctl(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("fleet simulator"), "Should show app name");
    assert!(stdout.contains("simulate"), "Should show simulate command");
    assert!(stdout.contains("health"), "Should show health command");
    assert!(stdout.contains("efficiency"), "Should show efficiency command");
    assert!(stdout.contains("predict"), "Should show predict command");
    assert!(stdout.contains("--seed"), "Should show seed option");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = fleetctl(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("fleetctl"), "Should show binary name");
}

#[test]
fn test_simulate_help() {
    let output = fleetctl(&["simulate", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("--servers"), "Should show servers option");
    assert!(stdout.contains("--profile"), "Should show profile option");
    assert!(stdout.contains("--ticks"), "Should show ticks option");
}

#[test]
fn test_predict_help() {
    let output = fleetctl(&["predict", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("--horizon"), "Should show horizon option");
}

#[test]
fn test_simulate_json_output() {
    let output = fleetctl(&[
        "--format", "json", "--seed", "42", "simulate", "--servers", "5", "--ticks", "8",
    ]);
    assert!(output.status.success(), "simulate should succeed");

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["ticks"], 8);
    assert_eq!(summary["initial_servers"], 5);
    assert_eq!(summary["failed_ticks"], 0);
    assert_eq!(summary["counters"]["ticks"], 8);
    assert!(!summary["servers"].as_array().unwrap().is_empty());
}

#[test]
fn test_seeded_runs_are_reproducible() {
    let args = [
        "--format", "json", "--seed", "7", "predict", "--servers", "6", "--horizon", "30",
    ];
    let first = fleetctl(&args);
    let second = fleetctl(&args);

    assert!(first.status.success());
    assert_eq!(first.stdout, second.stdout);
}

#[test]
fn test_health_json_output() {
    let output = fleetctl(&[
        "--format", "json", "--seed", "1", "health", "--servers", "4", "--ticks", "2",
    ]);
    assert!(output.status.success());

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["system"]["total_servers"], 4);
    assert!(summary["servers"][0]["analysis"]["recommendation"].is_string());
}

#[test]
fn test_invalid_profile() {
    let output = fleetctl(&["simulate", "--profile", "galactic"]);

    assert!(!output.status.success(), "Unknown profile should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("galactic"));
}

#[test]
fn test_invalid_command() {
    let output = fleetctl(&["invalid-command"]);

    assert!(!output.status.success(), "Invalid command should fail");
}
