use std::{fs, path::PathBuf, process::Command};

fn fire_evac() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_fire-evac"));
    let _ = command.env("RUST_LOG", "off");
    command
}

fn scenario_file(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("fire-evac-{}-{name}.toml", std::process::id()));
    fs::write(&path, contents).expect("failed to write scenario file");
    path
}

#[test]
fn astar_experiment_prints_a_json_summary() {
    let output = fire_evac()
        .args(["--method", "astar", "--iter", "2", "--json"])
        .output()
        .expect("failed to launch fire-evac");

    assert!(output.status.success(), "fire-evac exited with {}", output.status);
    let summary: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout holds a json summary");
    assert_eq!(summary["method"], "astar");
    assert_eq!(summary["runs"], 2);
    assert_eq!(summary["agents"], 30);
    assert_eq!(summary["outcomes"].as_array().map(Vec::len), Some(2));
}

#[test]
fn scenario_map_and_text_report_are_used() {
    let path = scenario_file(
        "corridor",
        "version = 1\nmap = [\"=====\", \"=P S=\", \"=====\"]\n[tuning]\niter = 1\n",
    );

    let output = fire_evac()
        .args(["--method", "AStar", "--render", "--scenario"])
        .arg(&path)
        .output()
        .expect("failed to launch fire-evac");
    let _ = fs::remove_file(&path);

    assert!(output.status.success(), "fire-evac exited with {}", output.status);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("= P   S ="));
    assert!(stdout.contains("Ticks: 2, Safe: 1, Dead: 0, Objective Function: 2"));
    assert!(stdout.contains("Method: AStar"));
    assert!(stdout.contains("Average Saved Agent: 1.00"));
}

#[test]
fn unsupported_scenario_version_fails() {
    let path = scenario_file("future", "version = 7\nmap = [\"PS\"]\n");

    let output = fire_evac()
        .args(["--method", "random", "--scenario"])
        .arg(&path)
        .output()
        .expect("failed to launch fire-evac");
    let _ = fs::remove_file(&path);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unsupported scenario version 7"), "{stderr}");
}

#[test]
fn unknown_method_is_rejected() {
    let output = fire_evac()
        .args(["--method", "greedy"])
        .output()
        .expect("failed to launch fire-evac");

    assert!(!output.status.success());
}
