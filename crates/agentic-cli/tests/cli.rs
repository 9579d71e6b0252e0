//! Runs the `agentic` binary against temporary config and workflow files.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use serde_json::Value;
use std::path::Path;
use std::process::{Command, Output};

const ECHO_ONLY: &str = r#"
[scheduler]
queue_capacity = 4
workers = 1

[connectors]
echo = true

[connectors.docker]
enabled = false

[connectors.kubernetes]
enabled = false

[connectors.nix]
enabled = false
"#;

fn agentic(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_agentic"))
        .current_dir(dir)
        .env("RUST_LOG", "error")
        .args(["--config", "agentic.toml"])
        .args(args)
        .output()
        .unwrap()
}

fn workspace() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("agentic.toml"), ECHO_ONLY).unwrap();
    dir
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn test_connectors_lists_enabled_agents() {
    let dir = workspace();
    let output = agentic(dir.path(), &["connectors"]);
    assert!(output.status.success());

    let json = stdout_json(&output);
    let list = json.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["name"], "echo");
    assert_eq!(list[0]["status"], "available");
}

#[test]
fn test_submit_echo_prints_done_task() {
    let dir = workspace();
    let output = agentic(dir.path(), &["submit", "echo", "--payload", r#"{"x": 1}"#]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let task = stdout_json(&output);
    assert_eq!(task["category"], "echo");
    assert_eq!(task["status"], "done");
    assert_eq!(task["result"]["output"]["x"], 1);
}

#[test]
fn test_submit_unknown_category_fails() {
    let dir = workspace();
    let output = agentic(dir.path(), &["submit", "gpu"]);
    assert!(!output.status.success());

    let task = stdout_json(&output);
    assert_eq!(task["status"], "failed");
    assert_eq!(task["result"]["error"], "no agent supports task type: gpu");
}

#[test]
fn test_workflow_exit_status_follows_result() {
    let dir = workspace();
    std::fs::write(
        dir.path().join("ok.json"),
        r#"{"id": "ok", "name": "OK", "steps": [
            {"id": "a", "name": "A", "task_type": "echo", "parameters": {"n": 1}},
            {"id": "b", "name": "B", "task_type": "echo", "depends_on": ["a"]}
        ]}"#,
    )
    .unwrap();
    let output = agentic(dir.path(), &["workflow", "ok.json"]);
    assert!(output.status.success());
    let result = stdout_json(&output);
    assert_eq!(result["status"], "completed");
    assert_eq!(result["steps"][0]["output"]["n"], 1);

    std::fs::write(
        dir.path().join("bad.toml"),
        r#"
id = "bad"
name = "Bad"

[[steps]]
id = "a"
name = "A"
task_type = "vm"
"#,
    )
    .unwrap();
    let output = agentic(dir.path(), &["workflow", "bad.toml"]);
    assert!(!output.status.success());
    let result = stdout_json(&output);
    assert_eq!(result["status"], "failed");
    assert_eq!(
        result["error"],
        "workflow step 1 failed: no agent supports task type: vm"
    );
}

#[test]
fn test_provision_dry_run_prints_workflow() {
    let dir = workspace();
    std::fs::write(
        dir.path().join("vm.toml"),
        r#"
name = "web01"
vmid = 120
cpu = 2
memory = 4096
use_proxmox = true
proxmox_node = "pve1"

[[containers]]
name = "nginx"
image = "nginx:1.27"
"#,
    )
    .unwrap();
    let output = agentic(dir.path(), &["provision", "vm.toml", "--dry-run"]);
    assert!(output.status.success());

    let workflow = stdout_json(&output);
    assert_eq!(workflow["id"], "vm-provision-web01");
    let ids: Vec<_> = workflow["steps"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["create-vm", "start-vm", "deploy-container-1"]);
}

#[test]
fn test_missing_config_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let output = agentic(dir.path(), &["connectors"]);
    assert!(output.status.success());
    let names: Vec<_> = stdout_json(&output)
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["docker", "kubernetes", "nix"]);
}
