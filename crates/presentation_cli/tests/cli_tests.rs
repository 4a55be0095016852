//! Binary-level tests for rendezvous-cli
//!
//! Each test runs in its own temporary directory with the budget database
//! redirected there, so no network access or shared state is involved.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn run(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rendezvous-cli"))
        .args(args)
        .current_dir(dir)
        .env("RENDEZVOUS_DATABASE__PATH", dir.join("budget.db"))
        .env_remove("RENDEZVOUS_CONFIG")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run rendezvous-cli")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn hubs_lists_builtin_catalog() {
    let dir = TempDir::new().unwrap();
    let output = run(dir.path(), &["hubs"]);

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Penn Station"));
    assert!(text.contains("Alexanderplatz"));
}

#[test]
fn hubs_between_locations_only_lists_relevant_ones() {
    let dir = TempDir::new().unwrap();
    let output = run(
        dir.path(),
        &[
            "hubs",
            "--origin",
            "40.7580,-73.9855",
            "--destination",
            "40.7359,-73.9906",
        ],
    );

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("34 St-Herald Sq"));
    assert!(!text.contains("Alexanderplatz"));
}

#[test]
fn resolve_rejects_out_of_range_coordinates() {
    let dir = TempDir::new().unwrap();
    let output = run(
        dir.path(),
        &["resolve", "--origin", "91,0", "--destination", "40.7,-73.9"],
    );

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("origin"));
}

#[test]
fn budget_commands_persist_between_runs() {
    let dir = TempDir::new().unwrap();

    let set = run(dir.path(), &["budget", "set", "hafas", "6000"]);
    assert!(set.status.success());

    let status = run(dir.path(), &["budget", "status", "--json"]);
    assert!(status.status.success());
    let json: serde_json::Value = serde_json::from_slice(&status.stdout).unwrap();
    let entry = &json[0];
    assert_eq!(entry["provider_id"], "hafas");
    assert_eq!(entry["consumed_requests"], 6000);
    assert_eq!(entry["policy"], "restricted");

    let reset = run(dir.path(), &["budget", "reset", "hafas"]);
    assert!(reset.status.success());
    let status = run(dir.path(), &["budget", "status", "--json"]);
    let json: serde_json::Value = serde_json::from_slice(&status.stdout).unwrap();
    assert_eq!(json[0]["consumed_requests"], 0);
}

#[test]
fn budget_set_unknown_provider_fails() {
    let dir = TempDir::new().unwrap();
    let output = run(dir.path(), &["budget", "set", "nobody", "1"]);
    assert!(!output.status.success());
}

#[test]
fn route_unknown_provider_fails() {
    let dir = TempDir::new().unwrap();
    let output = run(
        dir.path(),
        &[
            "route",
            "--provider",
            "missing",
            "--from",
            "52.52,13.40",
            "--to",
            "52.50,13.33",
        ],
    );
    assert!(!output.status.success());
}
