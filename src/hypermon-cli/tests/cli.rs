use std::fs::write;
use std::path::Path;
use std::process::Command;

use escargot::CargoBuild;
use tempfile::tempdir;

fn monitor_cli(bin: &str) -> Command {
    CargoBuild::new()
        .manifest_path(env!("CARGO_MANIFEST_PATH"))
        .bin(bin)
        .current_release()
        .current_target()
        .run()
        .unwrap()
        .command()
}

fn write_trace(dir: &Path, name: &str, lines: &[&str]) -> std::path::PathBuf {
    let path = dir.join(name);
    write(&path, lines.join("\n")).unwrap();
    path
}

#[test]
fn verdict_true_on_agreeing_traces() {
    let dir = tempdir().unwrap();
    let a = write_trace(dir.path(), "a.csv", &["1 ; 1", "2 ; 2"]);
    let b = write_trace(dir.path(), "b.csv", &["1 ; 1", "2 ; 2"]);

    let output = monitor_cli("hypermon")
        .arg("--csv")
        .arg(&a)
        .arg(&b)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Formula is TRUE"), "stdout: {stdout}");
    assert!(stdout.contains("Total formula instances: 1"), "stdout: {stdout}");
    assert!(stdout.contains("Total atom monitors: 1"), "stdout: {stdout}");
}

#[test]
fn verdict_false_on_diverging_outputs() {
    let dir = tempdir().unwrap();
    let a = write_trace(dir.path(), "a.csv", &["1 ; 1", "2 ; 2"]);
    let b = write_trace(dir.path(), "b.csv", &["1 ; 1", "2 ; 3"]);

    let output = monitor_cli("hypermon").arg(&a).arg(&b).output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Formula is FALSE"), "stdout: {stdout}");
}

#[test]
fn verdict_true_without_inputs() {
    let output = monitor_cli("hypermon").output().unwrap();
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn stats_are_reported_as_json() {
    let dir = tempdir().unwrap();
    let a = write_trace(dir.path(), "a.csv", &["1 ; 1"]);

    let output = monitor_cli("hypermon")
        .arg("--stats-json")
        .arg(&a)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout is one JSON object");
    assert_eq!(report["verdict"], "TRUE");
    assert_eq!(report["stats"]["num_instances"], 0);
}

#[test]
fn malformed_line_aborts_the_run() {
    let dir = tempdir().unwrap();
    let a = write_trace(dir.path(), "a.csv", &["1, 2"]);

    let output = monitor_cli("hypermon").arg(&a).output().unwrap();

    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("semicolon"), "stderr: {stderr}");
}

#[test]
fn unknown_symbols_are_ignored_by_default() {
    let dir = tempdir().unwrap();
    let a = write_trace(dir.path(), "a.csv", &["1, x ; 1"]);
    let b = write_trace(dir.path(), "b.csv", &["1 ; 1"]);

    let output = monitor_cli("hypermon").arg(&a).arg(&b).output().unwrap();
    assert_eq!(output.status.code(), Some(0));

    let output = monitor_cli("hypermon")
        .arg("--no-ignore-unknown")
        .arg(&a)
        .arg(&b)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn hna_accepts_phased_traces() {
    let dir = tempdir().unwrap();
    let a = write_trace(dir.path(), "a.csv", &["1 ; 1", "@1", "2 ; 2"]);
    let b = write_trace(dir.path(), "b.csv", &["1 ; 1", "@1", "2 ; 2"]);

    let output = monitor_cli("hypermon-hna").arg(&a).arg(&b).output().unwrap();

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("HNA accepts"), "stdout: {stdout}");
    assert!(stdout.contains("Number of HNL monitors: 2"), "stdout: {stdout}");
}

#[test]
fn hna_rejects_invalid_action() {
    let dir = tempdir().unwrap();
    let a = write_trace(dir.path(), "a.csv", &["1 ; 1", "@7"]);

    let output = monitor_cli("hypermon-hna").arg(&a).output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("HNA rejects"), "stdout: {stdout}");
}
