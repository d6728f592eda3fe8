//! Exit-status contract of the raw-address boundary.

use std::process::Command;

use ffibench_bridge::fatal::{EXIT_BRIDGE_FAILURE, FATAL_EVENT};

#[cfg(unix)]
const SIGABRT: i32 = 6;

fn harness() -> Command {
    Command::new(env!("CARGO_BIN_EXE_harness"))
}

fn fatal_line(stderr: &[u8]) -> Option<serde_json::Value> {
    String::from_utf8_lossy(stderr)
        .lines()
        .filter_map(|line| serde_json::from_str::<serde_json::Value>(line).ok())
        .find(|v| v["event"] == FATAL_EVENT)
}

#[test]
fn bind_failure_exits_with_fatal_status() {
    let output = harness()
        .arg("bind-failure")
        .env_remove("FFIBENCH_ON_FATAL")
        .output()
        .expect("spawn harness");

    assert_eq!(output.status.code(), Some(EXIT_BRIDGE_FAILURE));
    let line = fatal_line(&output.stderr).expect("fatal diagnostic on stderr");
    assert_eq!(line["level"], "fatal");
    assert_eq!(line["component"], "bridge");
    assert_eq!(line["kind"], "binding_resolution");
    assert_eq!(line["action"], "exit");
    assert!(
        line["error"]
            .as_str()
            .is_some_and(|e| e.contains("method_lookup"))
    );
}

#[test]
fn fatal_diagnostic_ignores_log_threshold() {
    let output = harness()
        .arg("bind-failure")
        .env("FFIBENCH_LOG", "off")
        .output()
        .expect("spawn harness");

    assert_eq!(output.status.code(), Some(EXIT_BRIDGE_FAILURE));
    assert!(fatal_line(&output.stderr).is_some());
    // The non-fatal binding_failed line is suppressed.
    assert!(!String::from_utf8_lossy(&output.stderr).contains("binding_failed"));
}

#[cfg(unix)]
#[test]
fn abort_action_kills_the_process() {
    use std::os::unix::process::ExitStatusExt;

    let output = harness()
        .arg("bind-failure")
        .env("FFIBENCH_ON_FATAL", "abort")
        .output()
        .expect("spawn harness");

    assert!(!output.status.success());
    assert_eq!(output.status.code(), None);
    assert_eq!(output.status.signal(), Some(SIGABRT));
    let line = fatal_line(&output.stderr).expect("fatal diagnostic on stderr");
    assert_eq!(line["action"], "abort");
}

#[test]
fn valid_comparator_class_sorts_normally() {
    let output = harness()
        .args(["bind-failure", "--class", "benchmark/AscendingComparator"])
        .output()
        .expect("spawn harness");

    assert!(output.status.success());
    assert!(fatal_line(&output.stderr).is_none());
}
