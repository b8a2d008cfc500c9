use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

// Minimal config that touches neither the disk nor the network
fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[coin]
label = "Rs.2"
mass_g = 0.008
value = 2.0

[alert]
cooldown_s = 300
min_weight_g = 0.05
drop_threshold_g = 0.016

[store]
kind = "none"
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["breakdown", "--grams", "12.345"], 0, "coins: 1543", "stdout")]
#[case(&["breakdown", "--grams", "12.345", "--prize", "6172"], 0, "50.0%", "stdout")]
#[case(&["breakdown", "--grams", "0.0005"], 0, "coins: 0", "stdout")]
#[case(&["simulate"], 2, "required", "stderr")]
#[case(&["simulate", "10", "9.9"], 0, "ALERT", "stdout")]
#[case(&["self-check", "--sim"], 0, "self-check OK", "stdout")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("coinbank").unwrap();

    // Always include a valid config to avoid relying on default path
    cmd.arg("--config").arg(&cfg).arg("--log-level").arg("error");
    for a in args {
        cmd.arg(a);
    }

    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[rstest]
#[case("[coin]\nmass_g = 0.0\n", "coin.mass_g")]
#[case("[link]\nbaud = 0\n", "link.baud")]
#[case("[alert]\ndrop_threshold_g = -1.0\n", "alert.drop_threshold_g")]
#[case("[store]\nkind = \"tape\"\n", "invalid configuration")]
fn invalid_config_exits_with_two(#[case] toml: &str, #[case] needle: &str) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, toml).unwrap();

    Command::cargo_bin("coinbank")
        .unwrap()
        .arg("--config")
        .arg(&path)
        .args(["breakdown", "--grams", "1"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains(needle));
}

#[test]
fn missing_explicit_config_exits_with_two() {
    let dir = tempdir().unwrap();
    Command::cargo_bin("coinbank")
        .unwrap()
        .arg("--config")
        .arg(dir.path().join("nope.toml"))
        .args(["breakdown", "--grams", "1"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("nope.toml"));
}

#[cfg(feature = "serial")]
#[test]
fn self_check_reports_unreachable_port_with_exit_three() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cfg.toml");
    fs::write(
        &path,
        r#"
[link]
port = "/dev/coinbank-test-no-such-port"
auto_detect = false

[store]
kind = "none"
"#,
    )
    .unwrap();

    Command::cargo_bin("coinbank")
        .unwrap()
        .arg("--config")
        .arg(&path)
        .arg("--log-level")
        .arg("error")
        .arg("self-check")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("sensor"));
}

#[cfg(feature = "serial")]
#[test]
fn run_keeps_going_while_the_sensor_is_unplugged() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cfg.toml");
    fs::write(
        &path,
        r#"
[link]
port = "/dev/coinbank-test-no-such-port"
auto_detect = false
retry_backoff_ms = 50
reconnect_after = 2

[store]
kind = "none"
"#,
    )
    .unwrap();

    let out = Command::cargo_bin("coinbank")
        .unwrap()
        .arg("--json")
        .arg("--config")
        .arg(&path)
        .arg("--log-level")
        .arg("error")
        .args(["run", "--duration-s", "1"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8_lossy(&out);
    let last: serde_json::Value = serde_json::from_str(text.lines().last().unwrap()).unwrap();
    assert_eq!(last["type"], "final");
    assert_eq!(last["connected"], false);
    assert!(last["stats"]["link_errors"].as_u64().unwrap() >= 2);
    assert!(last["stats"]["reconnects"].as_u64().unwrap() >= 1);
}

#[test]
fn run_with_simulated_sensor_persists_readings() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("data").join("readings.csv");
    let path = dir.path().join("cfg.toml");
    fs::write(
        &path,
        format!(
            "[link]\npoll_ms = 50\n\n[store]\nkind = \"csv\"\npath = {:?}\n",
            log.display().to_string()
        ),
    )
    .unwrap();

    Command::cargo_bin("coinbank")
        .unwrap()
        .arg("--config")
        .arg(&path)
        .arg("--log-level")
        .arg("error")
        .args(["run", "--sim", "--duration-s", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("final:"));

    let text = fs::read_to_string(&log).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("timestamp,weight_g"));
    assert!(lines.next().is_some(), "no reading persisted: {text}");
}
