//! Integration tests for the `cuelight` binary.
//!
//! Every test runs against a host profile written to a temp dir and an
//! isolated config file, so nothing depends on the machine's own setup.

use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

const DESK: &str = r##"
[session]
server = "4.0.84"
host = "4.1.0"

[[devices]]
category = "keyboard"
id = "{kb-1}"
model = "K95"
serial = "KB-001"
grid = 10
[devices.symbols]
w = 2
a = 3

[[devices]]
category = "mouse"
id = "{mouse-1}"
model = "M65"
[[devices.leds]]
id = 1
cx = 1.0
cy = 2.0
color = "#00FF00"
"##;

struct Fixture {
    _dir: tempfile::TempDir,
    profile: PathBuf,
    config: PathBuf,
}

fn fixture(profile: &str) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let profile_path = dir.path().join("host.toml");
    std::fs::write(&profile_path, profile).unwrap();
    let config = dir.path().join("config.toml");
    Fixture {
        profile: profile_path,
        config,
        _dir: dir,
    }
}

fn cli_with(config: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("cuelight");
    cmd.arg("--config").arg(config);
    cmd
}

impl Fixture {
    fn cli(&self) -> assert_cmd::Command {
        let mut cmd = cli_with(&self.config);
        cmd.arg("--profile").arg(&self.profile);
        cmd
    }

    fn json(&self, args: &[&str]) -> serde_json::Value {
        let output = self
            .cli()
            .arg("--json")
            .args(args)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&output).expect("--json should produce valid JSON")
    }
}

#[test]
fn cli_help_succeeds() {
    cargo_bin_cmd!("cuelight")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("cuelight"));
}

#[test]
fn cli_version_prints_version() {
    cargo_bin_cmd!("cuelight")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

// ── config ──

#[test]
fn cli_config_json_produces_valid_json() {
    let fx = fixture(DESK);
    let json = fx.json(&["config"]);
    assert!(json["settings"].is_object());
    assert_eq!(json["settings"]["fill_color"], "#FFFFFF");
    assert_eq!(json["config_file_exists"], false);
    assert!(json["problems"].as_array().unwrap().is_empty());
}

#[test]
fn cli_config_reports_problems() {
    let fx = fixture(DESK);
    std::fs::write(&fx.config, "fill_color = \"chartreuse\"\n").unwrap();
    cli_with(&fx.config)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("(loaded)"))
        .stdout(predicate::str::contains("Invalid fill color"));
}

// ── --verbose flag ──

#[test]
fn cli_verbose_flag_accepted() {
    let fx = fixture(DESK);
    fx.cli().args(["-v", "config"]).assert().success();
}

#[test]
fn cli_verbose_long_flag_accepted() {
    let fx = fixture(DESK);
    fx.cli().args(["--verbose", "config"]).assert().success();
}

// ── devices / leds ──

#[test]
fn cli_devices_lists_one_per_category() {
    let fx = fixture(DESK);
    let json = fx.json(&["devices"]);
    assert_eq!(json["count"], 2);
    assert_eq!(json["devices"][0]["category"], "keyboard");
    assert_eq!(json["devices"][0]["model"], "K95");
    assert_eq!(json["devices"][0]["led_count"], 10);
    assert_eq!(json["devices"][1]["category"], "mouse");
    assert_eq!(json["devices"][1]["access"], "shared");
}

#[test]
fn cli_devices_human_output() {
    let fx = fixture(DESK);
    fx.cli()
        .arg("devices")
        .assert()
        .success()
        .stdout(predicate::str::contains("Found 2 devices"))
        .stdout(predicate::str::contains("Serial:  KB-001"));
}

#[test]
fn cli_devices_exclusive_from_config() {
    let fx = fixture(DESK);
    std::fs::write(&fx.config, "exclusive_access = true\n").unwrap();
    let json = fx.json(&["devices"]);
    assert_eq!(json["devices"][0]["access"], "exclusive lighting");
}

#[test]
fn cli_without_profile_fails() {
    let fx = fixture(DESK);
    cli_with(&fx.config)
        .arg("devices")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no lighting host available"));
}

#[test]
fn cli_profile_from_config() {
    let fx = fixture(DESK);
    let line = format!("host_profile = {:?}\n", fx.profile.display().to_string());
    std::fs::write(&fx.config, line).unwrap();
    cli_with(&fx.config)
        .args(["--json", "devices"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"K95\""));
}

#[test]
fn cli_unknown_category_in_profile_fails() {
    let fx = fixture(
        r#"
[[devices]]
category = "0x800"
id = "{x}"
model = "Mystery"
"#,
    );
    fx.cli()
        .arg("devices")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown device category 0x0800"));
}

#[test]
fn cli_leds_reports_positions_and_colors() {
    let fx = fixture(DESK);
    let json = fx.json(&["leds", "mouse"]);
    assert_eq!(json["device"]["id"], "{mouse-1}");
    let leds = json["leds"].as_array().unwrap();
    assert_eq!(leds.len(), 1);
    assert_eq!(leds[0]["id"], 1);
    assert_eq!(leds[0]["color"], "#00FF00");
    assert_eq!(leds[0]["rect"]["x"], 0.5);
    assert_eq!(leds[0]["rect"]["width"], 1.0);
}

#[test]
fn cli_leds_missing_category_fails() {
    let fx = fixture(DESK);
    fx.cli()
        .args(["leds", "headset"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No Headset device is available"));
}

#[test]
fn cli_leds_rejects_bad_category() {
    let fx = fixture(DESK);
    fx.cli()
        .args(["leds", "toaster"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown device category"));
}

// ── symbol ──

#[test]
fn cli_symbol_resolves_keyboard_led() {
    let fx = fixture(DESK);
    let json = fx.json(&["symbol", "w"]);
    assert_eq!(json["led"], 2);
}

#[test]
fn cli_symbol_unknown_is_not_an_error() {
    let fx = fixture(DESK);
    let json = fx.json(&["symbol", "z"]);
    assert!(json["led"].is_null());
    fx.cli()
        .args(["symbol", "z"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No keyboard LED"));
}

// ── set ──

#[test]
fn cli_set_lights_selection_and_restores() {
    let fx = fixture(DESK);
    let json = fx.json(&["set", "keyboard", "--leds", "1,3", "--symbols", "w", "--color", "red"]);
    assert_eq!(json["requested"], 3);
    assert_eq!(json["sent"], 3);
    let applied = json["applied"].as_array().unwrap();
    assert_eq!(applied.len(), 3);
    assert!(applied.iter().all(|l| l["color"] == "#FF0000"));
    // restore_on_exit defaults to true: every keyboard LED goes back
    assert_eq!(json["restored"], 10);
}

#[test]
fn cli_set_uses_config_fill_without_restore() {
    let fx = fixture(DESK);
    std::fs::write(
        &fx.config,
        "fill_color = \"#0000FF\"\nrestore_on_exit = false\n",
    )
    .unwrap();
    let json = fx.json(&["set", "mouse", "--all"]);
    assert_eq!(json["color"], "#0000FF");
    assert_eq!(json["sent"], 1);
    assert!(json["restored"].is_null());
}

#[test]
fn cli_set_skips_unknown_leds() {
    let fx = fixture(DESK);
    let json = fx.json(&["set", "mouse", "--leds", "1,99"]);
    assert_eq!(json["requested"], 1);
}

#[test]
fn cli_set_rejects_bad_color() {
    let fx = fixture(DESK);
    fx.cli()
        .args(["set", "keyboard", "--all", "--color", "chartreuse"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Color error"));
}

#[test]
fn cli_set_human_output() {
    let fx = fixture(DESK);
    fx.cli()
        .args(["set", "keyboard", "--symbols", "wa", "--color", "#00FF00"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Sent 2 LED updates to Keyboard K95"))
        .stdout(predicate::str::contains("Restored 10 LEDs on exit."));
}

// ── status ──

#[test]
fn cli_status_json_with_host() {
    let fx = fixture(DESK);
    let json = fx.json(&["status"]);
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(json["session"]["state"], "ready");
    assert_eq!(json["session"]["host_state"], "connected");
    assert_eq!(json["session"]["protocol"]["breaking_changes"], false);
    assert_eq!(json["session"]["devices"][1], "mouse");
    assert!(json["error"].is_null());
}

#[test]
fn cli_status_without_host_still_succeeds() {
    let fx = fixture(DESK);
    let output = cli_with(&fx.config)
        .args(["--json", "status"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert!(json["session"].is_null());
    assert!(
        json["error"]
            .as_str()
            .unwrap()
            .contains("no lighting host available")
    );
}

#[test]
fn cli_status_human_output() {
    let fx = fixture(DESK);
    fx.cli()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("ready"))
        .stdout(predicate::str::contains("Keyboard, Mouse"));
}
