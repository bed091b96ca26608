// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::sync_window::WindowKind;

#[test]
fn empty_config_uses_defaults() {
    let config = Config::parse("").unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.timers.drift_detection, Duration::from_secs(1200));
    assert_eq!(config.timers.on_error, Duration::from_secs(60));
    assert_eq!(config.timers.wait_action, Duration::from_secs(60));
    assert_eq!(config.timers.failure_grace_period, Duration::from_secs(15));
    assert_eq!(config.controller.max_concurrent_reconciles, 4);
    assert_eq!(config.controller.default_max_retries, 5);
    assert_eq!(config.controller.default_keep_last_runs, 5);
    assert_eq!(config.controller.watch_interval, Duration::from_secs(2));
}

#[test]
fn parses_full_config() {
    let toml = r#"
[timers]
drift_detection = "1h"
on_error = "30s"
wait_action = "2m"
failure_grace_period = "10s"
reconcile_deadline = "45s"

[controller]
max_concurrent_reconciles = 8
resync_interval = "10m"
default_max_retries = 3
default_keep_last_runs = 10

[runner]
command = "/usr/local/bin/runner"
args = ["--verbose"]
env = { TF_IN_AUTOMATION = "1" }

[store]
path = "/var/lib/strata/store"

[[sync_windows]]
kind = "deny"
schedule = "0 22 * * *"
duration = "8h"
layers = ["prod-*"]
actions = ["apply"]
"#;
    let config = Config::parse(toml).unwrap();
    assert_eq!(config.timers.drift_detection, Duration::from_secs(3600));
    assert_eq!(config.timers.reconcile_deadline, Duration::from_secs(45));
    assert_eq!(config.controller.max_concurrent_reconciles, 8);
    assert_eq!(config.runner.args, vec!["--verbose".to_string()]);
    assert_eq!(
        config.runner.env.get("TF_IN_AUTOMATION").map(String::as_str),
        Some("1")
    );
    assert_eq!(config.store.path, PathBuf::from("/var/lib/strata/store"));
    assert_eq!(config.sync_windows.len(), 1);
    assert_eq!(config.sync_windows[0].kind, WindowKind::Deny);

    let thresholds = config.timers.thresholds();
    assert_eq!(thresholds.drift_detection, Duration::from_secs(3600));
    assert_eq!(thresholds.failure_grace_period, Duration::from_secs(10));
}

#[test]
fn rejects_zero_concurrency() {
    let err = Config::parse("[controller]\nmax_concurrent_reconciles = 0\n").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "controller.max_concurrent_reconciles"));
}

#[test]
fn rejects_zero_watch_interval() {
    let err = Config::parse("[controller]\nwatch_interval = \"0s\"\n").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "controller.watch_interval"));
}

#[test]
fn rejects_bad_duration() {
    let err = Config::parse("[timers]\non_error = \"soon\"\n").unwrap_err();
    assert!(matches!(err, ConfigError::Toml(_)));
}

#[test]
fn rejects_unknown_fields() {
    assert!(Config::parse("[timers]\nbogus = \"1m\"\n").is_err());
}

#[test]
fn rejects_malformed_sync_window() {
    let toml = r#"
[[sync_windows]]
kind = "allow"
schedule = "every tuesday"
duration = "1h"
layers = ["*"]
"#;
    let err = Config::parse(toml).unwrap_err();
    assert!(matches!(err, ConfigError::SyncWindow { index: 0, .. }));
}

#[test]
fn load_reads_file_and_reports_missing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("strata.toml");
    assert!(matches!(Config::load(&path), Err(ConfigError::Io { .. })));
    assert_eq!(Config::load_or_default(&path).unwrap(), Config::default());

    std::fs::write(&path, "[controller]\ndefault_max_retries = 2\n").unwrap();
    assert_eq!(Config::load(&path).unwrap().controller.default_max_retries, 2);
}
