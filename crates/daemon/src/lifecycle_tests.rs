// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

#[test]
fn relative_paths_resolve_against_base() {
    let config = Config::default();
    let paths = Paths::resolve(&config, Path::new("/etc/strata"));

    assert_eq!(paths.store, PathBuf::from("/etc/strata/.strata/store"));
    assert_eq!(paths.artifacts, PathBuf::from("/etc/strata/.strata/artifacts"));
    assert_eq!(paths.log, PathBuf::from("/etc/strata/.strata/stratad.log"));
    assert_eq!(paths.state_dir, PathBuf::from("/etc/strata/.strata"));
    assert_eq!(paths.pid, PathBuf::from("/etc/strata/.strata/stratad.pid"));
}

#[test]
fn absolute_paths_are_kept() {
    let mut config = Config::default();
    config.store.path = PathBuf::from("/var/lib/strata/store");
    config.log.path = PathBuf::from("/var/log/strata/stratad.log");

    let paths = Paths::resolve(&config, Path::new("/etc/strata"));

    assert_eq!(paths.store, PathBuf::from("/var/lib/strata/store"));
    assert_eq!(paths.pid, PathBuf::from("/var/log/strata/stratad.pid"));
}

#[tokio::test]
async fn startup_writes_pid_and_excludes_second_daemon() {
    let dir = tempdir().unwrap();
    let paths = Paths::resolve(&Config::default(), dir.path());

    let daemon = startup(&Config::default(), &paths).await.unwrap();
    let pid = std::fs::read_to_string(&paths.pid).unwrap();
    assert_eq!(pid.trim(), std::process::id().to_string());
    assert!(paths.store.is_dir());
    assert!(paths.artifacts.is_dir());

    let second = startup(&Config::default(), &paths).await;
    assert!(matches!(second, Err(LifecycleError::LockFailed(_))));
    // The running daemon keeps its pid file
    assert!(paths.pid.exists());

    drop(daemon);
}

#[tokio::test]
async fn run_stops_on_shutdown_and_removes_pid_file() {
    let dir = tempdir().unwrap();
    let paths = Paths::resolve(&Config::default(), dir.path());
    let daemon = startup(&Config::default(), &paths).await.unwrap();

    let (tx, rx) = watch::channel(false);
    tx.send(true).unwrap();
    daemon.run(rx).await;

    assert!(!paths.pid.exists());
    // Lock is released: a new daemon can start
    startup(&Config::default(), &paths).await.unwrap();
}

#[tokio::test]
async fn recover_counts_active_runs() {
    let dir = tempdir().unwrap();
    let store = FsStore::open(dir.path()).unwrap();
    assert_eq!(recover(&store).await.unwrap(), 0);
}
