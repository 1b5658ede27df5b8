use std::fs;
use std::path::PathBuf;

use taskdb::config::{Config, CONFIG_FILE};
use taskdb::db::TaskDb;
use taskdb::lock::LockPolicy;

#[test]
fn config_defaults_match_expected() {
    let cfg = Config::default();
    assert!(cfg.locking);
    assert!(cfg.gc);
    assert!(!cfg.debug);
    assert_eq!(cfg.lock_policy(), LockPolicy::with_timeout(5000));
}

#[test]
fn partial_config_keeps_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join(CONFIG_FILE), "gc = false\n").expect("write config");

    let cfg = Config::load_from_dir(dir.path()).expect("load config");
    assert!(!cfg.gc);
    assert!(cfg.locking);
    assert_eq!(cfg.lock_timeout_ms, 5000);
}

#[test]
fn malformed_toml_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join(CONFIG_FILE);
    fs::write(&path, "locking = \"sometimes\"").expect("write config");

    let err = Config::load(&path).expect_err("bad type");
    assert_eq!(err.exit_code(), taskdb::error::exit_codes::OPERATION_FAILED);
}

#[test]
fn data_location_opens_database() {
    let dir = tempfile::tempdir().expect("tempdir");
    let data = dir.path().join("tasks");
    let cfg = Config {
        data_location: Some(data.clone()),
        ..Config::default()
    };
    let path = dir.path().join(CONFIG_FILE);
    cfg.save(&path).expect("save config");

    let loaded = Config::load(&path).expect("load config");
    assert_eq!(loaded.data_location, Some(PathBuf::from(&data)));
    let db = TaskDb::from_config(&loaded).expect("open db");
    assert_eq!(db.location(), data);
    assert!(data.is_dir());
}
