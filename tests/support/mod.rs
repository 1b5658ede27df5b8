#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

/// A throwaway task data directory
pub struct TestData {
    dir: TempDir,
}

impl TestData {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("failed to create tempdir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn read(&self, name: &str) -> String {
        fs::read_to_string(self.file(name)).unwrap_or_default()
    }

    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.file(name);
        fs::write(&path, contents).expect("write data file");
        path
    }

    /// Config file inside the data directory
    pub fn write_config(&self, contents: &str) -> PathBuf {
        self.write(".taskdb.toml", contents)
    }
}

/// The taskdb binary, isolated from the caller's environment
pub fn taskdb_cmd(data: &TestData) -> Command {
    let mut cmd = Command::cargo_bin("taskdb").expect("binary");
    cmd.current_dir(data.path())
        .env_remove("TASKDB_DATA")
        .env_remove("RUST_LOG")
        .arg("--data-dir")
        .arg(data.path());
    cmd
}

pub fn record(uuid: &str, status: &str, description: &str) -> String {
    format!("[description:\"{description}\" status:\"{status}\" uuid:\"{uuid}\"]")
}
