// Test helpers for isolated testing
// Provides environments that never touch the real home directory or /etc

#![allow(dead_code)]

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Isolated test environment using temporary directories
/// Automatically cleaned up when dropped (RAII pattern)
///
/// The directory doubles as `$HOME` for binary runs, so the CLI resolves
/// `~/.cache/rpm-get`, `~/.config/rpm-get` and `~/.local/share/rpm-get`
/// inside it.
pub struct TestEnvironment {
    pub temp_dir: TempDir,
    pub home: PathBuf,
}

impl TestEnvironment {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let home = temp_dir.path().to_path_buf();
        Self { temp_dir, home }
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.home.join(".cache/rpm-get")
    }

    pub fn config_dir(&self) -> PathBuf {
        self.home.join(".config/rpm-get")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.home.join(".local/share/rpm-get")
    }

    /// `rpm-get` with `$HOME` pointed here and colors off.
    pub fn cmd(&self) -> Command {
        let mut cmd: Command = cargo_bin_cmd!("rpm-get").into();
        cmd.env("HOME", &self.home)
            .env("NO_COLOR", "1")
            .env_remove("XDG_CACHE_HOME")
            .env_remove("RPM_GET_PACKAGES_REPO")
            .env_remove("CLICOLOR_FORCE")
            .env_remove("RUST_LOG");
        cmd
    }

    pub fn write_package_list(&self, names: &[&str]) {
        let dir = self.config_dir();
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("packages-list.json"), serde_json::to_string(names).unwrap())
            .unwrap();
    }

    pub fn write_manifest(&self, dir: &Path, name: &str, yaml: &str) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(dir.join(format!("{}.yaml", name)), yaml).unwrap();
    }
}

impl Default for TestEnvironment {
    fn default() -> Self {
        Self::new()
    }
}
