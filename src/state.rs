//! Persistent record of what rpm-get installed.
//!
//! `state.json` maps each package installed through rpm-get to the version it
//! resolved and the repository it registered, if any. `remove --remove-repo`
//! reads the repository back from here in a later invocation.
//!
//! ```json
//! {
//!   "packages": {
//!     "lazygit": {
//!       "version": "0.44.1",
//!       "installed_at": 1730000000,
//!       "repo": { "kind": "copr", "username": "atim", "project": "lazygit" }
//!     }
//!   }
//! }
//! ```

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const COPR_HUB: &str = "copr.fedorainfracloud.org";

/// A repository rpm-get added on behalf of a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RepoRecord {
    /// `.repo` file name inside the YUM repos directory.
    File { name: String },
    Copr { username: String, project: String },
}

impl RepoRecord {
    /// Human-readable name; for Copr this matches the repo id dnf assigns.
    pub fn display_name(&self) -> String {
        match self {
            RepoRecord::File { name } => name.clone(),
            RepoRecord::Copr { username, project } => {
                format!("_copr:{}:{}:{}", COPR_HUB, username, project)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledPackage {
    #[serde(default)]
    pub version: String,
    pub installed_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<RepoRecord>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    #[serde(default)]
    pub packages: BTreeMap<String, InstalledPackage>,
    /// Repositories registered for packages that are not (yet) recorded as
    /// installed, e.g. when `dnf install` failed after the repo was added.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub repos: BTreeMap<String, RepoRecord>,
}

/// Loads and saves [`State`] at a fixed path.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current state; a missing file is an empty state.
    pub fn load(&self) -> Result<State> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(State::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write through a temp file so a crash never leaves half a document.
    pub fn save(&self, state: &State) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(state)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Load, apply `f`, save.
    pub fn update<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut State) -> R,
    {
        let mut state = self.load()?;
        let result = f(&mut state);
        self.save(&state)?;
        Ok(result)
    }
}

impl State {
    pub fn record_repo(&mut self, package: &str, repo: RepoRecord) {
        match self.packages.get_mut(package) {
            Some(installed) => installed.repo = Some(repo),
            None => {
                self.repos.insert(package.to_string(), repo);
            }
        }
    }

    pub fn repo_for(&self, package: &str) -> Option<&RepoRecord> {
        self.packages
            .get(package)
            .and_then(|p| p.repo.as_ref())
            .or_else(|| self.repos.get(package))
    }

    pub fn take_repo(&mut self, package: &str) -> Option<RepoRecord> {
        let from_installed = self
            .packages
            .get_mut(package)
            .and_then(|p| p.repo.take());
        from_installed.or_else(|| self.repos.remove(package))
    }

    /// Record an installation, adopting any repo registered beforehand.
    pub fn record_install(&mut self, package: &str, version: &str) {
        let pending_repo = self.repos.remove(package);
        let entry = self
            .packages
            .entry(package.to_string())
            .or_insert_with(|| InstalledPackage {
                version: String::new(),
                installed_at: 0,
                repo: None,
            });
        entry.version = version.to_string();
        entry.installed_at = chrono::Utc::now().timestamp();
        if pending_repo.is_some() {
            entry.repo = pending_repo;
        }
    }

    /// Forget a package, keeping its repo record so the repo can still be
    /// removed later.
    pub fn record_remove(&mut self, package: &str) -> Option<InstalledPackage> {
        let removed = self.packages.remove(package);
        if let Some(repo) = removed.as_ref().and_then(|p| p.repo.clone()) {
            self.repos.insert(package.to_string(), repo);
        }
        removed
    }

    pub fn is_installed(&self, package: &str) -> bool {
        self.packages.contains_key(package)
    }
}
