//! Third-party repository management - `.repo` files and Copr projects

use crate::config::Config;
use crate::dnf::Dnf;
use crate::download;
use crate::error::{Result, RpmGetError};
use crate::http::{Request, Transport};
use crate::manifest::{CoprRepo, Repo, UrlRepo};
use crate::state::{RepoRecord, StateStore};

/// Adds and removes repositories, recording each one against the package it
/// was added for.
pub struct RepoManager<'a, T: Transport + ?Sized> {
    config: &'a Config,
    transport: &'a T,
    dnf: &'a Dnf<'a>,
    state: StateStore,
}

impl<'a, T: Transport + ?Sized> RepoManager<'a, T> {
    pub fn new(config: &'a Config, transport: &'a T, dnf: &'a Dnf<'a>) -> Self {
        Self {
            config,
            transport,
            dnf,
            state: StateStore::new(config.state_file()),
        }
    }

    /// Download a `.repo` file into the YUM repos directory.
    ///
    /// The file is written as `<name>.tmp` and renamed into place so dnf never
    /// sees a partial definition.
    pub async fn add_repo(&self, package: &str, url: &str, quiet: bool) -> Result<RepoRecord> {
        self.dnf.require_admin()?;

        let base_name = download::url_basename(url)
            .ok_or_else(|| anyhow::anyhow!("Cannot derive a repo file name from {}", url))?
            .to_string();
        std::fs::create_dir_all(&self.config.yum_repos_dir)?;
        let tmp_path = self.config.yum_repos_dir.join(format!("{}.tmp", base_name));
        let file_path = self.config.yum_repos_dir.join(&base_name);

        download::download_file(
            self.transport,
            Request::get(url),
            &tmp_path,
            "Downloading RPM repo...",
            quiet,
        )
        .await?;
        std::fs::rename(&tmp_path, &file_path)?;
        tracing::info!("Added repo {} for {}", file_path.display(), package);

        let record = RepoRecord::File { name: base_name };
        let stored = record.clone();
        self.state.update(|s| s.record_repo(package, stored))?;
        Ok(record)
    }

    /// `dnf copr enable -y <user>/<project>`
    pub fn add_copr_repo(&self, package: &str, username: &str, project: &str) -> Result<RepoRecord> {
        self.dnf.copr_enable(username, project)?;

        let record = RepoRecord::Copr {
            username: username.to_string(),
            project: project.to_string(),
        };
        let stored = record.clone();
        self.state.update(|s| s.record_repo(package, stored))?;
        Ok(record)
    }

    /// Add whatever repository a manifest describes, importing its key first.
    pub async fn add_manifest_repo(&self, package: &str, repo: &Repo, quiet: bool) -> Result<RepoRecord> {
        match (&repo.url_repo, &repo.copr_repo) {
            (Some(UrlRepo { url, gpg_key_url }), _) => {
                if let Some(key) = gpg_key_url {
                    self.dnf.import_key(key)?;
                }
                self.add_repo(package, url, quiet).await
            }
            (None, Some(CoprRepo { username, project })) => {
                self.add_copr_repo(package, username, project)
            }
            (None, None) => Err(RpmGetError::Other(anyhow::anyhow!(
                "Manifest for {} declares an empty repo section",
                package
            ))),
        }
    }

    /// Remove the repository previously added for `package`.
    pub fn remove_repo(&self, package: &str) -> Result<RepoRecord> {
        self.dnf.require_admin()?;

        let mut state = self.state.load()?;
        let record = state
            .repo_for(package)
            .cloned()
            .ok_or_else(|| RpmGetError::RepoNotRegistered(package.to_string()))?;

        match &record {
            RepoRecord::File { name } => {
                let path = self.config.yum_repos_dir.join(name);
                std::fs::remove_file(&path).map_err(|e| {
                    RpmGetError::Other(anyhow::anyhow!(
                        "Failed to remove the repo for {} ({}): {}",
                        package,
                        path.display(),
                        e
                    ))
                })?;
            }
            RepoRecord::Copr { username, project } => {
                self.dnf.copr_remove(username, project)?;
            }
        }

        state.take_repo(package);
        self.state.save(&state)?;
        tracing::info!("Removed repo {} for {}", record.display_name(), package);
        Ok(record)
    }
}
