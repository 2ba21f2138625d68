//! Runtime configuration.
//!
//! All paths, endpoints and credentials live in one [`Config`] value that is
//! built once at startup and handed to each component. Defaults come from the
//! environment (`HOME`, `XDG_CACHE_HOME`, `GITHUB_TOKEN`, `GITLAB_TOKEN`,
//! `RPM_GET_PACKAGES_REPO`); an optional `~/.config/rpm-get/config.json` can
//! override the paths, the manifest repository and the user agent.

use crate::error::Result;
use crate::platform;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Repository hosting `packages-list.json` and the `manifests/` directory.
pub const PKGS_REPO: &str = "https://github.com/FlawlessCasual17/rpm-get.Packages";

/// System-wide rpm-get directory, created by the first `install`.
pub const ETC_DIR: &str = "/etc/rpm-get";

/// System directory for YUM/DNF `.repo` files.
pub const YUM_REPOS_DIR: &str = "/etc/yum.repos.d";

pub const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone)]
pub struct Config {
    pub cache_dir: PathBuf,
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
    pub etc_dir: PathBuf,
    pub yum_repos_dir: PathBuf,
    pub packages_repo: String,
    pub user_agent: String,
    pub github_token: String,
    pub gitlab_token: String,
}

/// Keys accepted in `config.json`. Anything omitted keeps its default.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    cache_dir: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    yum_repos_dir: Option<PathBuf>,
    packages_repo: Option<String>,
    user_agent: Option<String>,
}

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn env_or_empty(key: &str) -> String {
    std::env::var(key).unwrap_or_default()
}

/// Browser-like user agent; some download pages refuse unknown clients.
pub fn default_user_agent() -> String {
    format!(
        "Mozilla/5.0 (X11; Linux {}) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36",
        platform::host_cpu()
    )
}

impl Config {
    /// Build the default configuration from the environment.
    pub fn from_env() -> Self {
        let home = home_dir();
        let cache_dir = match std::env::var_os("XDG_CACHE_HOME") {
            Some(cache_home) => PathBuf::from(cache_home).join("rpm-get"),
            None => home.join(".cache/rpm-get"),
        };

        Self {
            cache_dir,
            config_dir: home.join(".config/rpm-get"),
            data_dir: home.join(".local/share/rpm-get"),
            etc_dir: PathBuf::from(ETC_DIR),
            yum_repos_dir: PathBuf::from(YUM_REPOS_DIR),
            packages_repo: std::env::var("RPM_GET_PACKAGES_REPO")
                .unwrap_or_else(|_| PKGS_REPO.to_string()),
            user_agent: default_user_agent(),
            github_token: env_or_empty("GITHUB_TOKEN"),
            gitlab_token: env_or_empty("GITLAB_TOKEN"),
        }
    }

    /// Load the environment defaults, then apply `config.json` if present.
    pub fn load() -> Result<Self> {
        let mut config = Self::from_env();
        let path = config.config_file();
        if path.exists() {
            config.apply_file(&path)?;
        }
        Ok(config)
    }

    /// Configuration rooted entirely under `root`.
    pub fn with_root(root: &Path) -> Self {
        Self {
            cache_dir: root.join("cache"),
            config_dir: root.join("config"),
            data_dir: root.join("data"),
            etc_dir: root.join("etc/rpm-get"),
            yum_repos_dir: root.join("etc/yum.repos.d"),
            packages_repo: PKGS_REPO.to_string(),
            user_agent: default_user_agent(),
            github_token: String::new(),
            gitlab_token: String::new(),
        }
    }

    fn apply_file(&mut self, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path)?;
        let file: ConfigFile = serde_json::from_str(&content)?;
        tracing::debug!("Loaded configuration from {}", path.display());

        if let Some(dir) = file.cache_dir {
            self.cache_dir = dir;
        }
        if let Some(dir) = file.data_dir {
            self.data_dir = dir;
        }
        if let Some(dir) = file.yum_repos_dir {
            self.yum_repos_dir = dir;
        }
        if let Some(repo) = file.packages_repo {
            self.packages_repo = repo;
        }
        if let Some(agent) = file.user_agent {
            self.user_agent = agent;
        }
        Ok(())
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }

    pub fn packages_list_file(&self) -> PathBuf {
        self.config_dir.join("packages-list.json")
    }

    pub fn state_file(&self) -> PathBuf {
        self.config_dir.join("state.json")
    }

    /// Raw-content base URL of the manifest repository's default branch.
    pub fn raw_base_url(&self) -> String {
        format!(
            "{}/raw/refs/heads/master",
            self.packages_repo.trim_end_matches('/')
        )
    }

    pub fn packages_list_url(&self) -> String {
        format!("{}/packages-list.json", self.raw_base_url())
    }

    pub fn manifest_url(&self, package: &str) -> String {
        format!("{}/manifests/{}.json", self.raw_base_url(), package)
    }

    /// `Bearer <token>`; the token part is empty when `GITHUB_TOKEN` is unset.
    pub fn github_auth_header(&self) -> String {
        format!("Bearer {}", self.github_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_urls() {
        let config = Config::with_root(Path::new("/tmp/x"));
        assert_eq!(
            config.packages_list_url(),
            "https://github.com/FlawlessCasual17/rpm-get.Packages/raw/refs/heads/master/packages-list.json"
        );
        assert_eq!(
            config.manifest_url("bitwarden"),
            "https://github.com/FlawlessCasual17/rpm-get.Packages/raw/refs/heads/master/manifests/bitwarden.json"
        );
    }

    #[test]
    fn test_github_auth_header_without_token() {
        let config = Config::with_root(Path::new("/tmp/x"));
        assert_eq!(config.github_auth_header(), "Bearer ");
    }

    #[test]
    fn test_config_file_overrides() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::with_root(tmp.path());
        std::fs::create_dir_all(&config.config_dir).unwrap();
        std::fs::write(
            config.config_file(),
            r#"{"packages_repo": "https://example.test/pkgs/", "user_agent": "test-agent"}"#,
        )
        .unwrap();

        config.apply_file(&config.config_file()).unwrap();
        assert_eq!(config.user_agent, "test-agent");
        assert_eq!(
            config.packages_list_url(),
            "https://example.test/pkgs/raw/refs/heads/master/packages-list.json"
        );
    }

    #[test]
    fn test_config_file_rejects_unknown_keys() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::with_root(tmp.path());
        std::fs::create_dir_all(&config.config_dir).unwrap();
        std::fs::write(config.config_file(), r#"{"cache": "/nope"}"#).unwrap();
        assert!(config.apply_file(&config.config_file()).is_err());
    }
}
