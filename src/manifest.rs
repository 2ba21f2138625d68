//! Package manifest schema.
//!
//! A manifest describes one installable package: where to download it for
//! each architecture, which repository (if any) provides it, and how to find
//! out the latest upstream version. Manifests are authored in YAML or JSON;
//! both parse into [`Manifest`].
//!
//! ```yaml
//! name: bitwarden
//! version: 2025.4.2
//! license: GPL-3.0-only
//! homepage: https://bitwarden.com
//! description: Password manager
//! supported_os: [fedora, rhel]
//! pkg_arches: [x86_64]
//! arch:
//!   x86_64:
//!     url: https://github.com/bitwarden/clients/releases/download/desktop-v2025.4.2/Bitwarden-2025.4.2-x86_64.rpm
//! auto_update:
//!   check_version:
//!     use_latest: true
//!     github: bitwarden/clients
//!     regex: 'desktop-v([\d.]+)'
//!   arch:
//!     x86_64:
//!       url: https://github.com/bitwarden/clients/releases/download/desktop-v${version}/Bitwarden-${version}-x86_64.rpm
//! ```

use crate::error::{Result, RpmGetError};
use crate::platform::Arch;
use crate::release::ReleaseSource;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub name: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub version: String,
    #[serde(default)]
    pub license: Option<License>,
    #[serde(default)]
    pub homepage: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub supported_os: Vec<String>,
    #[serde(default)]
    pub pkg_arches: Vec<String>,
    #[serde(default)]
    pub arch: ArchUrls,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<Repo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommends: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggests: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replaces: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_update: Option<AutoUpdate>,
}

/// SPDX identifier (or free-form text), optionally with a license URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum License {
    Spdx(String),
    Detailed {
        identifier: String,
        #[serde(default)]
        url: Option<String>,
    },
}

impl License {
    pub fn identifier(&self) -> &str {
        match self {
            License::Spdx(id) => id,
            License::Detailed { identifier, .. } => identifier,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchUrl {
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchUrls {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x86_64: Option<ArchUrl>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x86: Option<ArchUrl>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arm64: Option<ArchUrl>,
}

impl ArchUrls {
    pub fn get(&self, arch: Arch) -> Option<&str> {
        let entry = match arch {
            Arch::X86_64 => &self.x86_64,
            Arch::X86 => &self.x86,
            Arch::Arm64 => &self.arm64,
        };
        entry.as_ref().map(|a| a.url.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlRepo {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpg_key_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoprRepo {
    pub username: String,
    pub project: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_repo: Option<UrlRepo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copr_repo: Option<CoprRepo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptType {
    Bash,
    Fish,
    Zsh,
    Pwsh,
    #[serde(alias = "nushell")]
    Nu,
    Python,
}

impl ScriptType {
    /// Interpreter and the flag that makes it run an inline script.
    pub fn interpreter(self) -> (&'static str, &'static str) {
        match self {
            ScriptType::Bash => ("bash", "-c"),
            ScriptType::Fish => ("fish", "-c"),
            ScriptType::Zsh => ("zsh", "-c"),
            ScriptType::Pwsh => ("pwsh", "-Command"),
            ScriptType::Nu => ("nu", "-c"),
            ScriptType::Python => ("python3", "-c"),
        }
    }
}

/// Inline script printing the latest version on stdout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub script_type: ScriptType,
    pub run: String,
}

/// GitHub (or Gitea/Forgejo/Codeberg style) repository coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GitHubRepo {
    /// `owner/repo`
    Short(String),
    Full { owner: String, repo: String },
}

impl GitHubRepo {
    pub fn source(&self) -> Result<ReleaseSource> {
        match self {
            GitHubRepo::Full { owner, repo } => Ok(ReleaseSource::github(owner, repo)),
            GitHubRepo::Short(s) => match s.split_once('/') {
                Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
                    Ok(ReleaseSource::github(owner, repo))
                }
                _ => Err(RpmGetError::Other(anyhow::anyhow!(
                    "Invalid GitHub repository '{}', expected 'owner/repo'",
                    s
                ))),
            },
        }
    }
}

/// GitLab project coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GitLabProject {
    /// `group/sub-group/project` or `profile/project`
    Path(String),
    Id { project_id: u64 },
    Group {
        group: String,
        #[serde(default)]
        sub_group: Option<String>,
        project: String,
    },
    Profile { profile: String, project: String },
}

impl GitLabProject {
    pub fn source(&self) -> ReleaseSource {
        match self {
            GitLabProject::Path(path) => ReleaseSource::gitlab(path.trim_matches('/')),
            GitLabProject::Id { project_id } => ReleaseSource::gitlab(project_id.to_string()),
            GitLabProject::Group {
                group,
                sub_group,
                project,
            } => match sub_group {
                Some(sub) => ReleaseSource::gitlab(format!("{}/{}/{}", group, sub, project)),
                None => ReleaseSource::gitlab(format!("{}/{}", group, project)),
            },
            GitLabProject::Profile { profile, project } => {
                ReleaseSource::gitlab(format!("{}/{}", profile, project))
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckVersion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsonpath: Option<String>,
    /// Path into a YAML document, in JSONPath syntax.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yamlpath: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xpath: Option<String>,
    /// CSS selector for HTML pages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    /// Parse the `xpath` document as HTML instead of strict XML.
    #[serde(default)]
    pub html: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<Script>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex_replace: Option<String>,
    #[serde(default)]
    pub use_latest: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<GitHubRepo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gitlab: Option<GitLabProject>,
}

impl CheckVersion {
    /// Release source for `use_latest`, GitHub taking precedence.
    pub fn release_source(&self) -> Result<Option<ReleaseSource>> {
        if let Some(github) = &self.github {
            return github.source().map(Some);
        }
        Ok(self.gitlab.as_ref().map(GitLabProject::source))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AutoUpdate {
    #[serde(default)]
    pub check_version: CheckVersion,
    /// Download URL templates; `${version}` is replaced by the resolved version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch: Option<ArchUrls>,
}

/// YAML reads an unquoted `version: 1.10` as the float `1.1`, so numbers are
/// refused rather than reformatted.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }

    let number = match Raw::deserialize(deserializer)? {
        Raw::Text(s) => return Ok(s),
        Raw::Int(i) => i.to_string(),
        Raw::Float(f) => f.to_string(),
    };
    Err(serde::de::Error::custom(format!(
        "version must be a string, found the number {}; quote it (version: \"...\")",
        number
    )))
}

impl Manifest {
    /// Parse a manifest; `.json` files use JSON, everything else YAML.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(serde_json::from_str(content)?),
            _ => Ok(serde_yaml::from_str(content)?),
        }
    }

    pub fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, path)
    }

    /// Whether the manifest lists `arch` in `pkg_arches`. An empty list
    /// means "any architecture that has a download URL".
    pub fn supports_arch(&self, arch: Arch) -> bool {
        if self.pkg_arches.is_empty() {
            return self.arch.get(arch).is_some() || self.repo.is_some();
        }
        self.pkg_arches
            .iter()
            .any(|a| Arch::from_name(a) == Some(arch))
    }

    pub fn license_identifier(&self) -> &str {
        self.license.as_ref().map(License::identifier).unwrap_or("")
    }
}
