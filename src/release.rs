//! Latest-release cache for GitHub and GitLab hosted packages.
//!
//! Each package gets one cache file, `<cache_dir>/<package>_cache.json`, holding
//! the body of the upstream "latest release" endpoint:
//!
//! - GitHub: `https://api.github.com/repos/{owner}/{repo}/releases/latest`
//!   with `Authorization: Bearer $GITHUB_TOKEN`
//! - GitLab: `https://gitlab.com/api/v4/projects/{id}/releases/permalink/latest`
//!   with `PRIVATE-TOKEN: $GITLAB_TOKEN`
//!
//! Rate-limited responses are still written (the API returns a JSON error
//! document), then detected and deleted so a later run starts clean.

use crate::config::Config;
use crate::download;
use crate::error::{Result, RpmGetError};
use crate::http::{Request, Transport};
use crate::output;
use std::path::{Path, PathBuf};

pub const GITHUB_API_BASE: &str = "https://api.github.com/repos";
pub const GITLAB_API_BASE: &str = "https://gitlab.com/api/v4/projects";

/// Substring GitHub/GitLab put in rate-limit error bodies.
const RATE_LIMIT_MARKER: &str = "API rate limit exceeded";

/// Where a package's releases are published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseSource {
    GitHub { owner: String, repo: String },
    /// Numeric project id or a `group/sub/project` path.
    GitLab { project: String },
}

impl ReleaseSource {
    pub fn github(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        ReleaseSource::GitHub {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    pub fn gitlab(project: impl Into<String>) -> Self {
        ReleaseSource::GitLab {
            project: project.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ReleaseSource::GitHub { .. } => "github",
            ReleaseSource::GitLab { .. } => "gitlab",
        }
    }

    /// "Latest release" API URL.
    pub fn api_url(&self) -> String {
        match self {
            ReleaseSource::GitHub { owner, repo } => {
                format!("{}/{}/{}/releases/latest", GITHUB_API_BASE, owner, repo)
            }
            ReleaseSource::GitLab { project } => format!(
                "{}/{}/releases/permalink/latest",
                GITLAB_API_BASE,
                project.replace('/', "%2F")
            ),
        }
    }

    /// Authentication header for this source.
    pub fn auth_header(&self, config: &Config) -> (String, String) {
        match self {
            ReleaseSource::GitHub { .. } => {
                ("Authorization".to_string(), config.github_auth_header())
            }
            ReleaseSource::GitLab { .. } => {
                ("PRIVATE-TOKEN".to_string(), config.gitlab_token.clone())
            }
        }
    }

    pub fn request(&self, config: &Config) -> Request {
        let (key, value) = self.auth_header(config);
        Request::get(self.api_url()).header(key, value)
    }
}

pub fn cache_file_path(config: &Config, package: &str) -> PathBuf {
    config.cache_dir.join(format!("{}_cache.json", package))
}

/// Create `dir` (and parents) with mode 0755 if it does not exist.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        return Ok(());
    }

    use std::os::unix::fs::DirBuilderExt;
    std::fs::DirBuilder::new()
        .recursive(true)
        .mode(0o755)
        .create(dir)
        .map_err(|e| {
            RpmGetError::Other(anyhow::anyhow!(
                "Unable to create {}: {}",
                dir.display(),
                e
            ))
        })
}

pub fn is_rate_limited(feedback: &str) -> bool {
    feedback.contains(RATE_LIMIT_MARKER)
}

/// Text to scan for a rate-limit marker. GitHub error bodies carry it in a
/// top-level `message` field; anything else is scanned verbatim.
fn feedback_message(source: &ReleaseSource, content: &str) -> String {
    if let ReleaseSource::GitHub { .. } = source
        && let Ok(serde_json::Value::Object(map)) = serde_json::from_str(content)
        && let Some(serde_json::Value::String(message)) = map.get("message")
    {
        return message.clone();
    }
    content.to_string()
}

/// Delete `cache_file` if it holds a rate-limit response. Returns whether
/// it was deleted.
pub fn invalidate_if_rate_limited(source: &ReleaseSource, cache_file: &Path) -> Result<bool> {
    let content = match std::fs::read_to_string(cache_file) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e.into()),
    };

    if !is_rate_limited(&feedback_message(source, &content)) {
        return Ok(false);
    }

    output::printc("API rate limit exceeded!", output::Severity::Warning, true);
    output::printc("Deleting cache file...", output::Severity::Info, true);
    std::fs::remove_file(cache_file)?;
    Ok(true)
}

/// Download the latest release metadata for `package` into its cache file.
pub async fn fetch_latest_release<T: Transport + ?Sized>(
    transport: &T,
    config: &Config,
    package: &str,
    source: &ReleaseSource,
    quiet: bool,
) -> Result<PathBuf> {
    ensure_dir(&config.cache_dir)?;

    let cache_file = cache_file_path(config, package);
    let request = source.request(config);
    let url = request.url.clone();
    tracing::info!("Fetching {} release info for {} from {}", source.kind(), package, url);

    let downloaded =
        download::download_to(transport, request, &cache_file, "Downloading...", quiet).await?;

    if invalidate_if_rate_limited(source, &cache_file)? {
        return Err(RpmGetError::RateLimited(url));
    }

    if !downloaded.is_success() {
        let _ = std::fs::remove_file(&cache_file);
        return Err(RpmGetError::HttpStatus {
            url,
            status: downloaded.status,
        });
    }

    Ok(cache_file)
}

/// `tag_name` of a cached release document.
pub fn latest_tag(cache_file: &Path) -> Result<String> {
    let content = std::fs::read_to_string(cache_file)?;
    let value: serde_json::Value = serde_json::from_str(&content)?;
    match value.get("tag_name") {
        Some(serde_json::Value::String(tag)) => Ok(tag.clone()),
        Some(other) => Err(RpmGetError::NotAString {
            expr: "tag_name".to_string(),
            found: other.to_string(),
        }),
        None => Err(RpmGetError::NothingSelected {
            expr: "tag_name".to_string(),
        }),
    }
}
