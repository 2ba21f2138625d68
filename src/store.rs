//! Local copy of the package list and package manifests.
//!
//! `packages-list.json` lives in the config directory and is only replaced
//! when a freshly downloaded copy hashes differently, so an unchanged upstream
//! never rewrites the file or reports a spurious update. Manifests live in the
//! data directory, one file per package.

use crate::config::Config;
use crate::download;
use crate::error::{Result, RpmGetError};
use crate::http::{Request, Transport};
use crate::manifest::Manifest;
use crate::output;
use crate::release::ensure_dir;
use std::path::{Path, PathBuf};

/// Manifest file extensions, in lookup order.
const MANIFEST_EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListUpdate {
    Updated,
    UpToDate,
}

/// Download the package list and swap it in if its SHA-256 changed.
pub async fn update_package_list<T: Transport + ?Sized>(
    transport: &T,
    config: &Config,
    quiet: bool,
) -> Result<ListUpdate> {
    ensure_dir(&config.config_dir)?;

    let list_path = config.packages_list_file();
    let tmp_path = config.config_dir.join("packages-list.json.tmp");

    download::download_file(
        transport,
        Request::get(config.packages_list_url()),
        &tmp_path,
        "Updating packages list...",
        quiet,
    )
    .await?;

    let new_hash = download::file_sha256(&tmp_path).await?;
    let old_hash = download::file_sha256_opt(&list_path).await?;
    tracing::debug!("packages list hashes: new={} old={:?}", new_hash, old_hash);

    if old_hash.as_deref() == Some(new_hash.as_str()) {
        tokio::fs::remove_file(&tmp_path).await?;
        return Ok(ListUpdate::UpToDate);
    }

    tokio::fs::rename(&tmp_path, &list_path).await?;
    Ok(ListUpdate::Updated)
}

/// Read the local package list.
pub fn load_package_list(config: &Config) -> Result<Vec<String>> {
    let path = config.packages_list_file();
    let content = std::fs::read_to_string(&path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            RpmGetError::Other(anyhow::anyhow!(
                "Package list not found at {}; run `rpm-get update` first",
                path.display()
            ))
        } else {
            e.into()
        }
    })?;
    Ok(serde_json::from_str(&content)?)
}

/// Download every manifest in `packages` into the data directory, stopping at
/// the first failure.
pub async fn fetch_manifests<T: Transport + ?Sized>(
    transport: &T,
    config: &Config,
    packages: &[String],
    quiet: bool,
) -> Result<Vec<PathBuf>> {
    ensure_dir(&config.data_dir)?;
    if !quiet {
        output::info("Downloading package manifests...");
    }

    let mut written = Vec::with_capacity(packages.len());
    for package in packages {
        let url = config.manifest_url(package);
        let file_name = download::url_basename(&url)
            .ok_or_else(|| anyhow::anyhow!("Invalid manifest URL: {}", url))?
            .to_string();
        let path = config.data_dir.join(file_name);

        download::download_file(transport, Request::get(url), &path, package, quiet)
            .await
            .inspect_err(|_| {
                output::error(format!("Failed to download package manifest for {}", package))
            })?;
        written.push(path);
    }

    Ok(written)
}

/// Path of the manifest for `package`, whichever format it was stored in.
pub fn manifest_path(config: &Config, package: &str) -> Option<PathBuf> {
    MANIFEST_EXTENSIONS
        .iter()
        .map(|ext| config.data_dir.join(format!("{}.{}", package, ext)))
        .find(|p| p.exists())
}

pub fn load_manifest(config: &Config, package: &str) -> Result<Manifest> {
    match manifest_path(config, package) {
        Some(path) => Manifest::read(&path),
        None => Err(RpmGetError::PackageNotFound(package.to_string())),
    }
}

/// Names of all manifests present in the data directory.
pub fn local_manifest_names(config: &Config) -> Result<Vec<String>> {
    if !config.data_dir.exists() {
        return Ok(Vec::new());
    }

    let mut names: Vec<String> = std::fs::read_dir(&config.data_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| has_manifest_extension(path))
        .filter_map(|path| path.file_stem().map(|s| s.to_string_lossy().to_string()))
        .collect();
    names.sort();
    names.dedup();
    Ok(names)
}

fn has_manifest_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| MANIFEST_EXTENSIONS.contains(&e))
}

/// Closest known package names to `name`, best first.
pub fn suggest(name: &str, known: &[String]) -> Vec<String> {
    let mut scored: Vec<(f64, &String)> = known
        .iter()
        .map(|k| (strsim::jaro_winkler(name, k), k))
        .filter(|(score, _)| *score > 0.8)
        .collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.into_iter().take(3).map(|(_, k)| k.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::MemoryTransport;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Config, MemoryTransport) {
        let tmp = TempDir::new().unwrap();
        let config = Config::with_root(tmp.path());
        (tmp, config, MemoryTransport::new())
    }

    #[tokio::test]
    async fn test_first_update_writes_list() {
        let (_tmp, config, transport) = setup();
        transport.route(&config.packages_list_url(), 200, r#"["bitwarden","lazygit"]"#);

        let result = update_package_list(&transport, &config, true).await.unwrap();
        assert_eq!(result, ListUpdate::Updated);
        assert_eq!(
            load_package_list(&config).unwrap(),
            vec!["bitwarden".to_string(), "lazygit".to_string()]
        );
        assert!(!config.config_dir.join("packages-list.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_identical_list_leaves_file_untouched() {
        let (_tmp, config, transport) = setup();
        let body = r#"["bitwarden"]"#;
        transport.route(&config.packages_list_url(), 200, body);

        std::fs::create_dir_all(&config.config_dir).unwrap();
        let list_path = config.packages_list_file();
        std::fs::write(&list_path, body).unwrap();
        let before_hash = download::file_sha256(&list_path).await.unwrap();
        let before_mtime = std::fs::metadata(&list_path).unwrap().modified().unwrap();

        let result = update_package_list(&transport, &config, true).await.unwrap();
        assert_eq!(result, ListUpdate::UpToDate);

        let after_hash = download::file_sha256(&list_path).await.unwrap();
        let after_mtime = std::fs::metadata(&list_path).unwrap().modified().unwrap();
        assert_eq!(before_hash, after_hash);
        assert_eq!(before_mtime, after_mtime);
        assert!(!config.config_dir.join("packages-list.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_changed_list_replaces_file() {
        let (_tmp, config, transport) = setup();
        transport.route(&config.packages_list_url(), 200, r#"["a","b"]"#);

        std::fs::create_dir_all(&config.config_dir).unwrap();
        std::fs::write(config.packages_list_file(), r#"["a"]"#).unwrap();

        let result = update_package_list(&transport, &config, true).await.unwrap();
        assert_eq!(result, ListUpdate::Updated);
        assert_eq!(load_package_list(&config).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_list_download_keeps_existing() {
        let (_tmp, config, transport) = setup();
        std::fs::create_dir_all(&config.config_dir).unwrap();
        std::fs::write(config.packages_list_file(), r#"["a"]"#).unwrap();

        assert!(update_package_list(&transport, &config, true).await.is_err());
        assert_eq!(load_package_list(&config).unwrap(), vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn test_fetch_manifests_stops_at_first_failure() {
        let (_tmp, config, transport) = setup();
        transport.route(&config.manifest_url("a"), 200, r#"{"name":"a"}"#);
        transport.route(&config.manifest_url("c"), 200, r#"{"name":"c"}"#);

        let packages = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let result = fetch_manifests(&transport, &config, &packages, true).await;

        assert!(result.is_err());
        assert!(config.data_dir.join("a.json").exists());
        assert!(!config.data_dir.join("b.json").exists());
        assert!(!config.data_dir.join("c.json").exists());
    }

    #[tokio::test]
    async fn test_interrupted_manifest_download_leaves_no_partial_file() {
        let (_tmp, config, transport) = setup();
        transport.route_interrupted(&config.manifest_url("a"), r#"{"name":"a","ver"#);

        let result = fetch_manifests(&transport, &config, &["a".to_string()], true).await;

        assert!(result.is_err());
        assert!(!config.data_dir.join("a.json").exists());
        assert!(matches!(
            load_manifest(&config, "a"),
            Err(RpmGetError::PackageNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_and_load_manifest() {
        let (_tmp, config, transport) = setup();
        transport.route(
            &config.manifest_url("lazygit"),
            200,
            r#"{"name":"lazygit","version":"0.44.1"}"#,
        );

        fetch_manifests(&transport, &config, &["lazygit".to_string()], true)
            .await
            .unwrap();

        let manifest = load_manifest(&config, "lazygit").unwrap();
        assert_eq!(manifest.version, "0.44.1");
        assert_eq!(local_manifest_names(&config).unwrap(), vec!["lazygit"]);
        assert!(matches!(
            load_manifest(&config, "nope"),
            Err(RpmGetError::PackageNotFound(_))
        ));
    }

    #[test]
    fn test_suggest() {
        let known = vec!["bitwarden".to_string(), "lazygit".to_string()];
        assert_eq!(suggest("bitwardn", &known), vec!["bitwarden"]);
        assert!(suggest("zzz", &known).is_empty());
    }
}
