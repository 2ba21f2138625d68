use crate::commands::{load_manifest_or_suggest, require_packages};
use crate::context::Context;
use crate::download;
use crate::error::{Result, RpmGetError};
use crate::http::Request;
use crate::output;
use crate::release::ensure_dir;
use crate::resolver;
use colored::Colorize;

/// Install packages from their manifests.
///
/// Repository-backed packages get their repository added and are then
/// installed by name; everything else is downloaded as an RPM into the cache
/// directory and installed from the file.
pub async fn install(ctx: &Context, packages: &[String]) -> Result<()> {
    require_packages("install", packages)?;
    let dnf = ctx.dnf(false);
    dnf.require_admin()?;
    ensure_dir(&ctx.config.etc_dir)?;

    let state = ctx.state();
    for package in packages {
        let manifest = load_manifest_or_suggest(ctx, package)?;
        let arch = ctx.require_arch(package)?;
        if !manifest.supports_arch(arch) {
            return Err(RpmGetError::UnsupportedArch {
                package: package.clone(),
                arch: arch.to_string(),
            });
        }

        let version = if let Some(repo) = &manifest.repo {
            output::info(format!("Adding repository for {}...", package));
            ctx.repos(&dnf).add_manifest_repo(package, repo, false).await?;
            dnf.install(std::slice::from_ref(&manifest.name))?;

            dnf.installed_version(&manifest.name)?
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| manifest.version.clone())
        } else {
            let version = resolver::resolve_latest(
                ctx.transport(),
                ctx.runner(),
                &ctx.config,
                &manifest,
                false,
            )
            .await?;
            let url = resolver::download_url(&manifest, arch, &version)?;
            let file_name = download::url_basename(&url)
                .ok_or_else(|| anyhow::anyhow!("Cannot derive a file name from {}", url))?;

            ensure_dir(&ctx.config.cache_dir)?;
            let rpm_path = ctx.config.cache_dir.join(file_name);
            download::download_file(
                ctx.transport(),
                Request::get(&url),
                &rpm_path,
                &format!("{} {}", package, version),
                false,
            )
            .await?;

            dnf.install(&[rpm_path.to_string_lossy().to_string()])?;
            version
        };

        state.update(|s| s.record_install(package, &version))?;
        println!(
            "  {} {} {} installed",
            "✓".green(),
            package.bold(),
            version.dimmed()
        );
    }

    Ok(())
}

/// Remove packages, optionally dropping the repository each one added.
pub fn remove(ctx: &Context, packages: &[String], remove_repo: bool) -> Result<()> {
    require_packages("remove", packages)?;
    let dnf = ctx.dnf(false);
    dnf.require_admin()?;

    dnf.remove(packages)?;
    ctx.state().update(|s| {
        for package in packages {
            s.record_remove(package);
        }
    })?;

    if remove_repo {
        let repos = ctx.repos(&dnf);
        for package in packages {
            match repos.remove_repo(package) {
                Ok(record) => output::info(format!(
                    "Removed repository {} for {}",
                    record.display_name(),
                    package
                )),
                Err(RpmGetError::RepoNotRegistered(_)) => {
                    output::warn(format!("No repository was added for {}", package))
                }
                Err(e) => return Err(e),
            }
        }
    }

    Ok(())
}

pub fn reinstall(ctx: &Context, packages: &[String]) -> Result<()> {
    require_packages("reinstall", packages)?;
    let dnf = ctx.dnf(false);
    dnf.require_admin()?;
    dnf.reinstall(packages)?;
    Ok(())
}

/// `dnf upgrade`, or only the packages rpm-get installed when `rpm_get_only`.
pub fn upgrade(ctx: &Context, rpm_get_only: bool) -> Result<()> {
    let dnf = ctx.dnf(false);
    dnf.require_admin()?;

    if !rpm_get_only {
        dnf.upgrade(&[])?;
        return Ok(());
    }

    let names: Vec<String> = ctx.state().load()?.packages.into_keys().collect();
    if names.is_empty() {
        output::info("No packages installed by rpm-get");
        return Ok(());
    }
    dnf.upgrade(&names)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{harness, write_manifest};
    use crate::platform::Privileges;

    const DIRECT: &str = r#"
name: foo
version: 1.0.0
pkg_arches: [x86_64]
arch:
  x86_64:
    url: https://example.test/foo-1.0.0.x86_64.rpm
"#;

    const COPR: &str = r#"
name: lazygit
version: 0.44.1
repo:
  copr_repo:
    username: atim
    project: lazygit
"#;

    fn not_root() -> Privileges {
        Privileges {
            euid: 1000,
            sudo_user: Some("me".into()),
        }
    }

    #[tokio::test]
    async fn test_install_direct_download() {
        let h = harness(Privileges::root());
        write_manifest(&h.ctx, "foo", DIRECT);
        h.transport
            .route("https://example.test/foo-1.0.0.x86_64.rpm", 200, "rpm bytes");

        install(&h.ctx, &["foo".to_string()]).await.unwrap();

        let rpm = h.ctx.config.cache_dir.join("foo-1.0.0.x86_64.rpm");
        assert_eq!(std::fs::read_to_string(&rpm).unwrap(), "rpm bytes");
        let calls = h.runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0][2..4], ["install".to_string(), "-y".to_string()]);
        assert_eq!(calls[0][4], rpm.to_string_lossy());

        let state = h.ctx.state().load().unwrap();
        assert_eq!(state.packages["foo"].version, "1.0.0");
        assert!(h.ctx.config.etc_dir.is_dir());
    }

    #[tokio::test]
    async fn test_install_copr_package() {
        let h = harness(Privileges::root());
        write_manifest(&h.ctx, "lazygit", COPR);

        install(&h.ctx, &["lazygit".to_string()]).await.unwrap();

        let calls = h.runner.calls();
        assert_eq!(calls[0][2..], ["copr", "enable", "-y", "atim/lazygit"].map(String::from));
        assert_eq!(calls[1][2..], ["install", "-y", "lazygit"].map(String::from));

        let state = h.ctx.state().load().unwrap();
        assert_eq!(state.packages["lazygit"].version, "0.44.1");
        assert!(state.repo_for("lazygit").is_some());
    }

    #[tokio::test]
    async fn test_install_requires_root() {
        let h = harness(not_root());
        write_manifest(&h.ctx, "foo", DIRECT);

        let result = install(&h.ctx, &["foo".to_string()]).await;
        assert!(matches!(result, Err(RpmGetError::NotRoot)));
        assert!(h.runner.calls().is_empty());
        assert!(h.transport.requests().is_empty());
        assert!(!h.ctx.config.etc_dir.exists());
    }

    #[tokio::test]
    async fn test_install_unknown_package() {
        let h = harness(Privileges::root());
        let result = install(&h.ctx, &["nope".to_string()]).await;
        assert!(matches!(result, Err(RpmGetError::PackageNotFound(_))));
    }

    #[tokio::test]
    async fn test_install_unsupported_arch() {
        let h = harness(Privileges::root());
        write_manifest(&h.ctx, "foo", DIRECT);
        let ctx = h.ctx.with_arch(Some(crate::platform::Arch::Arm64));

        let result = install(&ctx, &["foo".to_string()]).await;
        assert!(matches!(result, Err(RpmGetError::UnsupportedArch { .. })));
    }

    #[tokio::test]
    async fn test_install_without_packages_is_usage_error() {
        let h = harness(Privileges::root());
        let err = install(&h.ctx, &[]).await.unwrap_err();
        assert_eq!(err.exit_code(), crate::error::USAGE_EXIT_CODE);
    }

    #[tokio::test]
    async fn test_remove_with_repo() {
        let h = harness(Privileges::root());
        write_manifest(&h.ctx, "lazygit", COPR);
        install(&h.ctx, &["lazygit".to_string()]).await.unwrap();

        remove(&h.ctx, &["lazygit".to_string()], true).unwrap();

        let calls = h.runner.calls();
        let tail: Vec<_> = calls.iter().rev().take(2).collect();
        assert_eq!(tail[1][2..], ["remove", "-y", "lazygit"].map(String::from));
        assert_eq!(tail[0][2..], ["copr", "remove", "-y", "atim/lazygit"].map(String::from));

        let state = h.ctx.state().load().unwrap();
        assert!(!state.is_installed("lazygit"));
        assert!(state.repo_for("lazygit").is_none());
    }

    #[test]
    fn test_remove_without_recorded_repo_warns_only() {
        let h = harness(Privileges::root());
        remove(&h.ctx, &["bar".to_string()], true).unwrap();
        assert_eq!(h.runner.calls().len(), 1);
    }

    #[test]
    fn test_reinstall_and_upgrade() {
        let h = harness(Privileges::root());
        reinstall(&h.ctx, &["foo".to_string()]).unwrap();
        upgrade(&h.ctx, false).unwrap();

        let calls = h.runner.calls();
        assert_eq!(calls[0][2..], ["reinstall", "-y", "foo"].map(String::from));
        assert_eq!(calls[1][2..], ["upgrade", "-y"].map(String::from));
    }

    #[test]
    fn test_upgrade_rpm_get_only() {
        let h = harness(Privileges::root());
        upgrade(&h.ctx, true).unwrap();
        assert!(h.runner.calls().is_empty());

        h.ctx
            .state()
            .update(|s| {
                s.record_install("b", "1");
                s.record_install("a", "2");
            })
            .unwrap();
        upgrade(&h.ctx, true).unwrap();
        assert_eq!(
            h.runner.calls()[0][2..],
            ["upgrade", "-y", "a", "b"].map(String::from)
        );
    }

    #[test]
    fn test_upgrade_requires_root() {
        let h = harness(not_root());
        assert!(matches!(upgrade(&h.ctx, false), Err(RpmGetError::NotRoot)));
        assert!(h.runner.calls().is_empty());
    }
}
