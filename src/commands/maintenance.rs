use crate::context::Context;
use crate::error::Result;
use crate::output;
use crate::release::ensure_dir;
use crate::resolver;
use crate::store::{self, ListUpdate};
use colored::Colorize;

/// A package whose upstream moved past the recorded install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outdated {
    pub name: String,
    pub installed: String,
    pub latest: String,
}

/// Refresh the package list and manifests, then look for newer upstream
/// versions of installed packages unless `repos_only`.
pub async fn update(ctx: &Context, repos_only: bool, quiet: bool) -> Result<()> {
    ensure_dir(&ctx.config.data_dir)?;

    match store::update_package_list(ctx.transport(), &ctx.config, quiet).await? {
        ListUpdate::Updated => {
            if !quiet {
                output::info("Package list updated");
            }
            let packages = store::load_package_list(&ctx.config)?;
            let written = store::fetch_manifests(ctx.transport(), &ctx.config, &packages, quiet).await?;
            tracing::info!("Downloaded {} manifests", written.len());
        }
        ListUpdate::UpToDate => {
            if !quiet {
                output::info("Package list is already up to date");
            }
        }
    }

    if repos_only {
        return Ok(());
    }

    let outdated = outdated(ctx, quiet).await?;
    if outdated.is_empty() {
        if !quiet {
            output::info("All packages installed by rpm-get are up to date");
        }
        return Ok(());
    }

    println!(
        "{} {} upgradable:",
        "==>".bold().green(),
        outdated.len().to_string().bold()
    );
    for pkg in &outdated {
        println!(
            "  {} {} → {}",
            pkg.name.bold(),
            pkg.installed.dimmed(),
            pkg.latest.green()
        );
    }
    Ok(())
}

/// Installed packages whose resolved latest version differs from the
/// recorded one. Packages that cannot be resolved are skipped with a warning.
pub async fn outdated(ctx: &Context, quiet: bool) -> Result<Vec<Outdated>> {
    let state = ctx.state().load()?;
    let mut result = Vec::new();

    for (name, installed) in &state.packages {
        let manifest = match store::load_manifest(&ctx.config, name) {
            Ok(m) => m,
            Err(e) => {
                output::warn(format!("Skipping {}: {}", name, e));
                continue;
            }
        };

        let latest = match resolver::resolve_latest(
            ctx.transport(),
            ctx.runner(),
            &ctx.config,
            &manifest,
            quiet,
        )
        .await
        {
            Ok(v) => v,
            Err(e) => {
                output::warn(format!("Could not check {} for updates: {}", name, e));
                continue;
            }
        };

        if latest != installed.version {
            result.push(Outdated {
                name: name.clone(),
                installed: installed.version.clone(),
                latest,
            });
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{harness, write_manifest};
    use crate::platform::Privileges;

    #[tokio::test]
    async fn test_update_downloads_list_and_manifests() {
        let h = harness(Privileges::root());
        let config = &h.ctx.config;
        h.transport
            .route(&config.packages_list_url(), 200, r#"["foo","bar"]"#);
        h.transport
            .route(&config.manifest_url("foo"), 200, r#"{"name":"foo","version":"1"}"#);
        h.transport
            .route(&config.manifest_url("bar"), 200, r#"{"name":"bar","version":"2"}"#);

        update(&h.ctx, true, true).await.unwrap();

        assert!(config.packages_list_file().exists());
        assert!(config.data_dir.join("foo.json").exists());
        assert!(config.data_dir.join("bar.json").exists());
    }

    #[tokio::test]
    async fn test_update_up_to_date_skips_manifests() {
        let h = harness(Privileges::root());
        let config = &h.ctx.config;
        h.transport.route(&config.packages_list_url(), 200, r#"["foo"]"#);
        std::fs::create_dir_all(&config.config_dir).unwrap();
        std::fs::write(config.packages_list_file(), r#"["foo"]"#).unwrap();

        update(&h.ctx, true, true).await.unwrap();

        assert_eq!(h.transport.requests().len(), 1);
        assert!(config.data_dir.is_dir());
    }

    #[tokio::test]
    async fn test_outdated_compares_recorded_versions() {
        let h = harness(Privileges::root());
        write_manifest(&h.ctx, "foo", "name: foo\nversion: 1.1.0\n");
        write_manifest(&h.ctx, "bar", "name: bar\nversion: 2.0.0\n");
        h.ctx
            .state()
            .update(|s| {
                s.record_install("foo", "1.0.0");
                s.record_install("bar", "2.0.0");
                s.record_install("gone", "0.1");
            })
            .unwrap();

        let outdated = outdated(&h.ctx, true).await.unwrap();
        assert_eq!(
            outdated,
            vec![Outdated {
                name: "foo".into(),
                installed: "1.0.0".into(),
                latest: "1.1.0".into(),
            }]
        );
    }
}
