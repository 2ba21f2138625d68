//! Read-only commands over the local manifests.

use crate::commands::{known_packages, load_manifest_or_suggest, require_packages};
use crate::context::Context;
use crate::error::Result;
use crate::manifest::Manifest;
use crate::release::ReleaseSource;
use crate::store;
use colored::Colorize;
use regex::Regex;

/// Show manifest details for each package.
pub fn info(ctx: &Context, packages: &[String]) -> Result<()> {
    require_packages("info", packages)?;
    let state = ctx.state().load()?;

    for (i, package) in packages.iter().enumerate() {
        let manifest = load_manifest_or_suggest(ctx, package)?;
        if i > 0 {
            println!();
        }

        println!("{}", format!("==> {}", manifest.name).bold().green());
        if !manifest.description.is_empty() {
            println!("{}", manifest.description);
        }
        if !manifest.homepage.is_empty() {
            println!("{}: {}", "Homepage".bold(), manifest.homepage);
        }
        if !manifest.version.is_empty() {
            println!("{}: {}", "Version".bold(), manifest.version);
        }
        let license = manifest.license_identifier();
        if !license.is_empty() {
            println!("{}: {}", "License".bold(), license);
        }
        if !manifest.supported_os.is_empty() {
            println!("{}: {}", "Supported OS".bold(), manifest.supported_os.join(", "));
        }
        if !manifest.pkg_arches.is_empty() {
            println!("{}: {}", "Architectures".bold(), manifest.pkg_arches.join(", "));
        }
        println!("{}: {}", "Source".bold(), install_source(&manifest));
        println!("{}: {}", "Updates".bold(), update_source(&manifest));

        for (label, list) in [
            ("Depends", &manifest.depends),
            ("Recommends", &manifest.recommends),
            ("Suggests", &manifest.suggests),
            ("Conflicts", &manifest.conflicts),
            ("Replaces", &manifest.replaces),
        ] {
            if !list.is_empty() {
                println!("{}: {}", label.bold(), list.join(", "));
            }
        }

        match state.packages.get(package) {
            Some(installed) => println!(
                "{}: {}",
                "Installed".bold(),
                installed.version.green()
            ),
            None => println!("{}: {}", "Installed".bold(), "no".dimmed()),
        }

        if let Some(notes) = &manifest.notes {
            println!("{}: {}", "Notes".bold(), notes);
        }
    }

    Ok(())
}

/// Where the package comes from.
pub fn install_source(manifest: &Manifest) -> String {
    match &manifest.repo {
        Some(repo) => match (&repo.url_repo, &repo.copr_repo) {
            (Some(url_repo), _) => format!("RPM repository {}", url_repo.url),
            (None, Some(copr)) => format!("Copr {}/{}", copr.username, copr.project),
            (None, None) => "RPM repository".to_string(),
        },
        None => "Direct download".to_string(),
    }
}

/// How newer versions are discovered.
pub fn update_source(manifest: &Manifest) -> String {
    if manifest.repo.is_some() {
        return "dnf".to_string();
    }
    let Some(check) = manifest.auto_update.as_ref().map(|a| &a.check_version) else {
        return "manual".to_string();
    };

    if check.use_latest {
        return match check.release_source() {
            Ok(Some(ReleaseSource::GitHub { owner, repo })) => {
                format!("GitHub releases ({}/{})", owner, repo)
            }
            Ok(Some(ReleaseSource::GitLab { project })) => {
                format!("GitLab releases ({})", project)
            }
            _ => "latest release".to_string(),
        };
    }
    let url = check.url.as_deref().unwrap_or("");
    if check.jsonpath.is_some() {
        format!("JSONPath on {}", url)
    } else if check.yamlpath.is_some() {
        format!("YAML path on {}", url)
    } else if check.xpath.is_some() {
        format!("XPath on {}", url)
    } else if check.selector.is_some() {
        format!("CSS selector on {}", url)
    } else if let Some(script) = &check.script {
        format!("{} script", script.script_type.interpreter().0)
    } else {
        "manual".to_string()
    }
}

/// Package names matching `pattern`. Unless `include_unsupported`, only
/// packages available for the host architecture are returned.
pub fn search_matches(ctx: &Context, pattern: &str, include_unsupported: bool) -> Result<Vec<String>> {
    let regex = Regex::new(pattern)?;
    let mut matches = Vec::new();

    for name in known_packages(ctx) {
        if !regex.is_match(&name) {
            continue;
        }
        if !include_unsupported && !is_supported(ctx, &name) {
            continue;
        }
        matches.push(name);
    }

    Ok(matches)
}

pub(crate) fn is_supported(ctx: &Context, name: &str) -> bool {
    let Some(arch) = ctx.arch else {
        return false;
    };
    match store::load_manifest(&ctx.config, name) {
        Ok(manifest) => manifest.supports_arch(arch),
        Err(e) => {
            tracing::debug!("no usable manifest for {}: {}", name, e);
            false
        }
    }
}

pub fn search(ctx: &Context, pattern: &str, include_unsupported: bool) -> Result<()> {
    let is_tty = std::io::IsTerminal::is_terminal(&std::io::stdout());
    let matches = search_matches(ctx, pattern, include_unsupported)?;

    if matches.is_empty() {
        if is_tty {
            println!("{} No packages found matching '{}'", "✗".red(), pattern);
        }
        return Ok(());
    }

    for name in matches {
        if is_tty {
            println!("{}", name.bold().green());
        } else {
            println!("{}", name);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{harness, write_manifest};
    use crate::platform::Privileges;
    use std::path::PathBuf;

    fn parse(yaml: &str) -> Manifest {
        Manifest::parse(yaml, &PathBuf::from("m.yaml")).unwrap()
    }

    #[test]
    fn test_search_filters_by_arch() {
        let h = harness(Privileges::root());
        write_manifest(
            &h.ctx,
            "bitwarden",
            "name: bitwarden\npkg_arches: [x86_64]\n",
        );
        write_manifest(&h.ctx, "bitbar", "name: bitbar\npkg_arches: [arm64]\n");
        write_manifest(&h.ctx, "lazygit", "name: lazygit\npkg_arches: [x86_64]\n");

        assert_eq!(
            search_matches(&h.ctx, "^bit", false).unwrap(),
            vec!["bitwarden"]
        );
        assert_eq!(
            search_matches(&h.ctx, "^bit", true).unwrap(),
            vec!["bitbar", "bitwarden"]
        );
    }

    #[test]
    fn test_search_invalid_regex() {
        let h = harness(Privileges::root());
        assert!(search_matches(&h.ctx, "(", false).is_err());
    }

    #[test]
    fn test_info_unknown_package() {
        let h = harness(Privileges::root());
        assert!(info(&h.ctx, &["nope".to_string()]).is_err());
    }

    #[test]
    fn test_sources() {
        let m = parse(
            "name: a\nauto_update:\n  check_version:\n    use_latest: true\n    gitlab: gitlab-org/cli\n",
        );
        assert_eq!(install_source(&m), "Direct download");
        assert_eq!(update_source(&m), "GitLab releases (gitlab-org/cli)");

        let m = parse("name: b\nrepo:\n  copr_repo: {username: atim, project: lazygit}\n");
        assert_eq!(install_source(&m), "Copr atim/lazygit");
        assert_eq!(update_source(&m), "dnf");

        let m = parse(
            "name: c\nauto_update:\n  check_version:\n    script: {script_type: bash, run: echo 1}\n",
        );
        assert_eq!(update_source(&m), "bash script");
        assert_eq!(update_source(&parse("name: d\n")), "manual");
        let m = parse(
            "name: e\nauto_update:\n  check_version:\n    url: https://example.test/l.yml\n    yamlpath: $.version\n",
        );
        assert_eq!(update_source(&m), "YAML path on https://example.test/l.yml");
    }
}
