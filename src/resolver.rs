//! Latest-version resolution for manifests with an `auto_update` section.
//!
//! `check_version` is evaluated in this order:
//!
//! 1. `use_latest` with `github`/`gitlab`: the release cache's `tag_name`
//! 2. `jsonpath`, `yamlpath`, `xpath` or `selector`: the body of `url`
//! 3. `script`: stdout of the script run through its interpreter
//!
//! `regex`/`regex_replace` post-process whatever was found. A manifest without
//! a descriptor resolves to its own `version`.

use crate::config::Config;
use crate::dnf::CommandRunner;
use crate::error::{Result, RpmGetError};
use crate::extract;
use crate::http::{self, Request, Transport};
use crate::manifest::{CheckVersion, Manifest, Script};
use crate::platform::Arch;
use crate::release;

/// Placeholder replaced in auto-update download URLs.
pub const VERSION_PLACEHOLDER: &str = "${version}";

/// Resolve the newest upstream version of `manifest`.
pub async fn resolve_latest<T: Transport + ?Sized>(
    transport: &T,
    runner: &dyn CommandRunner,
    config: &Config,
    manifest: &Manifest,
    quiet: bool,
) -> Result<String> {
    let Some(check) = manifest.auto_update.as_ref().map(|a| &a.check_version) else {
        return Ok(manifest.version.clone());
    };
    let pattern = check.regex.as_deref();
    let replacement = check.regex_replace.as_deref();

    if check.use_latest {
        let source = check.release_source()?.ok_or_else(|| {
            anyhow::anyhow!(
                "{}: use_latest needs a github or gitlab project",
                manifest.name
            )
        })?;
        let cache_file =
            release::fetch_latest_release(transport, config, &manifest.name, &source, quiet)
                .await?;
        let tag = release::latest_tag(&cache_file)?;
        tracing::debug!("{}: latest tag {}", manifest.name, tag);
        return extract::apply_pattern(&tag, pattern, replacement);
    }

    if check.jsonpath.is_some()
        || check.yamlpath.is_some()
        || check.xpath.is_some()
        || check.selector.is_some()
    {
        let body = fetch_check_url(transport, &manifest.name, check).await?;

        if let Some(path) = &check.jsonpath {
            return extract::extract_json(&body, path, pattern, replacement);
        }
        if let Some(path) = &check.yamlpath {
            return extract::extract_yaml(&body, path, pattern, replacement);
        }
        if let Some(xpath) = &check.xpath {
            return if check.html {
                extract::extract_html(&body, xpath, pattern, replacement)
            } else {
                extract::extract_xml(&body, xpath, pattern, replacement)
            };
        }
        if let Some(selector) = &check.selector {
            return extract::extract_css(&body, selector, pattern, replacement);
        }
    }

    if let Some(script) = &check.script {
        let printed = run_script(runner, &manifest.name, script)?;
        return extract::apply_pattern(&printed, pattern, replacement);
    }

    Ok(manifest.version.clone())
}

async fn fetch_check_url<T: Transport + ?Sized>(
    transport: &T,
    package: &str,
    check: &CheckVersion,
) -> Result<Vec<u8>> {
    let url = check
        .url
        .as_deref()
        .filter(|u| !u.is_empty())
        .ok_or_else(|| anyhow::anyhow!("{}: check_version has no url to scrape", package))?;
    tracing::info!("Checking {} for the latest {} version", url, package);
    http::fetch_bytes(transport, Request::get(url)).await
}

/// Run a version script and return its trimmed stdout.
pub fn run_script(runner: &dyn CommandRunner, package: &str, script: &Script) -> Result<String> {
    let (interpreter, flag) = script.script_type.interpreter();
    let program = runner
        .which(interpreter)
        .ok_or_else(|| RpmGetError::MissingExecutable(interpreter.to_string()))?;
    let program = program.to_string_lossy();

    let args = vec![flag.to_string(), script.run.clone()];
    let output = runner.run(&program, &args)?;
    if !output.success {
        return Err(RpmGetError::CommandFailed {
            command: format!("{} {} <{} version script>", program, flag, package),
            stderr: output.stderr.trim().to_string(),
        });
    }

    let version = output.stdout.trim();
    if version.is_empty() {
        return Err(RpmGetError::NothingSelected {
            expr: format!("{} version script", package),
        });
    }
    Ok(version.to_string())
}

/// Download URL of `manifest` for `arch` at `version`.
///
/// Auto-update URL templates win over the static `arch` table.
pub fn download_url(manifest: &Manifest, arch: Arch, version: &str) -> Result<String> {
    let template = manifest
        .auto_update
        .as_ref()
        .and_then(|a| a.arch.as_ref())
        .and_then(|urls| urls.get(arch));

    if let Some(template) = template {
        return Ok(template.replace(VERSION_PLACEHOLDER, version));
    }

    manifest
        .arch
        .get(arch)
        .map(str::to_string)
        .ok_or_else(|| RpmGetError::UnsupportedArch {
            package: manifest.name.clone(),
            arch: arch.to_string(),
        })
}
