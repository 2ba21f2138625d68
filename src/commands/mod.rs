//! Command implementations for the rpm-get CLI
//!
//! - **install**: install, reinstall, remove and upgrade through dnf
//! - **maintenance**: package list and manifest updates
//! - **query**: info and search over local manifests
//! - **list**: package listing and install status
//! - **cache**: download cache listing and cleaning

pub mod cache;
pub mod install;
pub mod list;
pub mod maintenance;
pub mod query;

pub use cache::{cache, clean};
pub use install::{install, reinstall, remove, upgrade};
pub use list::{ListMode, list};
pub use maintenance::update;
pub use query::{info, search};

use crate::context::Context;
use crate::error::{Result, RpmGetError};
use crate::manifest::Manifest;
use crate::output;
use crate::store;

/// Load a manifest, suggesting close names when the package is unknown.
pub(crate) fn load_manifest_or_suggest(ctx: &Context, package: &str) -> Result<Manifest> {
    match store::load_manifest(&ctx.config, package) {
        Err(RpmGetError::PackageNotFound(name)) => {
            let known = known_packages(ctx);
            let suggestions = store::suggest(&name, &known);
            if !suggestions.is_empty() {
                output::info(format!("Did you mean: {}?", suggestions.join(", ")));
            }
            Err(RpmGetError::PackageNotFound(name))
        }
        other => other,
    }
}

/// Package names from the list, falling back to the manifests on disk.
pub(crate) fn known_packages(ctx: &Context) -> Vec<String> {
    match store::load_package_list(&ctx.config) {
        Ok(list) => list,
        Err(e) => {
            tracing::debug!("package list unavailable: {}", e);
            store::local_manifest_names(&ctx.config).unwrap_or_default()
        }
    }
}

pub(crate) fn require_packages(command: &str, packages: &[String]) -> Result<()> {
    if packages.is_empty() {
        return Err(RpmGetError::Usage(format!(
            "{} requires at least one package name",
            command
        )));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::config::Config;
    use crate::context::Context;
    use crate::dnf::RecordingRunner;
    use crate::http::MemoryTransport;
    use crate::platform::{Arch, Privileges};
    use std::sync::Arc;
    use tempfile::TempDir;

    pub struct Harness {
        pub _tmp: TempDir,
        pub ctx: Context,
        pub transport: Arc<MemoryTransport>,
        pub runner: Arc<RecordingRunner>,
    }

    pub fn harness(privileges: Privileges) -> Harness {
        let tmp = TempDir::new().unwrap();
        let config = Config::with_root(tmp.path());
        let transport = Arc::new(MemoryTransport::new());
        let runner = Arc::new(RecordingRunner::new());
        let ctx = Context::new(
            config,
            Box::new(transport.clone()),
            Box::new(runner.clone()),
            privileges,
        )
        .with_arch(Some(Arch::X86_64));
        Harness {
            _tmp: tmp,
            ctx,
            transport,
            runner,
        }
    }

    /// Drop a manifest into the data directory.
    pub fn write_manifest(ctx: &Context, name: &str, yaml: &str) {
        std::fs::create_dir_all(&ctx.config.data_dir).unwrap();
        std::fs::write(ctx.config.data_dir.join(format!("{}.yaml", name)), yaml).unwrap();
    }
}
