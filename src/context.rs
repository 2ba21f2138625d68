//! Everything a command needs, built once in `main` and passed down.

use crate::config::Config;
use crate::dnf::{CommandRunner, Dnf, SystemRunner};
use crate::error::{Result, RpmGetError};
use crate::http::{HttpTransport, Transport};
use crate::platform::{self, Arch, Privileges};
use crate::repo::RepoManager;
use crate::state::StateStore;

pub struct Context {
    pub config: Config,
    pub transport: Box<dyn Transport>,
    pub runner: Box<dyn CommandRunner>,
    pub privileges: Privileges,
    /// `None` on hosts no manifest can describe.
    pub arch: Option<Arch>,
}

impl Context {
    pub fn new(
        config: Config,
        transport: Box<dyn Transport>,
        runner: Box<dyn CommandRunner>,
        privileges: Privileges,
    ) -> Self {
        Self {
            config,
            transport,
            runner,
            privileges,
            arch: platform::host_arch(),
        }
    }

    /// Real network, real processes, the current user.
    pub fn system() -> Result<Self> {
        let config = Config::load()?;
        let transport = HttpTransport::new(&config.user_agent)?;
        Ok(Self::new(
            config,
            Box::new(transport),
            Box::new(SystemRunner),
            Privileges::detect(),
        ))
    }

    pub fn with_arch(mut self, arch: Option<Arch>) -> Self {
        self.arch = arch;
        self
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    pub fn dnf(&self, quiet: bool) -> Dnf<'_> {
        Dnf::new(self.runner(), &self.privileges).quiet(quiet)
    }

    pub fn repos<'a>(&'a self, dnf: &'a Dnf<'a>) -> RepoManager<'a, dyn Transport> {
        RepoManager::new(&self.config, self.transport.as_ref(), dnf)
    }

    pub fn state(&self) -> StateStore {
        StateStore::new(self.config.state_file())
    }

    /// Host architecture, or an error naming `package`.
    pub fn require_arch(&self, package: &str) -> Result<Arch> {
        self.arch.ok_or_else(|| RpmGetError::UnsupportedArch {
            package: package.to_string(),
            arch: platform::host_cpu().to_string(),
        })
    }
}
