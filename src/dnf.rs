//! `dnf` adapter.
//!
//! Mutating operations go through [`Dnf`], which checks privileges before
//! anything is spawned and then runs `sudo dnf <verb> -y <packages...>`.
//! Subprocesses are started through a [`CommandRunner`] so the adapter can be
//! driven by [`RecordingRunner`] in tests.

use crate::error::{Result, RpmGetError};
use crate::platform::Privileges;
use std::path::PathBuf;
use std::process::Command;
use std::sync::Mutex;

/// Captured result of a finished subprocess.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

pub trait CommandRunner: Send + Sync {
    /// Absolute path of `program` on `PATH`, if any.
    fn which(&self, program: &str) -> Option<PathBuf>;

    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for std::sync::Arc<R> {
    fn which(&self, program: &str) -> Option<PathBuf> {
        (**self).which(program)
    }

    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        (**self).run(program, args)
    }
}

/// Runs real processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn which(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }

    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        tracing::debug!("Running {} {}", program, args.join(" "));
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| RpmGetError::CommandFailed {
                command: format!("{} {}", program, args.join(" ")),
                stderr: e.to_string(),
            })?;

        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Records invocations instead of running them. Every program resolves to
/// `/usr/bin/<name>` and every command succeeds unless told otherwise.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<Vec<String>>>,
    fail_with: Mutex<Option<String>>,
    stdout: Mutex<String>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent command fail with `stderr`.
    pub fn fail_with(&self, stderr: &str) {
        *self.fail_with.lock().unwrap_or_else(|e| e.into_inner()) = Some(stderr.to_string());
    }

    /// Stdout returned by every subsequent command.
    pub fn respond_with(&self, stdout: &str) {
        *self.stdout.lock().unwrap_or_else(|e| e.into_inner()) = stdout.to_string();
    }

    /// Each call as `[program, args...]`.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl CommandRunner for RecordingRunner {
    fn which(&self, program: &str) -> Option<PathBuf> {
        Some(PathBuf::from("/usr/bin").join(program))
    }

    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        let mut call = vec![program.to_string()];
        call.extend(args.iter().cloned());
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);

        let failure = self
            .fail_with
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        let stdout = self.stdout.lock().unwrap_or_else(|e| e.into_inner()).clone();
        Ok(match failure {
            Some(stderr) => CommandOutput {
                success: false,
                stdout: String::new(),
                stderr,
            },
            None => CommandOutput {
                success: true,
                stdout,
                stderr: String::new(),
            },
        })
    }
}

/// Package transactions understood by `dnf`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Install,
    Remove,
    Reinstall,
    Upgrade,
}

impl Verb {
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Install => "install",
            Verb::Remove => "remove",
            Verb::Reinstall => "reinstall",
            Verb::Upgrade => "upgrade",
        }
    }
}

pub struct Dnf<'a> {
    runner: &'a dyn CommandRunner,
    privileges: &'a Privileges,
    quiet: bool,
}

impl<'a> Dnf<'a> {
    pub fn new(runner: &'a dyn CommandRunner, privileges: &'a Privileges) -> Self {
        Self {
            runner,
            privileges,
            quiet: false,
        }
    }

    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Fail unless running as root.
    pub fn require_admin(&self) -> Result<()> {
        if self.privileges.is_admin() {
            Ok(())
        } else {
            tracing::debug!(
                "privilege check failed: euid={} sudo_user={:?}",
                self.privileges.euid,
                self.privileges.sudo_user
            );
            Err(RpmGetError::NotRoot)
        }
    }

    /// Program and leading arguments for a privileged `dnf` call:
    /// `sudo <dnf>` when sudo exists, `<dnf>` otherwise.
    fn dnf_command(&self) -> Result<(String, Vec<String>)> {
        let dnf = self
            .runner
            .which("dnf")
            .ok_or_else(|| RpmGetError::MissingExecutable("dnf".to_string()))?
            .to_string_lossy()
            .to_string();

        match self.runner.which("sudo") {
            Some(sudo) => Ok((sudo.to_string_lossy().to_string(), vec![dnf])),
            None => Ok((dnf, Vec::new())),
        }
    }

    fn run_privileged(&self, args: Vec<String>) -> Result<CommandOutput> {
        self.require_admin()?;
        let (program, mut full_args) = self.dnf_command()?;
        full_args.extend(args);

        let output = self.runner.run(&program, &full_args)?;
        if !output.success {
            return Err(RpmGetError::CommandFailed {
                command: format!("{} {}", program, full_args.join(" ")),
                stderr: output.stderr.trim().to_string(),
            });
        }
        if !self.quiet && !output.stdout.trim().is_empty() {
            println!("{}", output.stdout.trim_end());
        }
        Ok(output)
    }

    /// `dnf <verb> -y <packages...>`. Packages may be names or local RPM paths.
    pub fn transaction(&self, verb: Verb, packages: &[String]) -> Result<CommandOutput> {
        let mut args = vec![verb.as_str().to_string(), "-y".to_string()];
        args.extend(packages.iter().cloned());
        self.run_privileged(args)
    }

    pub fn install(&self, packages: &[String]) -> Result<CommandOutput> {
        self.transaction(Verb::Install, packages)
    }

    pub fn remove(&self, packages: &[String]) -> Result<CommandOutput> {
        self.transaction(Verb::Remove, packages)
    }

    pub fn reinstall(&self, packages: &[String]) -> Result<CommandOutput> {
        self.transaction(Verb::Reinstall, packages)
    }

    /// Upgrade `packages`, or everything when empty.
    pub fn upgrade(&self, packages: &[String]) -> Result<CommandOutput> {
        self.transaction(Verb::Upgrade, packages)
    }

    pub fn copr_enable(&self, username: &str, project: &str) -> Result<CommandOutput> {
        self.run_privileged(vec![
            "copr".to_string(),
            "enable".to_string(),
            "-y".to_string(),
            format!("{}/{}", username, project),
        ])
    }

    pub fn copr_remove(&self, username: &str, project: &str) -> Result<CommandOutput> {
        self.run_privileged(vec![
            "copr".to_string(),
            "remove".to_string(),
            "-y".to_string(),
            format!("{}/{}", username, project),
        ])
    }

    /// Import a repository signing key with `rpm --import`.
    pub fn import_key(&self, key_url: &str) -> Result<CommandOutput> {
        self.require_admin()?;
        let rpm = self
            .runner
            .which("rpm")
            .ok_or_else(|| RpmGetError::MissingExecutable("rpm".to_string()))?
            .to_string_lossy()
            .to_string();
        let args = vec!["--import".to_string(), key_url.to_string()];
        let output = self.runner.run(&rpm, &args)?;
        if !output.success {
            return Err(RpmGetError::CommandFailed {
                command: format!("{} --import {}", rpm, key_url),
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output)
    }

    /// Installed version of `package` according to `rpm -q`, if installed.
    /// Read-only, so no privilege check.
    pub fn installed_version(&self, package: &str) -> Result<Option<String>> {
        let Some(rpm) = self.runner.which("rpm") else {
            return Ok(None);
        };
        let args = vec![
            "-q".to_string(),
            "--qf".to_string(),
            "%{VERSION}".to_string(),
            package.to_string(),
        ];
        let output = self.runner.run(&rpm.to_string_lossy(), &args)?;
        if output.success {
            Ok(Some(output.stdout.trim().to_string()))
        } else {
            Ok(None)
        }
    }
}
