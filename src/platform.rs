//! Host detection: CPU architecture and privilege level.
//!
//! Manifests name architectures `x86_64`, `x86` and `arm64`; [`Arch`] maps the
//! Rust target architecture onto those keys.
//!
//! The privilege gate only looks at the effective UID. Running under `sudo`
//! already yields euid 0, so `SUDO_USER` is recorded for diagnostics but does
//! not grant anything on its own.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    X86_64,
    X86,
    Arm64,
}

impl Arch {
    /// Manifest key for this architecture.
    pub fn key(self) -> &'static str {
        match self {
            Arch::X86_64 => "x86_64",
            Arch::X86 => "x86",
            Arch::Arm64 => "arm64",
        }
    }

    /// Map a Rust/uname style architecture name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "x86_64" | "amd64" => Some(Arch::X86_64),
            "x86" | "i386" | "i586" | "i686" => Some(Arch::X86),
            "aarch64" | "arm64" => Some(Arch::Arm64),
            _ => None,
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Raw CPU architecture of the running binary.
pub fn host_cpu() -> &'static str {
    std::env::consts::ARCH
}

/// Architecture of the running host, if it is one manifests can describe.
pub fn host_arch() -> Option<Arch> {
    Arch::from_name(host_cpu())
}

/// Snapshot of who is running rpm-get.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Privileges {
    pub euid: u32,
    pub sudo_user: Option<String>,
}

impl Privileges {
    /// Read the effective UID and `SUDO_USER` of the current process.
    pub fn detect() -> Self {
        Self {
            euid: nix::unistd::geteuid().as_raw(),
            sudo_user: std::env::var("SUDO_USER").ok().filter(|u| !u.is_empty()),
        }
    }

    pub fn root() -> Self {
        Self {
            euid: 0,
            sudo_user: None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.euid == 0
    }
}
