//! Error kinds surfaced by every xtask stage.
//!
//! Each variant carries the architecture (where one is involved) so the
//! entry point can report which target and stage failed without extra
//! bookkeeping.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::process::ChildExit;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Which half of an architecture build failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Component {
    /// The UEFI boot loader (`boot_loader.efi`).
    BootLoader,
    /// The kernel start image.
    Kernel,
}

impl std::fmt::Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Component::BootLoader => f.write_str("boot loader"),
            Component::Kernel => f.write_str("kernel"),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    /// Unknown architecture, missing profile or unreadable workspace config.
    #[error("configuration: {0}")]
    Configuration(String),

    #[error(
        "[{target}] can't enable hardware acceleration for a non-native guest (host is {host})"
    )]
    IncompatibleAcceleration { host: String, target: String },

    #[error("[{arch}] staging {}: {source}", .path.display())]
    Staging {
        arch: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("[{arch}] {component} build failed ({status})")]
    BuildFailure {
        arch: &'static str,
        component: Component,
        status: ChildExit,
    },

    #[error("[{arch}] emulator exited with {status}")]
    Launch {
        arch: &'static str,
        status: ChildExit,
    },

    /// The git reader could not produce provenance for the boot descriptor.
    #[error("provenance: {0}")]
    Provenance(String),

    /// A child process could not be spawned at all.
    #[error("failed to run `{program}`: {source}")]
    Process {
        program: String,
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Process exit code reported by `main` for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Configuration(_) => 2,
            Error::IncompatibleAcceleration { .. } => 3,
            Error::Staging { .. } => 4,
            Error::BuildFailure { .. } => 5,
            Error::Provenance(_) | Error::Process { .. } => 6,
            Error::Launch { status, .. } => match status.code() {
                Some(code) if (1..=255).contains(&code) => code as u8,
                _ => 1,
            },
        }
    }

    pub(crate) fn staging(arch: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Staging {
            arch,
            path: path.into(),
            source,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Configuration(format!("{err:#}"))
    }
}
