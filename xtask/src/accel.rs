//! Hardware acceleration compatibility.
//!
//! Acceleration is only possible when the guest runs on the host's own
//! architecture, and the flag that enables it depends on the host OS.

use crate::arch::normalize;
use crate::error::{Error, Result};
use crate::verbose::vprintln;

/// The machine the orchestrator is running on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostPlatform {
    /// Machine architecture as reported by the platform (any alias).
    pub arch: String,
    /// Operating system family, e.g. `linux` or `macos`.
    pub os: String,
}

impl HostPlatform {
    pub fn current() -> Self {
        Self {
            arch: std::env::consts::ARCH.to_string(),
            os: std::env::consts::OS.to_string(),
        }
    }

    pub fn new(arch: &str, os: &str) -> Self {
        Self {
            arch: arch.to_string(),
            os: os.to_string(),
        }
    }
}

/// Accelerator selected for a launch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AccelFlag {
    /// Pure emulation.
    #[default]
    None,
    /// Linux KVM.
    Kvm,
    /// macOS Hypervisor.framework.
    Hvf,
}

impl AccelFlag {
    /// QEMU arguments enabling this accelerator.
    pub fn args(self) -> &'static [&'static str] {
        match self {
            AccelFlag::None => &[],
            AccelFlag::Kvm => &["-enable-kvm"],
            AccelFlag::Hvf => &["-accel", "hvf"],
        }
    }

    pub fn is_enabled(self) -> bool {
        self != AccelFlag::None
    }
}

/// Decide which accelerator a launch of `target_arch` may use.
///
/// No host check is made unless acceleration was requested.
pub fn resolve(target_arch: &str, accel_requested: bool, host: &HostPlatform) -> Result<AccelFlag> {
    if !accel_requested {
        return Ok(AccelFlag::None);
    }

    let host_arch = normalize(&host.arch);
    let target = normalize(target_arch);
    if host_arch != target {
        return Err(Error::IncompatibleAcceleration {
            host: host_arch,
            target,
        });
    }

    let os = host.os.to_ascii_lowercase();
    let flag = if os.contains("linux") {
        AccelFlag::Kvm
    } else if os.contains("darwin") || os.contains("macos") {
        AccelFlag::Hvf
    } else {
        vprintln!("No accelerator known for host OS `{}`, running emulated", host.os);
        AccelFlag::None
    };
    Ok(flag)
}
