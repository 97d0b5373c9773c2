//! Boot loader and kernel builds.
//!
//! Each architecture needs two cargo builds: the boot loader for the UEFI
//! triple and the kernel start image for the bare-metal triple. The first
//! failure stops everything; the kernel is never built on top of a broken
//! boot loader.

use crate::arch::{self, ArchProfile, BuildProfile};
use crate::cargo::{CargoBuild, Toolchain};
use crate::config::Config;
use crate::error::{Component, Error, Result};
use crate::verbose::{Timer, dprintln};

/// Cargo package producing `boot_loader.efi`.
pub const BOOT_LOADER_PACKAGE: &str = "boot_loader";
/// Cargo package producing the kernel start image.
pub const KERNEL_PACKAGE: &str = "kernel_start";

/// The two cargo invocations for `profile`, in build order.
pub fn requests(
    profile: &ArchProfile,
    build_profile: BuildProfile,
    config: &Config,
) -> [(Component, CargoBuild); 2] {
    let release = build_profile.is_release();
    [
        (
            Component::BootLoader,
            CargoBuild {
                target: profile.uefi_target.into(),
                package: BOOT_LOADER_PACKAGE.into(),
                features: Vec::new(),
                release,
            },
        ),
        (
            Component::Kernel,
            CargoBuild {
                target: profile.kernel_target.into(),
                package: KERNEL_PACKAGE.into(),
                features: config.kernel_features.clone(),
                release,
            },
        ),
    ]
}

/// Build the boot loader and kernel for one architecture.
pub fn build(
    toolchain: &dyn Toolchain,
    config: &Config,
    profile: &'static ArchProfile,
    build_profile: BuildProfile,
) -> Result<()> {
    let _t = Timer::start(format!("{} build", profile.id));

    for (component, request) in requests(profile, build_profile, config) {
        dprintln!(
            "Building {component} for {} ({})",
            request.target,
            build_profile.dir_name()
        );
        let status = toolchain.build(&request).map_err(|source| Error::Process {
            program: toolchain.program().to_string(),
            source,
        })?;
        if !status.success() {
            return Err(Error::BuildFailure {
                arch: profile.id,
                component,
                status,
            });
        }
    }

    let efi = config.boot_loader_artifact(profile.uefi_target, build_profile.dir_name());
    if !efi.exists() {
        return Err(Error::staging(
            profile.id,
            &efi,
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "boot loader missing after a successful build",
            ),
        ));
    }

    Ok(())
}

/// Build every registered architecture in order, stopping at the first
/// failure.
pub fn build_all(
    toolchain: &dyn Toolchain,
    config: &Config,
    build_profile: BuildProfile,
) -> Result<()> {
    for profile in arch::all() {
        build(toolchain, config, profile, build_profile)?;
    }
    Ok(())
}
