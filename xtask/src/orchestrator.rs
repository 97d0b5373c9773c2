//! Sequencing of build, staging, descriptor emission and launch.
//!
//! Only one invocation may operate on a workspace at a time: the staging
//! directories are shared and unlocked. An interrupted run can leave them
//! half populated; the next run wipes them before use.

use crate::accel::{self, HostPlatform};
use crate::arch::{ArchProfile, BuildProfile};
use crate::build;
use crate::cargo::Toolchain;
use crate::config::Config;
use crate::descriptor;
use crate::error::{Error, Result};
use crate::provenance::ProvenanceSource;
use crate::qemu::{Emulator, LaunchSpec};
use crate::staging::StagingArea;
use crate::verbose::{Timer, dprintln};

/// The collaborators and settings one xtask invocation works with.
pub struct Orchestrator<'a> {
    pub config: &'a Config,
    pub host: HostPlatform,
    pub toolchain: &'a dyn Toolchain,
    pub emulator: &'a dyn Emulator,
    pub provenance: &'a dyn ProvenanceSource,
}

impl Orchestrator<'_> {
    pub fn staging(&self) -> StagingArea {
        StagingArea::from_config(self.config)
    }

    /// Build the listed architectures in order.
    pub fn build(&self, profiles: &[&'static ArchProfile], build_profile: BuildProfile) -> Result<()> {
        for &profile in profiles {
            build::build(self.toolchain, self.config, profile, build_profile)?;
        }
        Ok(())
    }

    /// Build every registered architecture.
    pub fn build_all(&self, build_profile: BuildProfile) -> Result<()> {
        build::build_all(self.toolchain, self.config, build_profile)
    }

    /// Stage the boot environment for `profile` and run it under QEMU.
    ///
    /// The accelerator is resolved first so that an impossible request
    /// fails before the staging area is touched.
    pub fn launch(
        &self,
        profile: &'static ArchProfile,
        accel_requested: bool,
        build_profile: BuildProfile,
    ) -> Result<()> {
        let accel = accel::resolve(profile.id, accel_requested, &self.host)?;

        let staging = self.staging();
        {
            let _t = Timer::start("staging");
            dprintln!("Staging {} boot environment", profile.id);
            staging.reset_and_populate(profile, build_profile, self.config)?;
            descriptor::emit(profile, &staging.esp_dir, self.provenance)?;
        }

        let spec = LaunchSpec::compose(profile, accel, self.config, &staging);
        dprintln!("Launching {} ({:?} acceleration)", spec.program, accel);
        let status = self.emulator.run(&spec).map_err(|source| Error::Process {
            program: spec.program.clone(),
            source,
        })?;
        if !status.success() {
            return Err(Error::Launch {
                arch: profile.id,
                status,
            });
        }
        Ok(())
    }

    /// Build `profile` unless `skip_build`, then launch it.
    pub fn build_and_run(
        &self,
        profile: &'static ArchProfile,
        accel_requested: bool,
        build_profile: BuildProfile,
        skip_build: bool,
    ) -> Result<()> {
        // Refuse before spending time on a build that can't be launched.
        accel::resolve(profile.id, accel_requested, &self.host)?;
        if !skip_build {
            self.build(&[profile], build_profile)?;
        }
        self.launch(profile, accel_requested, build_profile)
    }

    /// Remove the staging directories.
    pub fn clean(&self) -> Result<()> {
        self.staging().clean()
    }
}
