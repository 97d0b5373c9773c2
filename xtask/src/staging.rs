//! Ephemeral boot environment staging.
//!
//! Before every launch the ESP mirror and firmware directory are wiped and
//! rebuilt from scratch, so nothing from a run with a different
//! architecture or build profile can leak into the next one.

use std::fs;
use std::path::{Path, PathBuf};

use crate::arch::{ArchProfile, BuildProfile};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::verbose::vprintln;

/// The two directories handed to QEMU: the ESP mirror and firmware copies.
#[derive(Debug, Clone)]
pub struct StagingArea {
    pub esp_dir: PathBuf,
    pub firmware_dir: PathBuf,
}

impl StagingArea {
    pub fn new(esp_dir: impl Into<PathBuf>, firmware_dir: impl Into<PathBuf>) -> Self {
        Self {
            esp_dir: esp_dir.into(),
            firmware_dir: firmware_dir.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.esp_dir, &config.firmware_dir)
    }

    /// Directory the firmware searches for the default boot binary.
    pub fn boot_dir(&self) -> PathBuf {
        self.esp_dir.join("efi").join("boot")
    }

    /// Staged copy of a firmware image, keyed by its source path.
    pub fn firmware_copy(&self, source: &str) -> PathBuf {
        match Path::new(source).file_name() {
            Some(name) => self.firmware_dir.join(name),
            None => self.firmware_dir.join(source),
        }
    }

    /// Wipe and recreate the staging directories, then copy in the firmware
    /// images and the boot loader built for `build_profile`.
    pub fn reset_and_populate(
        &self,
        profile: &'static ArchProfile,
        build_profile: BuildProfile,
        config: &Config,
    ) -> Result<()> {
        self.reset(profile.id)?;
        self.populate(profile, build_profile, config)
    }

    /// Remove any previous staging tree and recreate the empty layout.
    pub fn reset(&self, arch: &'static str) -> Result<()> {
        for dir in [&self.esp_dir, &self.firmware_dir] {
            if dir.exists() {
                vprintln!("  removing {}", dir.display());
                fs::remove_dir_all(dir).map_err(|e| Error::staging(arch, dir, e))?;
            }
        }

        let boot_dir = self.boot_dir();
        fs::create_dir_all(&boot_dir).map_err(|e| Error::staging(arch, &boot_dir, e))?;
        fs::create_dir_all(&self.firmware_dir)
            .map_err(|e| Error::staging(arch, &self.firmware_dir, e))?;
        Ok(())
    }

    fn populate(
        &self,
        profile: &'static ArchProfile,
        build_profile: BuildProfile,
        config: &Config,
    ) -> Result<()> {
        for image in [profile.firmware_code, profile.firmware_vars] {
            let source = config.workspace_root.join(image);
            copy(profile.id, &source, &self.firmware_copy(image))?;
        }

        let boot_loader =
            config.boot_loader_artifact(profile.uefi_target, build_profile.dir_name());
        copy(profile.id, &boot_loader, &self.boot_dir().join(profile.boot_efi))
    }

    /// Remove both staging directories if they exist.
    pub fn clean(&self) -> Result<()> {
        for dir in [&self.esp_dir, &self.firmware_dir] {
            if dir.exists() {
                fs::remove_dir_all(dir).map_err(|e| Error::staging("all", dir, e))?;
            }
        }
        Ok(())
    }
}

fn copy(arch: &'static str, from: &Path, to: &Path) -> Result<()> {
    vprintln!("  {} -> {}", from.display(), to.display());
    // Report the missing source, not the destination.
    fs::copy(from, to).map_err(|e| Error::staging(arch, from, e))?;
    Ok(())
}
