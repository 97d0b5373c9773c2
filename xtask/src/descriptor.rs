//! Boot descriptor emission.
//!
//! The boot loader reads a small `key = value` file from the ESP root at
//! startup. It carries the build provenance and a few runtime switches.

use std::fs;
use std::path::{Path, PathBuf};

use crate::arch::ArchProfile;
use crate::error::{Error, Result};
use crate::provenance::{Provenance, ProvenanceSource};
use crate::verbose::vprintln;

const LOG_LEVEL: &str = "trace";
const WAIT_FOR_START: bool = false;
const WALK_PAGE_TABLES: bool = false;

/// Render the descriptor text for `profile`.
pub fn render(profile: &ArchProfile, provenance: &Provenance) -> String {
    let dirty = if provenance.dirty { "(dirty)" } else { "" };
    format!(
        "revision = \"{}{} {}, branch '{}'\"\n\
         log_device = {}\n\
         log_level = {LOG_LEVEL}\n\
         wait_for_start = {WAIT_FOR_START}\n\
         walk_page_tables = {WALK_PAGE_TABLES}\n",
        provenance.revision, dirty, provenance.date, provenance.branch, profile.log_device,
    )
}

/// Write the descriptor for `profile` into `esp_dir`, replacing any
/// previous one. Provenance is read fresh on every call.
pub fn emit(
    profile: &'static ArchProfile,
    esp_dir: &Path,
    source: &dyn ProvenanceSource,
) -> Result<PathBuf> {
    let provenance = source.read()?;
    let path = esp_dir.join(profile.boot_ini);
    fs::write(&path, render(profile, &provenance))
        .map_err(|e| Error::staging(profile.id, &path, e))?;
    vprintln!("  wrote {}", path.display());
    Ok(path)
}
