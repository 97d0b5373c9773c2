//! Configuration loading from workspace metadata.
//!
//! Reads `[workspace.metadata.corgos]` from the root `Cargo.toml`. Every key
//! is optional; the defaults reproduce the usual developer setup.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CorgOS workspace metadata from Cargo.toml.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct CorgosMetadata {
    memory: Option<String>,
    cores: Option<u32>,
    esp_dir: Option<PathBuf>,
    firmware_dir: Option<PathBuf>,
    llvm_bin_dir: Option<PathBuf>,
    #[serde(default)]
    kernel_features: Vec<String>,
}

/// Workspace configuration.
#[derive(Debug, Deserialize)]
struct WorkspaceConfig {
    workspace: WorkspaceSection,
}

#[derive(Debug, Deserialize)]
struct WorkspaceSection {
    metadata: Option<MetadataSection>,
}

#[derive(Debug, Deserialize)]
struct MetadataSection {
    corgos: Option<CorgosMetadata>,
}

/// Build configuration for xtask commands.
#[derive(Debug, Clone)]
pub struct Config {
    /// Workspace root directory.
    pub workspace_root: PathBuf,
    /// Target directory for build artifacts.
    pub target_dir: PathBuf,
    /// Guest memory size passed to `-m`.
    pub memory: String,
    /// Guest core count passed to `-smp`.
    pub cores: u32,
    /// ESP mirror exposed to the guest as a FAT drive.
    pub esp_dir: PathBuf,
    /// Directory holding the per-run firmware copies.
    pub firmware_dir: PathBuf,
    /// Extra directory prepended to `PATH` for toolchain children only.
    pub llvm_bin_dir: Option<PathBuf>,
    /// Features enabled on the kernel start package.
    pub kernel_features: Vec<String>,
}

impl Config {
    /// Load configuration from workspace.
    pub fn load() -> Result<Self> {
        let workspace_root = find_workspace_root()?;
        let cargo_toml = workspace_root.join("Cargo.toml");
        let content = std::fs::read_to_string(&cargo_toml)
            .with_context(|| format!("Failed to read {}", cargo_toml.display()))?;

        Self::from_manifest(&workspace_root, &content)
    }

    /// Build the configuration from the text of the root manifest.
    pub fn from_manifest(workspace_root: &Path, manifest: &str) -> Result<Self> {
        let config: WorkspaceConfig =
            toml::from_str(manifest).context("Failed to parse Cargo.toml")?;

        let meta = config
            .workspace
            .metadata
            .and_then(|m| m.corgos)
            .unwrap_or_default();

        let mut config = Self::with_defaults(workspace_root);
        if let Some(memory) = meta.memory {
            config.memory = memory;
        }
        if let Some(cores) = meta.cores {
            anyhow::ensure!(cores > 0, "`cores` must be at least 1");
            config.cores = cores;
        }
        if let Some(dir) = meta.esp_dir {
            config.esp_dir = workspace_root.join(dir);
        }
        if let Some(dir) = meta.firmware_dir {
            config.firmware_dir = workspace_root.join(dir);
        }
        config.llvm_bin_dir = meta.llvm_bin_dir.or_else(default_llvm_bin_dir);
        config.kernel_features = meta.kernel_features;
        Ok(config)
    }

    /// Defaults rooted at `workspace_root`, without reading any manifest.
    pub fn with_defaults(workspace_root: &Path) -> Self {
        Self {
            workspace_root: workspace_root.to_path_buf(),
            target_dir: workspace_root.join("target"),
            memory: "256M".to_string(),
            cores: 8,
            esp_dir: workspace_root.join("esp"),
            firmware_dir: workspace_root.join("ovmf"),
            llvm_bin_dir: None,
            kernel_features: Vec::new(),
        }
    }

    /// Where cargo leaves the boot loader for a triple and profile.
    pub fn boot_loader_artifact(&self, uefi_target: &str, profile_dir: &str) -> PathBuf {
        self.target_dir
            .join(uefi_target)
            .join(profile_dir)
            .join("boot_loader.efi")
    }
}

/// Homebrew ships the LLVM linker outside the default search path on macOS.
fn default_llvm_bin_dir() -> Option<PathBuf> {
    if !cfg!(target_os = "macos") {
        return None;
    }
    let dir = PathBuf::from("/opt/homebrew/opt/llvm/bin");
    dir.is_dir().then_some(dir)
}

/// Find the workspace root by looking for Cargo.toml with [workspace].
fn find_workspace_root() -> Result<PathBuf> {
    let mut dir = std::env::current_dir().context("Failed to get current directory")?;

    loop {
        let cargo_toml = dir.join("Cargo.toml");
        if cargo_toml.exists() {
            let content = std::fs::read_to_string(&cargo_toml)?;
            if content.contains("[workspace]") {
                return Ok(dir);
            }
        }

        if !dir.pop() {
            anyhow::bail!("Could not find workspace root (no Cargo.toml with [workspace] found)");
        }
    }
}
