//! Cargo invocation for the boot loader and kernel targets.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::Config;
use crate::process::ChildExit;
use crate::verbose::{command_line, vprintln};

/// One `cargo build` of a single package for a single target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CargoBuild {
    /// Target triple, e.g. "x86_64-unknown-uefi".
    pub target: String,
    /// Package to build (-p flag).
    pub package: String,
    /// Features to enable; omitted from the command line when empty.
    pub features: Vec<String>,
    /// Whether to pass --release.
    pub release: bool,
}

impl CargoBuild {
    /// Arguments following `cargo`.
    pub fn args(&self) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "build".into(),
            "-p".into(),
            self.package.clone(),
            "--target".into(),
            self.target.clone(),
        ];

        if !self.features.is_empty() {
            args.push("--features".into());
            args.push(self.features.join(","));
        }

        if self.release {
            args.push("--release".into());
        }

        args
    }
}

/// The native toolchain as seen by the build invoker.
pub trait Toolchain {
    /// Run one build to completion. `Err` means the toolchain could not be
    /// started at all; a failed build is a non-successful [`ChildExit`].
    fn build(&self, request: &CargoBuild) -> std::io::Result<ChildExit>;

    /// Program name used in diagnostics.
    fn program(&self) -> &str {
        "cargo"
    }
}

/// Runs the real `cargo` from the workspace root, streaming its output.
pub struct Cargo {
    workspace_root: PathBuf,
    llvm_bin_dir: Option<PathBuf>,
}

impl Cargo {
    pub fn new(config: &Config) -> Self {
        Self {
            workspace_root: config.workspace_root.clone(),
            llvm_bin_dir: config.llvm_bin_dir.clone(),
        }
    }

    /// Build the child command. The LLVM directory only reaches the child's
    /// own environment.
    pub fn command(&self, request: &CargoBuild) -> Command {
        let mut cmd = Command::new("cargo");
        cmd.args(request.args());
        cmd.current_dir(&self.workspace_root);

        if let Some(dir) = &self.llvm_bin_dir {
            let current = std::env::var_os("PATH").unwrap_or_default();
            if let Some(path) = prepend_path(dir, &current) {
                cmd.env("PATH", path);
            }
        }
        cmd
    }
}

impl Toolchain for Cargo {
    fn build(&self, request: &CargoBuild) -> std::io::Result<ChildExit> {
        vprintln!("  $ {}", command_line("cargo", &request.args()));
        let status = self.command(request).status()?;
        Ok(status.into())
    }
}

/// `dir` followed by every entry of `current`; `None` if `dir` cannot be
/// represented in a search path.
fn prepend_path(dir: &Path, current: &OsString) -> Option<OsString> {
    let entries = std::iter::once(dir.to_path_buf()).chain(std::env::split_paths(current));
    std::env::join_paths(entries).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(release: bool, features: &[&str]) -> CargoBuild {
        CargoBuild {
            target: "aarch64-unknown-uefi".into(),
            package: "boot_loader".into(),
            features: features.iter().map(|f| f.to_string()).collect(),
            release,
        }
    }

    #[test]
    fn test_debug_args() {
        assert_eq!(
            request(false, &[]).args(),
            ["build", "-p", "boot_loader", "--target", "aarch64-unknown-uefi"]
        );
    }

    #[test]
    fn test_release_args_with_features() {
        assert_eq!(
            request(true, &["a", "b"]).args(),
            [
                "build",
                "-p",
                "boot_loader",
                "--target",
                "aarch64-unknown-uefi",
                "--features",
                "a,b",
                "--release"
            ]
        );
    }

    #[test]
    fn test_llvm_dir_only_in_child_env() {
        let mut config = Config::with_defaults(Path::new("/w"));
        config.llvm_bin_dir = Some(PathBuf::from("/opt/llvm/bin"));
        let before = std::env::var_os("PATH");

        let cmd = Cargo::new(&config).command(&request(false, &[]));

        let path = cmd
            .get_envs()
            .find(|(k, _)| *k == "PATH")
            .and_then(|(_, v)| v)
            .expect("PATH override");
        let first = std::env::split_paths(path).next().unwrap();
        assert_eq!(first, Path::new("/opt/llvm/bin"));
        assert_eq!(std::env::var_os("PATH"), before);
        assert_eq!(cmd.get_current_dir(), Some(Path::new("/w")));
    }

    #[test]
    fn test_no_override_without_llvm_dir() {
        let config = Config::with_defaults(Path::new("/w"));
        let cmd = Cargo::new(&config).command(&request(false, &[]));
        assert!(cmd.get_envs().all(|(k, _)| k != "PATH"));
    }

    #[test]
    fn test_prepend_path() {
        let joined = prepend_path(Path::new("/a"), &OsString::from("/b:/c")).unwrap();
        let entries: Vec<_> = std::env::split_paths(&joined).collect();
        assert_eq!(entries[0], Path::new("/a"));
        assert_eq!(entries.len(), if cfg!(windows) { 2 } else { 3 });
    }
}
