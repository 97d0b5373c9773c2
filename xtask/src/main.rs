//! Build automation for CorgOS.
//!
//! Usage:
//!   cargo xtask build x86_64         - Build the boot loader and kernel for one architecture
//!   cargo xtask build --all          - Build every supported architecture
//!   cargo xtask run aarch64          - Build, stage the ESP and boot it in QEMU
//!   cargo xtask run x86_64 --accel   - Same, with KVM/HVF when the host matches the guest
//!   cargo xtask run x86_64 --no-build
//!   cargo xtask clean                - Remove the staging directories
//!
//! One invocation per workspace at a time: the staging directories are not
//! locked.

mod accel;
mod arch;
mod build;
mod cargo;
mod config;
mod descriptor;
mod error;
mod orchestrator;
mod process;
mod provenance;
mod qemu;
mod staging;
mod verbose;

use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use crate::accel::HostPlatform;
use crate::arch::{ArchProfile, BuildProfile};
use crate::cargo::Cargo;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::orchestrator::Orchestrator;
use crate::provenance::GitProvenance;
use crate::qemu::Qemu;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Build automation for CorgOS")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Print child command lines, copied files and timings
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Args)]
struct ProfileArgs {
    /// Build in release mode
    #[arg(short, long)]
    release: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the boot loader and kernel
    Build {
        /// Architectures to build (aliases such as amd64 or arm64 are accepted)
        #[arg(value_parser = arch::parse_arch, required_unless_present = "all")]
        arch: Vec<&'static ArchProfile>,

        /// Build every supported architecture
        #[arg(long, conflicts_with = "arch")]
        all: bool,

        #[command(flatten)]
        profile: ProfileArgs,
    },

    /// Build, stage the boot environment and run it in QEMU
    Run {
        /// Target architecture
        #[arg(value_parser = arch::parse_arch)]
        arch: &'static ArchProfile,

        /// Enable hardware acceleration (host and guest architecture must match)
        #[arg(long)]
        accel: bool,

        /// Launch the existing build without rebuilding
        #[arg(long)]
        no_build: bool,

        #[command(flatten)]
        profile: ProfileArgs,
    },

    /// Remove the staging directories
    Clean,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    verbose::init(cli.quiet, cli.verbose);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            if let Some(source) = std::error::Error::source(&err) {
                verbose::vprintln!("  caused by: {source}");
            }
            ExitCode::from(err.exit_code())
        }
    }
}

fn run(command: Commands) -> Result<()> {
    let config = Config::load().map_err(Error::from)?;
    let toolchain = Cargo::new(&config);
    let provenance = GitProvenance::new(&config.workspace_root);
    let orchestrator = Orchestrator {
        config: &config,
        host: HostPlatform::current(),
        toolchain: &toolchain,
        emulator: &Qemu,
        provenance: &provenance,
    };

    match command {
        Commands::Build { arch, all, profile } => {
            let build_profile = BuildProfile::from_release(profile.release);
            if all {
                orchestrator.build_all(build_profile)?;
            } else {
                orchestrator.build(&arch, build_profile)?;
            }
            verbose::dprintln!("Build finished ({})", build_profile.dir_name());
        }

        Commands::Run {
            arch,
            accel,
            no_build,
            profile,
        } => {
            let build_profile = BuildProfile::from_release(profile.release);
            orchestrator.build_and_run(arch, accel, build_profile, no_build)?;
        }

        Commands::Clean => {
            orchestrator.clean()?;
            verbose::dprintln!("Removed staging directories");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_accepts_aliases() {
        let cli = Cli::try_parse_from(["xtask", "run", "AMD64", "--accel", "-r"]).unwrap();
        match cli.command {
            Commands::Run {
                arch,
                accel,
                no_build,
                profile,
            } => {
                assert_eq!(arch.id, "x86_64");
                assert!(accel);
                assert!(!no_build);
                assert!(profile.release);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_unknown_arch_rejected() {
        assert!(Cli::try_parse_from(["xtask", "run", "riscv64"]).is_err());
    }

    #[test]
    fn test_build_several_or_all() {
        let cli = Cli::try_parse_from(["xtask", "build", "x86_64", "arm64"]).unwrap();
        match cli.command {
            Commands::Build { arch, all, .. } => {
                let ids: Vec<_> = arch.iter().map(|p| p.id).collect();
                assert_eq!(ids, ["x86_64", "aarch64"]);
                assert!(!all);
            }
            _ => panic!("expected build"),
        }

        let cli = Cli::try_parse_from(["xtask", "-q", "build", "--all"]).unwrap();
        assert!(cli.quiet);
        assert!(matches!(cli.command, Commands::Build { all: true, .. }));

        assert!(Cli::try_parse_from(["xtask", "build"]).is_err());
        assert!(Cli::try_parse_from(["xtask", "build", "--all", "x86_64"]).is_err());
    }
}
