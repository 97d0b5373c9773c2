//! QEMU command composition and launch.
//!
//! The argument vector is assembled as a list; optional segments are
//! included or left out by branching, never by splicing text.

use std::path::PathBuf;
use std::process::Command;

use crate::accel::AccelFlag;
use crate::arch::ArchProfile;
use crate::config::Config;
use crate::process::ChildExit;
use crate::staging::StagingArea;
use crate::verbose::{command_line, vprintln};

/// CPU model used when the guest runs on the host's own cores.
pub const HOST_CPU: &str = "host";

/// Serial console mirror (first serial port, shared with the monitor).
pub const SERIAL_LOG: &str = "serial1.log";
/// Second serial port.
pub const SERIAL2_LOG: &str = "serial2.log";
/// Firmware debug console.
pub const FIRMWARE_LOG: &str = "fw.log";

/// A fully resolved emulator invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Directory the log files are written to.
    pub working_dir: PathBuf,
}

impl LaunchSpec {
    /// Compose the QEMU command line for `profile`.
    pub fn compose(
        profile: &ArchProfile,
        accel: AccelFlag,
        config: &Config,
        staging: &StagingArea,
    ) -> Self {
        let mut args: Vec<String> = vec!["-nodefaults".into(), "-s".into()];

        args.push("-machine".into());
        args.push(profile.machine.into());
        args.extend(accel.args().iter().map(|a| a.to_string()));

        // Emulated feature flags must not be forwarded to a real CPU.
        args.push("-cpu".into());
        args.push(if accel.is_enabled() {
            HOST_CPU.into()
        } else {
            profile.cpu_model.into()
        });

        args.push("-m".into());
        args.push(config.memory.clone());
        args.push("-smp".into());
        args.push(config.cores.to_string());

        if !accel.is_enabled() {
            args.extend(profile.debug_exit.iter().map(|a| a.to_string()));
        }

        let serial = format!("stdio,id=char0,mux=on,logfile={SERIAL_LOG},signal=off");
        let firmware_debug = format!("file,id=fwdebug,path={FIRMWARE_LOG}");
        let serial2 = format!("file,path={SERIAL2_LOG},id=char1");
        for arg in [
            "-chardev",
            serial.as_str(),
            "-chardev",
            firmware_debug.as_str(),
            "-serial",
            "chardev:char0",
            "-mon",
            "chardev=char0",
            "-chardev",
            serial2.as_str(),
            "-serial",
            "chardev:char1",
        ] {
            args.push(arg.to_string());
        }

        args.push("-drive".into());
        args.push(format!("format=raw,file=fat:rw:{}", staging.esp_dir.display()));
        args.push("-drive".into());
        args.push(format!(
            "if=pflash,format=raw,file={},readonly=on",
            staging.firmware_copy(profile.firmware_code).display()
        ));
        args.push("-drive".into());
        args.push(format!(
            "if=pflash,format=raw,file={}",
            staging.firmware_copy(profile.firmware_vars).display()
        ));

        args.push("-nographic".into());

        Self {
            program: profile.qemu_binary.into(),
            args,
            working_dir: config.workspace_root.clone(),
        }
    }

    /// The command line as it would be typed in a shell.
    pub fn display(&self) -> String {
        command_line(&self.program, &self.args)
    }

    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.current_dir(&self.working_dir);
        cmd
    }
}

/// Something that can run a composed launch to completion.
pub trait Emulator {
    /// Run the emulator and block until it exits. `Err` means the process
    /// could not be started.
    fn run(&self, spec: &LaunchSpec) -> std::io::Result<ChildExit>;
}

/// Runs QEMU as a child process with inherited standard streams.
pub struct Qemu;

impl Emulator for Qemu {
    fn run(&self, spec: &LaunchSpec) -> std::io::Result<ChildExit> {
        vprintln!("  $ {}", spec.display());
        let status = spec.command().status()?;
        Ok(status.into())
    }
}

/// Position of `needle` in `args`, for ordering assertions.
#[cfg(test)]
pub(crate) fn position(args: &[String], needle: &str) -> Option<usize> {
    args.iter().position(|a| a == needle)
}

/// Helper for tests that only care about a drive's file path.
#[cfg(test)]
pub(crate) fn drives(args: &[String]) -> Vec<&str> {
    args.windows(2)
        .filter(|w| w[0] == "-drive")
        .map(|w| w[1].as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch;
    use std::path::Path;

    fn setup(root: &Path) -> (Config, StagingArea) {
        let config = Config::with_defaults(root);
        let staging = StagingArea::from_config(&config);
        (config, staging)
    }

    #[test]
    fn test_emulated_x86_64() {
        let (config, staging) = setup(Path::new("/w"));
        let profile = arch::lookup("x86_64").unwrap();
        let spec = LaunchSpec::compose(profile, AccelFlag::None, &config, &staging);

        assert_eq!(spec.program, "qemu-system-x86_64");
        let args = &spec.args;
        let cpu = position(args, "-cpu").unwrap();
        assert_eq!(args[cpu + 1], "qemu64");
        let dev = position(args, "isa-debug-exit,iobase=0xf4,iosize=0x04").unwrap();
        assert_eq!(args[dev - 1], "-device");
        assert!(position(args, "-enable-kvm").is_none());
        assert_eq!(&args[..4], ["-nodefaults", "-s", "-machine", "q35"]);
        assert_eq!(args.last().map(String::as_str), Some("-nographic"));
    }

    #[test]
    fn test_accelerated_uses_host_cpu_without_debug_exit() {
        let (config, staging) = setup(Path::new("/w"));
        let profile = arch::lookup("aarch64").unwrap();
        let spec = LaunchSpec::compose(profile, AccelFlag::Hvf, &config, &staging);

        let args = &spec.args;
        let cpu = position(args, "-cpu").unwrap();
        assert_eq!(args[cpu + 1], HOST_CPU);
        assert!(position(args, "-semihosting").is_none());
        let accel = position(args, "-accel").unwrap();
        assert_eq!(args[accel + 1], "hvf");
        assert!(accel < cpu);
    }

    #[test]
    fn test_emulated_aarch64_has_semihosting() {
        let (config, staging) = setup(Path::new("/w"));
        let profile = arch::lookup("aarch64").unwrap();
        let spec = LaunchSpec::compose(profile, AccelFlag::None, &config, &staging);
        assert!(position(&spec.args, "-semihosting").is_some());
        let machine = position(&spec.args, "-machine").unwrap();
        assert_eq!(spec.args[machine + 1], "virt");
    }

    #[test]
    fn test_drive_order() {
        let (config, staging) = setup(Path::new("/w"));
        let profile = arch::lookup("x86_64").unwrap();
        let spec = LaunchSpec::compose(profile, AccelFlag::Kvm, &config, &staging);

        assert_eq!(
            drives(&spec.args),
            [
                "format=raw,file=fat:rw:/w/esp",
                "if=pflash,format=raw,file=/w/ovmf/OVMF_CODE.fd,readonly=on",
                "if=pflash,format=raw,file=/w/ovmf/OVMF_VARS.fd",
            ]
        );
    }

    #[test]
    fn test_memory_cores_and_serial() {
        let (mut config, staging) = setup(Path::new("/w"));
        config.memory = "1G".into();
        config.cores = 2;
        let profile = arch::lookup("x86_64").unwrap();
        let spec = LaunchSpec::compose(profile, AccelFlag::None, &config, &staging);

        let args = &spec.args;
        assert_eq!(args[position(args, "-m").unwrap() + 1], "1G");
        assert_eq!(args[position(args, "-smp").unwrap() + 1], "2");
        assert!(position(args, "stdio,id=char0,mux=on,logfile=serial1.log,signal=off").is_some());
        assert!(position(args, "file,id=fwdebug,path=fw.log").is_some());
        assert!(position(args, "file,path=serial2.log,id=char1").is_some());
        // Arguments are never split or joined text.
        assert!(args.iter().all(|a| !a.is_empty() && !a.starts_with(' ')));
    }

    #[test]
    fn test_esp_path_with_spaces_stays_one_argument() {
        let (config, _) = setup(Path::new("/w"));
        let staging = StagingArea::new("/tmp/my esp", "/tmp/my fw");
        let profile = arch::lookup("x86_64").unwrap();
        let spec = LaunchSpec::compose(profile, AccelFlag::None, &config, &staging);
        assert_eq!(drives(&spec.args)[0], "format=raw,file=fat:rw:/tmp/my esp");
    }

    #[test]
    fn test_command_mirrors_arguments() {
        let (config, staging) = setup(Path::new("/w"));
        let profile = arch::lookup("x86_64").unwrap();
        let spec = LaunchSpec::compose(profile, AccelFlag::None, &config, &staging);
        let cmd = spec.command();
        assert_eq!(cmd.get_program(), "qemu-system-x86_64");
        assert_eq!(cmd.get_args().count(), spec.args.len());
        assert_eq!(cmd.get_current_dir(), Some(Path::new("/w")));
        assert!(spec.display().starts_with("qemu-system-x86_64 -nodefaults -s"));
    }
}
