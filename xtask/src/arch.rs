//! Per-architecture build and run parameters.
//!
//! Everything that varies between targets lives in the static [`PROFILES`]
//! table; callers branch on data, never on the architecture itself.

use crate::error::{Error, Result};

/// Build/run parameters for one supported target architecture.
#[derive(Debug, PartialEq, Eq)]
pub struct ArchProfile {
    /// Canonical architecture id, e.g. `x86_64`.
    pub id: &'static str,
    /// QEMU system emulator binary.
    pub qemu_binary: &'static str,
    /// CPU model used when running without hardware acceleration.
    pub cpu_model: &'static str,
    /// QEMU machine type.
    pub machine: &'static str,
    /// Semihosting / debug-exit device arguments.
    pub debug_exit: &'static [&'static str],
    /// Log device written into the boot descriptor.
    pub log_device: &'static str,
    /// Firmware code image, relative to the workspace root.
    pub firmware_code: &'static str,
    /// Firmware variable store image, relative to the workspace root.
    pub firmware_vars: &'static str,
    /// Boot binary name the firmware looks for under `efi/boot`.
    pub boot_efi: &'static str,
    /// Boot descriptor file name at the ESP root.
    pub boot_ini: &'static str,
    /// Target triple for the boot loader.
    pub uefi_target: &'static str,
    /// Target triple for the kernel start image.
    pub kernel_target: &'static str,
}

pub static PROFILES: &[ArchProfile] = &[
    ArchProfile {
        id: "x86_64",
        qemu_binary: "qemu-system-x86_64",
        cpu_model: "qemu64",
        machine: "q35",
        debug_exit: &["-device", "isa-debug-exit,iobase=0xf4,iosize=0x04"],
        log_device: "com2",
        firmware_code: "edk2-uefi/ovmf-x64-4m/OVMF_CODE.fd",
        firmware_vars: "edk2-uefi/ovmf-x64-4m/OVMF_VARS.fd",
        boot_efi: "bootx64.efi",
        boot_ini: "corgos-boot-x86_64.ini",
        uefi_target: "x86_64-unknown-uefi",
        kernel_target: "x86_64-unknown-none",
    },
    ArchProfile {
        id: "aarch64",
        qemu_binary: "qemu-system-aarch64",
        cpu_model: "cortex-a76",
        machine: "virt",
        debug_exit: &["-semihosting"],
        log_device: "\"pl011@9000000\"",
        firmware_code: "edk2-uefi/aarch64/QEMU_EFI-silent-pflash.raw",
        firmware_vars: "edk2-uefi/aarch64/vars-template-pflash.raw",
        boot_efi: "bootaa64.efi",
        boot_ini: "corgos-boot-aarch64.ini",
        uefi_target: "aarch64-unknown-uefi",
        kernel_target: "aarch64-unknown-none",
    },
];

/// Map vendor and platform aliases to a canonical architecture id.
///
/// Matching is case-insensitive. Unrecognized names come back lower-cased
/// and otherwise unchanged; [`lookup`] decides whether they are supported.
pub fn normalize(name: &str) -> String {
    let lower = name.to_ascii_lowercase();
    match lower.as_str() {
        "amd64" | "x64" | "x86-64" => "x86_64".to_string(),
        "arm64" => "aarch64".to_string(),
        _ => lower,
    }
}

/// Look up the profile for an architecture name or alias.
pub fn lookup(name: &str) -> Result<&'static ArchProfile> {
    let id = normalize(name);
    PROFILES.iter().find(|p| p.id == id).ok_or_else(|| {
        Error::Configuration(format!(
            "unsupported architecture `{name}` (supported: {})",
            supported().join(", ")
        ))
    })
}

/// All registered profiles, in build order.
pub fn all() -> impl Iterator<Item = &'static ArchProfile> {
    PROFILES.iter()
}

fn supported() -> Vec<&'static str> {
    PROFILES.iter().map(|p| p.id).collect()
}

/// `clap` value parser that accepts any alias of a supported architecture.
pub fn parse_arch(name: &str) -> Result<&'static ArchProfile, String> {
    lookup(name).map_err(|e| e.to_string())
}

/// Debug or release artifact selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BuildProfile {
    #[default]
    Debug,
    Release,
}

impl BuildProfile {
    pub fn from_release(release: bool) -> Self {
        if release {
            BuildProfile::Release
        } else {
            BuildProfile::Debug
        }
    }

    pub fn is_release(self) -> bool {
        self == BuildProfile::Release
    }

    /// Cargo output directory name under `target/<triple>/`.
    pub fn dir_name(self) -> &'static str {
        match self {
            BuildProfile::Debug => "debug",
            BuildProfile::Release => "release",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ALIASES: &[&str] = &[
        "x86_64", "X86_64", "amd64", "AMD64", "x64", "x86-64", "aarch64", "AArch64", "arm64",
        "ARM64", "riscv64", "Sparc",
    ];

    #[test]
    fn test_normalize_aliases() {
        assert_eq!(normalize("amd64"), "x86_64");
        assert_eq!(normalize("X64"), "x86_64");
        assert_eq!(normalize("ARM64"), "aarch64");
        assert_eq!(normalize("aarch64"), "aarch64");
    }

    #[test]
    fn test_normalize_passes_unknown_through_lowercased() {
        assert_eq!(normalize("RiscV64"), "riscv64");
    }

    #[test]
    fn test_normalize_idempotent_for_aliases() {
        for alias in ALIASES {
            let once = normalize(alias);
            assert_eq!(normalize(&once), once, "alias {alias}");
        }
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(name in "[A-Za-z0-9_-]{0,12}") {
            let once = normalize(&name);
            prop_assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn test_lookup_known() {
        assert_eq!(lookup("amd64").unwrap().id, "x86_64");
        assert_eq!(lookup("arm64").unwrap().id, "aarch64");
    }

    #[test]
    fn test_lookup_unknown_is_configuration_error() {
        let err = lookup("riscv64").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.to_string().contains("riscv64"));
    }

    #[test]
    fn test_profiles_complete_and_distinct() {
        let [a, b] = [&PROFILES[0], &PROFILES[1]];
        let fields = |p: &ArchProfile| {
            vec![
                p.id,
                p.qemu_binary,
                p.cpu_model,
                p.machine,
                p.log_device,
                p.firmware_code,
                p.firmware_vars,
                p.boot_efi,
                p.boot_ini,
                p.uefi_target,
                p.kernel_target,
            ]
        };
        for p in PROFILES {
            assert!(!p.debug_exit.is_empty(), "{}", p.id);
            for field in fields(p) {
                assert!(!field.is_empty(), "{} has an empty field", p.id);
            }
        }
        for (fa, fb) in fields(a).into_iter().zip(fields(b)) {
            assert_ne!(fa, fb);
        }
        assert_ne!(a.debug_exit, b.debug_exit);
    }

    #[test]
    fn test_profile_fields_follow_id() {
        for p in all() {
            assert!(p.qemu_binary.ends_with(p.id));
            assert!(p.boot_ini.contains(p.id));
            assert!(p.uefi_target.starts_with(p.id));
            assert!(p.kernel_target.starts_with(p.id));
        }
    }

    #[test]
    fn test_build_profile_dirs() {
        assert_eq!(BuildProfile::from_release(false).dir_name(), "debug");
        assert_eq!(BuildProfile::from_release(true).dir_name(), "release");
        assert!(BuildProfile::Release.is_release());
    }
}
