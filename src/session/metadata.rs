//! Volume-level metadata of the image being edited

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Maximum length of the volume and system identifiers
pub const MAX_ID_LENGTH: usize = 32;

/// El Torito emulation mode for the BIOS boot image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BootEmulation {
    #[default]
    NoEmulation,
    Floppy,
    HardDisk,
}

impl BootEmulation {
    /// Image builder flag selecting this mode; floppy is the builder's default
    pub fn writer_flag(&self) -> Option<&'static str> {
        match self {
            BootEmulation::NoEmulation => Some("-no-emul-boot"),
            BootEmulation::Floppy => None,
            BootEmulation::HardDisk => Some("-hard-disk-boot"),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BootEmulation::NoEmulation => "noemul",
            BootEmulation::Floppy => "floppy",
            BootEmulation::HardDisk => "hdemul",
        }
    }
}

impl fmt::Display for BootEmulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BootEmulation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "noemul" | "none" | "no-emulation" => Ok(BootEmulation::NoEmulation),
            "floppy" => Ok(BootEmulation::Floppy),
            "hdemul" | "hard-disk" | "harddisk" => Ok(BootEmulation::HardDisk),
            other => Err(format!("unknown boot emulation mode: {}", other)),
        }
    }
}

/// Identifiers and boot configuration written into the volume
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VolumeMetadata {
    pub volume_id: String,
    pub system_id: String,
    /// BIOS (El Torito) boot image on the host
    pub boot_image: Option<PathBuf>,
    /// EFI boot image on the host
    pub efi_boot_image: Option<PathBuf>,
    pub boot_emulation: BootEmulation,
}

impl VolumeMetadata {
    pub fn new(volume_id: &str, system_id: &str) -> Self {
        Self {
            volume_id: clamp_identifier("volume id", volume_id),
            system_id: clamp_identifier("system id", system_id),
            ..Default::default()
        }
    }

    pub fn is_bootable(&self) -> bool {
        self.boot_image.is_some() || self.efi_boot_image.is_some()
    }
}

/// Trim padding and cut an identifier to [`MAX_ID_LENGTH`] characters
pub(crate) fn clamp_identifier(field: &str, value: &str) -> String {
    let value = value.trim();
    if value.chars().count() <= MAX_ID_LENGTH {
        return value.to_string();
    }

    log::warn!(
        "{} '{}' is longer than {} characters, truncating",
        field,
        value,
        MAX_ID_LENGTH
    );
    value.chars().take(MAX_ID_LENGTH).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emulation_flags() {
        assert_eq!(BootEmulation::default(), BootEmulation::NoEmulation);
        assert_eq!(BootEmulation::NoEmulation.writer_flag(), Some("-no-emul-boot"));
        assert_eq!(BootEmulation::HardDisk.writer_flag(), Some("-hard-disk-boot"));
        assert_eq!(BootEmulation::Floppy.writer_flag(), None);
    }

    #[test]
    fn test_emulation_parse() {
        assert_eq!("hdemul".parse::<BootEmulation>(), Ok(BootEmulation::HardDisk));
        assert_eq!("FLOPPY".parse::<BootEmulation>(), Ok(BootEmulation::Floppy));
        assert_eq!("noemul".parse::<BootEmulation>(), Ok(BootEmulation::NoEmulation));
        assert!("cdrom".parse::<BootEmulation>().is_err());
    }

    #[test]
    fn test_identifiers_are_clamped() {
        let long = "A".repeat(40);
        let metadata = VolumeMetadata::new(&long, "  LINUX  ");

        assert_eq!(metadata.volume_id.len(), MAX_ID_LENGTH);
        assert_eq!(metadata.system_id, "LINUX");
        assert!(!metadata.is_bootable());
    }
}
