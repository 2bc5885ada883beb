//! Disc image format definitions

use std::path::Path;

/// Image formats accepted by the loader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// ISO 9660 disc image (with optional Joliet / Rock Ridge extensions)
    Iso,
    /// CUE sheet describing tracks in one or more companion BIN files
    CueSheet,
}

impl ImageFormat {
    /// Detect the image format from the file extension
    ///
    /// Only `.cue` (in any case) selects the CUE sheet path; every other
    /// extension is treated as a direct disc image.
    pub fn from_path(path: &Path) -> Self {
        let is_cue = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("cue"))
            .unwrap_or(false);

        if is_cue {
            Self::CueSheet
        } else {
            Self::Iso
        }
    }

    /// Get the display name for this format
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Iso => "ISO 9660",
            Self::CueSheet => "BIN/CUE",
        }
    }
}

/// Supported filesystem extensions found on loaded images
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilesystemType {
    /// Plain ISO 9660 names (8.3, upper case)
    Iso9660,
    /// Joliet extensions (UCS-2 names)
    Joliet,
    /// Rock Ridge extensions (POSIX names)
    RockRidge,
}

impl FilesystemType {
    /// Get the display name for this filesystem type
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Iso9660 => "ISO 9660",
            Self::Joliet => "Joliet",
            Self::RockRidge => "Rock Ridge",
        }
    }
}
