//! Disc image handling module
//!
//! Reads ISO 9660 volumes and BIN/CUE track layouts.

pub mod bincue;
pub mod browse;
pub mod formats;
pub mod iso9660;

pub use bincue::{read_cue_sheet, BinCueError, CueLayout, CueTrack, CD_FRAME_SIZE};
pub use formats::{FilesystemType, ImageFormat};
pub use iso9660::{VolumeDescriptor, VolumeDescriptorSet};
