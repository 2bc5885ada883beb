//! Source volume browsing
//!
//! Lists directories and reads raw blocks of an existing ISO 9660 image
//! without materializing file contents.

pub mod entry;
pub mod filesystem;
pub mod iso9660_fs;
pub mod reader;

#[cfg(test)]
pub(crate) mod test_image;

pub use entry::{EntryType, FileEntry};
pub use filesystem::{Filesystem, FilesystemError};
pub use reader::{IsoSectorReader, SectorReader, SECTOR_SIZE};

use std::path::Path;

/// Open an image file on disk as a browsable filesystem
pub fn open_filesystem(path: &Path) -> Result<Box<dyn Filesystem>, FilesystemError> {
    let reader = IsoSectorReader::open(path)?;
    Ok(Box::new(iso9660_fs::Iso9660Filesystem::new(Box::new(reader))?))
}
