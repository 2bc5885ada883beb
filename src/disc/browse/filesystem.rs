//! Filesystem trait for reading a source disc volume

use super::entry::FileEntry;
use crate::disc::formats::FilesystemType;
use thiserror::Error;

/// Errors that can occur during filesystem operations
#[derive(Debug, Error)]
pub enum FilesystemError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Entry not found: {0}")]
    NotFound(String),

    #[error("Filesystem error: {0}")]
    Parse(String),
}

/// Read-only view of a parsed disc volume
///
/// Entries are returned as owned records; callers never hold on to reader
/// internals between calls.
pub trait Filesystem: Send {
    /// Volume identifier, trimmed of padding
    fn volume_id(&self) -> &str;

    /// System identifier, trimmed of padding
    fn system_id(&self) -> &str;

    /// Which name set the directory listings use
    fn name_source(&self) -> FilesystemType;

    /// List the contents of the directory at `path` ("/" is the root)
    ///
    /// `.` and `..` are never included.
    fn list_directory(&mut self, path: &str) -> Result<Vec<FileEntry>, FilesystemError>;

    /// Read `count` logical blocks starting at `lba`
    fn read_blocks(&mut self, lba: u64, count: u64) -> Result<Vec<u8>, FilesystemError>;
}
