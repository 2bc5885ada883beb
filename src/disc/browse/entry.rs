//! Directory entry records returned by the backing volume reader

use chrono::{DateTime, Utc};

/// One file or directory as recorded on the source volume
#[derive(Debug, Clone)]
pub struct FileEntry {
    /// File/directory name with version suffix removed
    pub name: String,
    /// Full path from root (e.g., "/BOOT/grub.cfg")
    pub path: String,
    /// Entry type (file or directory)
    pub entry_type: EntryType,
    /// File size in bytes; for directories the extent length
    pub size: u64,
    /// Logical block address of the extent
    pub location: u64,
    /// Recording timestamp, if the record carries a valid date
    pub modified: Option<DateTime<Utc>>,
    /// ISO "existence" flag
    pub hidden: bool,
}

/// Type of filesystem entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    File,
    Directory,
}

impl FileEntry {
    /// Check if this is a directory
    pub fn is_directory(&self) -> bool {
        self.entry_type == EntryType::Directory
    }

    /// Check if this is a file
    pub fn is_file(&self) -> bool {
        self.entry_type == EntryType::File
    }
}

/// Join a parent path and a child name the way entry paths are built
pub fn join_path(parent: &str, name: &str) -> String {
    if parent == "/" || parent.is_empty() {
        format!("/{}", name)
    } else {
        format!("{}/{}", parent.trim_end_matches('/'), name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("/", "BOOT"), "/BOOT");
        assert_eq!(join_path("", "BOOT"), "/BOOT");
        assert_eq!(join_path("/BOOT", "grub"), "/BOOT/grub");
        assert_eq!(join_path("/BOOT/", "grub"), "/BOOT/grub");
    }
}
