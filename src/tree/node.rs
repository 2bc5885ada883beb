//! Node type of the editable image tree

use std::path::PathBuf;

use chrono::{DateTime, Utc};

/// Handle to a node in a [`Tree`](super::Tree)
///
/// Slots are never reused, so a handle to a removed node stays invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

/// Where a file node's bytes live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataOrigin {
    /// Bytes held in memory until the next save
    Staged(Vec<u8>),
    /// Extent in the source ISO image, addressed by logical block
    Archival { lba: u64 },
    /// Slice of a raw BIN file described by a CUE sheet
    Track {
        bin_path: PathBuf,
        offset: u64,
        number: u32,
    },
}

impl DataOrigin {
    /// Short label used in listings
    pub fn label(&self) -> &'static str {
        match self {
            DataOrigin::Staged(_) => "staged",
            DataOrigin::Archival { .. } => "archival",
            DataOrigin::Track { .. } => "track",
        }
    }
}

/// Directory or file payload of a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Directory { children: Vec<NodeId> },
    File { origin: DataOrigin },
}

/// One file or directory in the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub name: String,
    /// Size in bytes, 0 for directories
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    /// ISO 9660 existence bit
    pub hidden: bool,
    pub(crate) parent: Option<NodeId>,
    pub(crate) kind: NodeKind,
}

impl Node {
    /// Create an empty directory node
    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: 0,
            modified: None,
            hidden: false,
            parent: None,
            kind: NodeKind::Directory {
                children: Vec::new(),
            },
        }
    }

    /// Create a file node
    pub fn file(name: impl Into<String>, size: u64, origin: DataOrigin) -> Self {
        Self {
            name: name.into(),
            size,
            modified: None,
            hidden: false,
            parent: None,
            kind: NodeKind::File { origin },
        }
    }

    pub fn with_modified(mut self, modified: Option<DateTime<Utc>>) -> Self {
        self.modified = modified;
        self
    }

    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    /// Check if this is a directory
    pub fn is_directory(&self) -> bool {
        matches!(self.kind, NodeKind::Directory { .. })
    }

    /// Check if this is a file
    pub fn is_file(&self) -> bool {
        matches!(self.kind, NodeKind::File { .. })
    }

    /// Parent directory, `None` only for the root
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Data origin of a file node
    pub fn origin(&self) -> Option<&DataOrigin> {
        match &self.kind {
            NodeKind::File { origin } => Some(origin),
            NodeKind::Directory { .. } => None,
        }
    }

    /// Children of a directory node, empty for files
    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Directory { children } => children,
            NodeKind::File { .. } => &[],
        }
    }

    /// Get a display-friendly size string
    pub fn size_string(&self) -> String {
        if self.is_directory() {
            return String::new();
        }

        if self.size < 1024 {
            format!("{} B", self.size)
        } else if self.size < 1024 * 1024 {
            format!("{:.1} KB", self.size as f64 / 1024.0)
        } else if self.size < 1024 * 1024 * 1024 {
            format!("{:.1} MB", self.size as f64 / (1024.0 * 1024.0))
        } else {
            format!("{:.2} GB", self.size as f64 / (1024.0 * 1024.0 * 1024.0))
        }
    }
}
