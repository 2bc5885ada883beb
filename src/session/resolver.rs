//! Produces the bytes of any file node, whatever its origin

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::disc::browse::{open_filesystem, Filesystem, FilesystemError, SECTOR_SIZE};
use crate::tree::{DataOrigin, NodeId, Tree};

/// Errors raised while reading node content
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("No node with id {0:?}")]
    NoSuchNode(NodeId),

    #[error("Not a file: {0}")]
    NotAFile(String),

    #[error("Archival node without a source image")]
    NoSourceImage,

    #[error("Cannot read source image {}: {}", .path.display(), .source)]
    SourceImage {
        path: PathBuf,
        #[source]
        source: FilesystemError,
    },

    #[error("Cannot read {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Reads node content from memory, the source ISO image or a BIN file
///
/// A resolver made with [`DataResolver::new`] reopens the source image for
/// every archival read. One made with [`DataResolver::bulk`] keeps the image
/// open after the first archival read until it is dropped.
pub struct DataResolver<'a> {
    tree: &'a Tree,
    source_image: Option<&'a Path>,
    keep_open: bool,
    image: Option<Box<dyn Filesystem>>,
}

impl<'a> DataResolver<'a> {
    pub fn new(tree: &'a Tree, source_image: Option<&'a Path>) -> Self {
        Self {
            tree,
            source_image,
            keep_open: false,
            image: None,
        }
    }

    /// Resolver holding one image handle for many reads
    pub fn bulk(tree: &'a Tree, source_image: Option<&'a Path>) -> Self {
        Self {
            keep_open: true,
            ..Self::new(tree, source_image)
        }
    }

    /// Content of a node, or empty when it is missing, a directory or unreadable
    pub fn bytes(&mut self, id: NodeId) -> Vec<u8> {
        if !self.tree.get(id).is_some_and(|node| node.is_file()) {
            return Vec::new();
        }

        match self.try_read(id) {
            Ok(data) => data,
            Err(e) => {
                log::warn!("Failed to read content of {:?}: {}", self.tree.path_of(id), e);
                Vec::new()
            }
        }
    }

    /// Content of a file node
    pub fn try_read(&mut self, id: NodeId) -> Result<Vec<u8>, ResolveError> {
        let tree = self.tree;
        let node = tree.get(id).ok_or(ResolveError::NoSuchNode(id))?;
        let origin = node
            .origin()
            .ok_or_else(|| ResolveError::NotAFile(node.name.clone()))?;

        match origin {
            DataOrigin::Staged(data) => Ok(data.clone()),
            DataOrigin::Track {
                bin_path, offset, ..
            } => read_track(bin_path, *offset, node.size),
            DataOrigin::Archival { lba } => self.read_archival(*lba, node.size),
        }
    }

    fn read_archival(&mut self, lba: u64, size: u64) -> Result<Vec<u8>, ResolveError> {
        let source = self.source_image.ok_or(ResolveError::NoSourceImage)?;
        let image_error = |source_err| ResolveError::SourceImage {
            path: source.to_path_buf(),
            source: source_err,
        };
        let count = size.div_ceil(SECTOR_SIZE);

        let mut data = if self.keep_open {
            if self.image.is_none() {
                log::debug!("Opening {} for bulk reads", source.display());
                self.image = Some(open_filesystem(source).map_err(image_error)?);
            }
            match self.image.as_mut() {
                Some(image) => image.read_blocks(lba, count).map_err(image_error)?,
                None => return Err(ResolveError::NoSourceImage),
            }
        } else {
            open_filesystem(source)
                .and_then(|mut image| image.read_blocks(lba, count))
                .map_err(image_error)?
        };

        data.truncate(size as usize);
        Ok(data)
    }
}

/// Read exactly `size` bytes at `offset` of a BIN file
fn read_track(bin_path: &Path, offset: u64, size: u64) -> Result<Vec<u8>, ResolveError> {
    let read = || -> io::Result<Vec<u8>> {
        let mut file = File::open(bin_path)?;
        file.seek(SeekFrom::Start(offset))?;
        let mut data = vec![0u8; size as usize];
        file.read_exact(&mut data)?;
        Ok(data)
    };

    read().map_err(|source| ResolveError::Io {
        path: bin_path.to_path_buf(),
        source,
    })
}
