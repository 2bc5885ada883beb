//! Editing session
//!
//! A [`Session`] owns the directory tree of one image together with its
//! volume metadata and the paths it was loaded from and saved to. Loading,
//! tree mutations and saving are implemented in the submodules as further
//! `impl Session` blocks.

mod loader;
mod metadata;
mod mutation;
mod resolver;
mod writer;

pub use loader::{LoadError, DEFAULT_CUE_VOLUME_ID};
pub use metadata::{BootEmulation, VolumeMetadata, MAX_ID_LENGTH};
pub use resolver::{DataResolver, ResolveError};
pub use writer::{build_arguments, SaveError, SaveOptions};

use std::path::{Path, PathBuf};

use crate::config::{self, EditorConfig};
use crate::tree::{NodeId, Tree};
use metadata::clamp_identifier;

/// One image being edited
#[derive(Debug)]
pub struct Session {
    config: EditorConfig,
    tree: Tree,
    metadata: VolumeMetadata,
    modified: bool,
    /// Image or CUE sheet the session is associated with
    current_path: Option<PathBuf>,
    /// ISO image that archival nodes point into
    source_image: Option<PathBuf>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Start an empty image using the global configuration
    pub fn new() -> Self {
        Self::with_config(config::get_config().clone())
    }

    /// Start an empty image using an explicit configuration
    pub fn with_config(config: EditorConfig) -> Self {
        let metadata = VolumeMetadata::new(&config.new_image.volume_id, &config.new_image.system_id);
        Self {
            config,
            tree: Tree::new(),
            metadata,
            modified: false,
            current_path: None,
            source_image: None,
        }
    }

    /// Discard everything and start over with an empty image
    pub fn init_new(&mut self) {
        log::debug!("Initializing new image");
        self.tree = Tree::new();
        self.metadata = VolumeMetadata::new(
            &self.config.new_image.volume_id,
            &self.config.new_image.system_id,
        );
        self.modified = false;
        self.current_path = None;
        self.source_image = None;
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Root directory of the tree
    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    pub fn metadata(&self) -> &VolumeMetadata {
        &self.metadata
    }

    /// True when the tree or metadata changed since the last load or save
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.current_path.as_deref()
    }

    pub fn source_image(&self) -> Option<&Path> {
        self.source_image.as_deref()
    }

    /// Resolver that reopens the source image for every archival read
    pub fn resolver(&self) -> DataResolver<'_> {
        DataResolver::new(&self.tree, self.source_image.as_deref())
    }

    /// Read the content of one node, empty when it cannot be produced
    pub fn node_bytes(&self, id: NodeId) -> Vec<u8> {
        self.resolver().bytes(id)
    }

    pub fn set_volume_id(&mut self, volume_id: &str) {
        let volume_id = clamp_identifier("volume id", volume_id);
        if self.metadata.volume_id != volume_id {
            self.metadata.volume_id = volume_id;
            self.modified = true;
        }
    }

    pub fn set_system_id(&mut self, system_id: &str) {
        let system_id = clamp_identifier("system id", system_id);
        if self.metadata.system_id != system_id {
            self.metadata.system_id = system_id;
            self.modified = true;
        }
    }

    pub fn set_boot_image(&mut self, boot_image: Option<PathBuf>) {
        if self.metadata.boot_image != boot_image {
            self.metadata.boot_image = boot_image;
            self.modified = true;
        }
    }

    pub fn set_efi_boot_image(&mut self, efi_boot_image: Option<PathBuf>) {
        if self.metadata.efi_boot_image != efi_boot_image {
            self.metadata.efi_boot_image = efi_boot_image;
            self.modified = true;
        }
    }

    pub fn set_boot_emulation(&mut self, boot_emulation: BootEmulation) {
        if self.metadata.boot_emulation != boot_emulation {
            self.metadata.boot_emulation = boot_emulation;
            self.modified = true;
        }
    }
}
