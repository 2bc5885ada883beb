//! ISO Editor Library
//!
//! Loads ISO 9660 images and BIN/CUE track sets into an editable directory
//! tree and writes the result back out as a new image.

pub mod config;
pub mod disc;
pub mod names;
pub mod session;
pub mod tree;

pub use session::{
    BootEmulation, DataResolver, LoadError, ResolveError, SaveError, SaveOptions, Session,
    VolumeMetadata,
};
pub use tree::{DataOrigin, Node, NodeId, Tree};
