//! Tree edits: adding files and folders, importing host directories, removal
//!
//! Every operation that cannot apply (wrong target, name clash, unreadable
//! host file) leaves the session untouched and logs a warning.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use super::Session;
use crate::tree::{DataOrigin, Node, NodeId};

impl Session {
    /// Create an empty directory `name` inside `target`
    pub fn add_folder(&mut self, name: &str, target: NodeId) -> Option<NodeId> {
        if !self.tree.is_directory(target) {
            log::warn!("Cannot add folder '{}': target is not a directory", name);
            return None;
        }
        if name.is_empty() || name.contains('/') {
            log::warn!("Invalid folder name '{}'", name);
            return None;
        }
        if self.tree.find_child(target, name).is_some() {
            log::warn!("Cannot add folder '{}': name already in use", name);
            return None;
        }

        let node = Node::directory(name).with_modified(Some(Utc::now()));
        let id = self.tree.insert(target, node)?;
        self.modified = true;
        log::debug!("Added folder {:?}", self.tree.path_of(id));
        Some(id)
    }

    /// Stage a copy of the host file `host_path` inside `target`
    ///
    /// A file of the same name is replaced in place; a directory of the same
    /// name blocks the add.
    pub fn add_file(&mut self, host_path: &Path, target: NodeId) -> Option<NodeId> {
        if !self.tree.is_directory(target) {
            log::warn!(
                "Cannot add {}: target is not a directory",
                host_path.display()
            );
            return None;
        }

        let Some(name) = host_path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            log::warn!("Cannot add {}: no file name", host_path.display());
            return None;
        };

        let data = match fs::read(host_path) {
            Ok(data) => data,
            Err(e) => {
                log::warn!("Cannot read {}: {}", host_path.display(), e);
                return None;
            }
        };
        let modified = fs::metadata(host_path)
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from);

        let node = Node::file(&name, data.len() as u64, DataOrigin::Staged(data))
            .with_modified(modified);

        let id = match self.tree.find_child(target, &name) {
            Some(existing) if self.tree.is_directory(existing) => {
                log::warn!("Cannot add file '{}': a folder has that name", name);
                return None;
            }
            Some(existing) => {
                log::info!("Replacing existing file '{}'", name);
                self.tree.replace(existing, node)?
            }
            None => self.tree.insert(target, node)?,
        };

        self.modified = true;
        log::debug!("Added file {:?}", self.tree.path_of(id));
        Some(id)
    }

    /// Mirror the host directory `host_dir` as a new folder inside `target`
    ///
    /// Nothing is imported when a node with the folder's name already exists.
    pub fn import_directory(&mut self, host_dir: &Path, target: NodeId) -> Option<NodeId> {
        if !self.tree.is_directory(target) {
            log::warn!(
                "Cannot import {}: target is not a directory",
                host_dir.display()
            );
            return None;
        }
        if !host_dir.is_dir() {
            log::warn!("Cannot import {}: not a directory", host_dir.display());
            return None;
        }

        let name = match host_dir.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            // "." and ".." have no file name of their own
            None => match host_dir.canonicalize() {
                Ok(full) => full
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                Err(e) => {
                    log::warn!("Cannot resolve {}: {}", host_dir.display(), e);
                    return None;
                }
            },
        };

        let folder = self.add_folder(&name, target)?;
        self.import_children(host_dir, folder);
        Some(folder)
    }

    fn import_children(&mut self, host_dir: &Path, folder: NodeId) {
        let entries = match fs::read_dir(host_dir) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("Cannot list {}: {}", host_dir.display(), e);
                return;
            }
        };

        let mut children: Vec<(PathBuf, bool)> = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            if file_type.is_symlink() && path.is_dir() {
                log::warn!("Skipping directory link {}", path.display());
                continue;
            }
            children.push((path, file_type.is_dir()));
        }
        children.sort();

        for (path, is_dir) in children {
            if is_dir {
                self.import_directory(&path, folder);
            } else {
                self.add_file(&path, folder);
            }
        }
    }

    /// Remove a node and everything below it; the root cannot be removed
    pub fn remove_node(&mut self, id: NodeId) -> bool {
        if id == self.tree.root() {
            log::warn!("Refusing to remove the root directory");
            return false;
        }
        if !self.tree.remove(id) {
            log::warn!("Cannot remove node {:?}: not in the tree", id);
            return false;
        }

        self.modified = true;
        true
    }
}
