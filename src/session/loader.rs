//! Loading an existing image or CUE sheet into a session

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::metadata::VolumeMetadata;
use super::Session;
use crate::disc::bincue::{read_cue_sheet, BinCueError, CueLayout};
use crate::disc::browse::{open_filesystem, Filesystem, FilesystemError};
use crate::disc::formats::ImageFormat;
use crate::tree::{DataOrigin, Node, NodeId, Tree};

/// Volume id given to a CUE sheet without a disc TITLE
pub const DEFAULT_CUE_VOLUME_ID: &str = "CUE_SHEET";

/// Errors raised while loading an image
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read image {}: {}", .path.display(), .source)]
    Image {
        path: PathBuf,
        #[source]
        source: FilesystemError,
    },

    #[error("Failed to read CUE sheet {}: {}", .path.display(), .source)]
    CueSheet {
        path: PathBuf,
        #[source]
        source: BinCueError,
    },
}

impl Session {
    /// Replace the session with the contents of an image or CUE sheet
    ///
    /// On failure the session is reset to a new empty image.
    pub fn load(&mut self, path: &Path) -> Result<(), LoadError> {
        let format = ImageFormat::from_path(path);
        log::info!("Loading {} as {}", path.display(), format.display_name());

        let loaded = match format {
            ImageFormat::Iso => load_iso(path).map_err(|source| LoadError::Image {
                path: path.to_path_buf(),
                source,
            }),
            ImageFormat::CueSheet => load_cue(path).map_err(|source| LoadError::CueSheet {
                path: path.to_path_buf(),
                source,
            }),
        };

        match loaded {
            Ok((tree, metadata)) => {
                log::info!(
                    "Loaded '{}' with {} nodes",
                    metadata.volume_id,
                    tree.len() - 1
                );
                self.tree = tree;
                self.metadata = metadata;
                self.modified = false;
                self.current_path = Some(path.to_path_buf());
                self.source_image = match format {
                    ImageFormat::Iso => Some(path.to_path_buf()),
                    ImageFormat::CueSheet => None,
                };
                Ok(())
            }
            Err(e) => {
                log::error!("{}", e);
                self.init_new();
                Err(e)
            }
        }
    }
}

fn load_iso(path: &Path) -> Result<(Tree, VolumeMetadata), FilesystemError> {
    let mut fs = open_filesystem(path)?;
    log::debug!("Reading names from {}", fs.name_source().display_name());

    let metadata = VolumeMetadata::new(fs.volume_id(), fs.system_id());
    let mut tree = Tree::new();
    let root = tree.root();
    let mut visited = HashSet::new();
    populate_directory(fs.as_mut(), &mut tree, "/", root, &mut visited)?;

    Ok((tree, metadata))
}

/// Mirror one source directory into `dir`, recursing into subdirectories
fn populate_directory(
    fs: &mut dyn Filesystem,
    tree: &mut Tree,
    path: &str,
    dir: NodeId,
    visited: &mut HashSet<u64>,
) -> Result<(), FilesystemError> {
    for entry in fs.list_directory(path)? {
        if tree.find_child(dir, &entry.name).is_some() {
            log::warn!("Skipping duplicate entry {}", entry.path);
            continue;
        }

        let node = if entry.is_directory() {
            Node::directory(&entry.name)
        } else {
            Node::file(
                &entry.name,
                entry.size,
                DataOrigin::Archival {
                    lba: entry.location,
                },
            )
        }
        .with_modified(entry.modified)
        .with_hidden(entry.hidden);

        let Some(id) = tree.insert(dir, node) else {
            continue;
        };

        if entry.is_directory() {
            // A directory extent seen twice would loop forever
            if !visited.insert(entry.location) {
                log::warn!("Directory {} loops back to block {}", entry.path, entry.location);
                continue;
            }
            populate_directory(fs, tree, &entry.path, id, visited)?;
        }
    }

    Ok(())
}

fn load_cue(path: &Path) -> Result<(Tree, VolumeMetadata), BinCueError> {
    let CueLayout { title, tracks } = read_cue_sheet(path)?;

    let volume_id = title.as_deref().unwrap_or(DEFAULT_CUE_VOLUME_ID);
    let metadata = VolumeMetadata::new(volume_id, "");

    let mut tree = Tree::new();
    let root = tree.root();
    for track in tracks {
        let name = track.display_name();
        if tree.find_child(root, &name).is_some() {
            log::warn!("Skipping repeated track number {}", track.number);
            continue;
        }

        let modified = std::fs::metadata(&track.bin_path)
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from);

        log::debug!(
            "{} ({}): {} bytes at offset {} of {}",
            name,
            if track.is_data() { "data" } else { "audio" },
            track.size,
            track.offset,
            track.bin_path.display()
        );

        let node = Node::file(
            name,
            track.size,
            DataOrigin::Track {
                bin_path: track.bin_path,
                offset: track.offset,
                number: track.number,
            },
        )
        .with_modified(modified);
        tree.insert(root, node);
    }

    Ok((tree, metadata))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use crate::disc::browse::test_image::{build_image, TestImageOptions, TestNode};
    use std::fs;
    use tempfile::TempDir;

    fn sample_tree() -> Vec<TestNode> {
        vec![
            TestNode::File("readme.txt", b"hello world".to_vec()),
            TestNode::HiddenFile("secret.bin", vec![1, 2, 3]),
            TestNode::Dir(
                "Docs",
                vec![
                    TestNode::File("guide.md", vec![7u8; 3000]),
                    TestNode::Dir("empty", vec![]),
                ],
            ),
        ]
    }

    fn write_image(dir: &TempDir, options: &TestImageOptions) -> PathBuf {
        let path = dir.path().join("source.iso");
        fs::write(&path, build_image(&sample_tree(), options)).unwrap();
        path
    }

    fn new_session() -> Session {
        Session::with_config(EditorConfig::default())
    }

    #[test]
    fn test_load_rock_ridge_image() {
        let dir = TempDir::new().unwrap();
        let path = write_image(
            &dir,
            &TestImageOptions {
                rock_ridge: true,
                ..TestImageOptions::default()
            },
        );

        let mut session = new_session();
        session.load(&path).unwrap();

        assert_eq!(session.metadata().volume_id, "TEST_VOLUME");
        assert_eq!(session.metadata().system_id, "LINUX");
        assert!(!session.is_modified());
        assert_eq!(session.current_path(), Some(path.as_path()));
        assert_eq!(session.source_image(), Some(path.as_path()));

        let tree = session.tree();
        let names: Vec<&str> = tree
            .children(tree.root())
            .iter()
            .map(|id| tree.get(*id).unwrap().name.as_str())
            .collect();
        assert_eq!(names, vec!["readme.txt", "secret.bin", "Docs"]);

        let readme = tree.resolve_path("/readme.txt").unwrap();
        let readme_node = tree.get(readme).unwrap();
        assert_eq!(readme_node.size, 11);
        assert!(!readme_node.hidden);
        assert!(matches!(readme_node.origin(), Some(DataOrigin::Archival { .. })));
        assert_eq!(
            readme_node.modified.map(|d| d.to_rfc3339()).as_deref(),
            Some("2024-05-06T12:30:00+00:00")
        );

        let secret = tree.resolve_path("/secret.bin").unwrap();
        assert!(tree.get(secret).unwrap().hidden);

        let guide = tree.resolve_path("/Docs/guide.md").unwrap();
        assert_eq!(tree.get(guide).unwrap().size, 3000);
        assert!(tree.is_directory(tree.resolve_path("/Docs/empty").unwrap()));

        assert_eq!(session.node_bytes(readme), b"hello world");
        assert_eq!(session.node_bytes(guide), vec![7u8; 3000]);
    }

    #[test]
    fn test_load_plain_image_uses_primary_names() {
        let dir = TempDir::new().unwrap();
        let path = write_image(&dir, &TestImageOptions::default());

        let mut session = new_session();
        session.load(&path).unwrap();

        let tree = session.tree();
        let readme = tree.find_child(tree.root(), "README.TXT").unwrap();
        assert_eq!(tree.get(readme).unwrap().name, "README.TXT");
        assert!(tree.resolve_path("/DOCS/GUIDE.MD").is_some());
    }

    #[test]
    fn test_failed_load_resets_session() {
        let dir = TempDir::new().unwrap();
        let bogus = dir.path().join("bogus.iso");
        fs::write(&bogus, vec![0u8; 40 * 2048]).unwrap();

        let mut session = new_session();
        session.add_folder("DOCS", session.root());
        session.set_volume_id("CHANGED");

        let result = session.load(&bogus);
        assert!(matches!(result, Err(LoadError::Image { .. })));
        assert!(session.tree().children(session.root()).is_empty());
        assert_eq!(session.metadata().volume_id, "NEW_ISO");
        assert!(!session.is_modified());
        assert!(session.current_path().is_none());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let mut session = new_session();

        assert!(session.load(&dir.path().join("absent.iso")).is_err());
        assert!(session.current_path().is_none());
    }

    #[test]
    fn test_case_twin_directory_keeps_its_own_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("twins.iso");
        let image = build_image(
            &[
                TestNode::Dir("Dir", vec![TestNode::File("first.txt", b"one".to_vec())]),
                TestNode::Dir("dir", vec![TestNode::File("second.txt", b"two".to_vec())]),
            ],
            &TestImageOptions {
                rock_ridge: true,
                ..TestImageOptions::default()
            },
        );
        fs::write(&path, image).unwrap();

        let mut session = new_session();
        session.load(&path).unwrap();

        let tree = session.tree();
        let kept = tree.resolve_path("/Dir").unwrap();
        assert_eq!(tree.children(tree.root()).len(), 1);
        assert_eq!(tree.get(kept).unwrap().name, "Dir");

        let names: Vec<&str> = tree
            .children(kept)
            .iter()
            .map(|id| tree.get(*id).unwrap().name.as_str())
            .collect();
        assert_eq!(names, vec!["first.txt"]);

        let first = tree.resolve_path("/Dir/first.txt").unwrap();
        assert_eq!(session.node_bytes(first), b"one");
    }

    #[test]
    fn test_load_cue_sheet() {
        let dir = TempDir::new().unwrap();
        let bin_len = 2352 * 200 + 48;
        let bin: Vec<u8> = (0..bin_len).map(|i| (i % 251) as u8).collect();
        fs::write(dir.path().join("game.bin"), &bin).unwrap();

        let cue_path = dir.path().join("game.CUE");
        fs::write(
            &cue_path,
            "TITLE \"GAME_DISC\"\n\
             FILE \"game.bin\" BINARY\n\
             \x20 TRACK 01 MODE1/2352\n\
             \x20   INDEX 01 00:00:00\n\
             \x20 TRACK 02 AUDIO\n\
             \x20   INDEX 00 00:00:50\n\
             \x20   INDEX 01 00:01:00\n",
        )
        .unwrap();

        let mut session = new_session();
        session.load(&cue_path).unwrap();

        assert_eq!(session.metadata().volume_id, "GAME_DISC");
        assert_eq!(session.current_path(), Some(cue_path.as_path()));
        assert!(session.source_image().is_none());

        let tree = session.tree();
        let tracks = tree.children(tree.root());
        assert_eq!(tracks.len(), 2);

        let first = tree.get(tracks[0]).unwrap();
        let second = tree.get(tracks[1]).unwrap();
        assert_eq!(first.name, "Track 01");
        assert_eq!(second.name, "Track 02");
        assert_eq!(first.size, 75 * 2352);
        assert_eq!(second.size, bin_len as u64 - 75 * 2352);
        assert_eq!(first.size + second.size, bin_len as u64);

        assert_eq!(session.node_bytes(tracks[1]), &bin[75 * 2352..]);
    }

    #[test]
    fn test_cue_sheet_without_title() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("disc.bin"), vec![0u8; 2352]).unwrap();
        let cue_path = dir.path().join("disc.cue");
        fs::write(
            &cue_path,
            "FILE \"disc.bin\" BINARY\n  TRACK 01 MODE1/2352\n    INDEX 01 00:00:00\n",
        )
        .unwrap();

        let mut session = new_session();
        session.load(&cue_path).unwrap();

        assert_eq!(session.metadata().volume_id, DEFAULT_CUE_VOLUME_ID);
    }

    #[test]
    fn test_cue_sheet_without_file_entry() {
        let dir = TempDir::new().unwrap();
        let cue_path = dir.path().join("broken.cue");
        fs::write(&cue_path, "TRACK 01 AUDIO\n  INDEX 01 00:00:00\n").unwrap();

        let mut session = new_session();
        let result = session.load(&cue_path);

        assert!(matches!(
            result,
            Err(LoadError::CueSheet {
                source: BinCueError::NoFileEntry,
                ..
            })
        ));
        assert!(session.tree().children(session.root()).is_empty());
    }
}
