//! Saving the tree as a new image through an external ISO builder
//!
//! The tree is written out to a temporary staging directory, boot images are
//! copied next to it and a genisoimage-compatible program turns the staging
//! directory into the output image.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::SystemTime;

use tempfile::TempDir;
use thiserror::Error;

use super::loader::LoadError;
use super::metadata::VolumeMetadata;
use super::resolver::{DataResolver, ResolveError};
use super::Session;
use crate::config::WriterConfig;

/// Output options not stored in the volume metadata
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveOptions {
    /// Add a UDF bridge
    pub use_udf: bool,
    /// Make the image bootable from USB mass storage as well
    pub make_hybrid: bool,
}

/// Errors raised while saving
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("Failed to create staging directory: {0}")]
    Staging(#[source] io::Error),

    #[error("Failed to write {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot stage file content: {0}")]
    Content(#[from] ResolveError),

    #[error("Name '{0}' cannot be written to the staging directory")]
    UnsafeName(String),

    #[error("Failed to copy boot image {}: {}", .path.display(), .source)]
    BootImage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to start {program}: {source}")]
    ToolLaunch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} failed ({}): {stderr}", describe_exit(.code))]
    ToolFailed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Image saved but reloading it failed: {0}")]
    Reload(#[from] LoadError),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

impl Session {
    /// Write the tree and metadata to a new image at `output`
    ///
    /// Saving over the source image reloads the session from the new file
    /// so archival nodes point at the blocks they now occupy.
    pub fn save(&mut self, output: &Path, options: SaveOptions) -> Result<(), SaveError> {
        log::info!("Saving '{}' to {}", self.metadata.volume_id, output.display());

        let staging = create_staging(&self.config.writer)?;
        let hidden = self.materialize(staging.path())?;

        let boot_name = self
            .metadata
            .boot_image
            .as_deref()
            .map(|path| stage_boot_image(path, staging.path()))
            .transpose()?;
        let efi_name = self
            .metadata
            .efi_boot_image
            .as_deref()
            .map(|path| stage_boot_image(path, staging.path()))
            .transpose()?;

        let args = build_arguments(
            output,
            &self.metadata,
            options,
            boot_name.as_deref(),
            efi_name.as_deref(),
            &hidden,
            staging.path(),
        );
        run_builder(&self.config.writer, &args)?;

        let overwrote_source = self
            .source_image
            .as_deref()
            .is_some_and(|source| same_file(source, output));

        self.modified = false;
        self.current_path = Some(output.to_path_buf());
        log::info!("Saved {}", output.display());

        if overwrote_source {
            log::info!("Output replaced the source image, reloading");
            self.load(output)?;
        }

        Ok(())
    }

    /// Write every node below the root into `staging`
    ///
    /// Returns the staged paths of hidden nodes.
    fn materialize(&self, staging: &Path) -> Result<Vec<PathBuf>, SaveError> {
        let mut resolver = DataResolver::bulk(&self.tree, self.source_image.as_deref());
        let mut hidden = Vec::new();

        for id in self.tree.descendants(self.tree.root()) {
            let Some(node) = self.tree.get(id) else {
                continue;
            };
            if is_unsafe_name(&node.name) {
                return Err(SaveError::UnsafeName(node.name.clone()));
            }

            let Some(path) = self.tree.path_of(id) else {
                continue;
            };
            let host_path = staging.join(path.trim_start_matches('/'));
            let io_error = |source| SaveError::Io {
                path: host_path.clone(),
                source,
            };

            if node.is_directory() {
                fs::create_dir_all(&host_path).map_err(io_error)?;
            } else {
                let data = resolver.try_read(id)?;
                fs::write(&host_path, data).map_err(io_error)?;
            }

            if let Some(modified) = node.modified {
                set_modified(&host_path, SystemTime::from(modified));
            }
            if node.hidden {
                hidden.push(host_path);
            }
        }

        Ok(hidden)
    }
}

/// Names that would escape or collapse a path component on this platform
fn is_unsafe_name(name: &str) -> bool {
    name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || (cfg!(windows) && name.contains('\\'))
}

/// Arguments for the image builder, excluding configured leading arguments
///
/// `boot_name` and `efi_name` are file names inside the staging directory.
/// `hidden` holds staged paths that get the ISO 9660 existence bit.
pub fn build_arguments(
    output: &Path,
    metadata: &VolumeMetadata,
    options: SaveOptions,
    boot_name: Option<&str>,
    efi_name: Option<&str>,
    hidden: &[PathBuf],
    staging: &Path,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-o".into(),
        output.into(),
        "-R".into(),
        "-J".into(),
        "-V".into(),
        metadata.volume_id.as_str().into(),
        "-sysid".into(),
        metadata.system_id.as_str().into(),
    ];

    if options.use_udf {
        args.push("-udf".into());
    }

    if let Some(name) = boot_name {
        args.push("-b".into());
        args.push(name.into());
        if let Some(flag) = metadata.boot_emulation.writer_flag() {
            args.push(flag.into());
        }
    }

    if let Some(name) = efi_name {
        args.push("-eltorito-boot".into());
        args.push(name.into());
        args.push("-no-emul-boot".into());
    }

    if options.make_hybrid {
        if efi_name.is_some() {
            args.push("-isohybrid-gpt-basdat".into());
        } else {
            args.push("-isohybrid-mbr".into());
        }
    }

    for path in hidden {
        args.push("-hidden".into());
        args.push(path.into());
    }

    args.push(staging.into());
    args
}

fn create_staging(writer: &WriterConfig) -> Result<TempDir, SaveError> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("iso-editor-");

    let staging = match &writer.staging_root {
        Some(root) => builder.tempdir_in(root),
        None => builder.tempdir(),
    }
    .map_err(SaveError::Staging)?;

    log::debug!("Staging in {}", staging.path().display());
    Ok(staging)
}

/// Copy a boot image into the staging root, returning its file name there
fn stage_boot_image(path: &Path, staging: &Path) -> Result<String, SaveError> {
    let boot_error = |source| SaveError::BootImage {
        path: path.to_path_buf(),
        source,
    };

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| boot_error(io::Error::new(io::ErrorKind::InvalidInput, "no file name")))?;

    let target = staging.join(&name);
    if target.exists() {
        log::warn!("Boot image {} replaces a file of the same name", name);
    }
    fs::copy(path, &target).map_err(boot_error)?;

    Ok(name)
}

fn run_builder(writer: &WriterConfig, args: &[OsString]) -> Result<(), SaveError> {
    log::debug!("Running {} {:?} {:?}", writer.program, writer.leading_args, args);

    let output = Command::new(&writer.program)
        .args(&writer.leading_args)
        .args(args)
        .output()
        .map_err(|source| SaveError::ToolLaunch {
            program: writer.program.clone(),
            source,
        })?;

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if !output.status.success() {
        log::error!("{} failed: {}", writer.program, stderr);
        return Err(SaveError::ToolFailed {
            program: writer.program.clone(),
            code: output.status.code(),
            stderr,
        });
    }

    if !stderr.is_empty() {
        log::debug!("{}: {}", writer.program, stderr);
    }
    Ok(())
}

fn set_modified(path: &Path, modified: SystemTime) {
    let result = fs::File::options()
        .write(true)
        .open(path)
        .and_then(|file| file.set_modified(modified));

    // Directories cannot be opened for writing on every platform
    if let Err(e) = result {
        log::debug!("Could not set time on {}: {}", path.display(), e);
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
