//! ISO Editor
//!
//! Command-line front end for inspecting, editing and rebuilding disc images.

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use iso_editor::config::{self, EditorConfig};
use iso_editor::disc::ImageFormat;
use iso_editor::names::{non_compliant_names, suggest_level1_name};
use iso_editor::{BootEmulation, NodeId, SaveOptions, Session};

type CliResult = Result<(), Box<dyn Error>>;

/// Inspect, edit and rebuild ISO 9660 and BIN/CUE images
#[derive(Parser)]
#[command(name = "iso-editor", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (overrides config.json lookup)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print volume metadata and the directory tree
    Info {
        /// ISO image or CUE sheet
        image: PathBuf,
    },
    /// Build a new image, optionally starting from an existing one
    ///
    /// Edits are applied in this order: removals, new folders, added files,
    /// imported directories.
    Build {
        /// Output image path
        output: PathBuf,
        /// Image or CUE sheet to start from (empty image when omitted)
        #[arg(long)]
        from: Option<PathBuf>,
        /// Host file to add, as HOST or HOST=/IMAGE/DIR
        #[arg(long = "add-file", value_name = "SPEC")]
        add_files: Vec<String>,
        /// Folder to create, as an image path like /DOCS/NEW
        #[arg(long = "add-folder", value_name = "PATH")]
        add_folders: Vec<String>,
        /// Host directory to import, as HOST or HOST=/IMAGE/DIR
        #[arg(long = "import", value_name = "SPEC")]
        imports: Vec<String>,
        /// Image path to remove
        #[arg(long = "remove", value_name = "PATH")]
        removals: Vec<String>,
        #[arg(long)]
        volume_id: Option<String>,
        #[arg(long)]
        system_id: Option<String>,
        /// BIOS boot image
        #[arg(long)]
        boot: Option<PathBuf>,
        /// EFI boot image
        #[arg(long)]
        efi_boot: Option<PathBuf>,
        /// BIOS boot emulation: noemul, floppy or hdemul
        #[arg(long)]
        boot_emulation: Option<BootEmulation>,
        /// Add a UDF bridge
        #[arg(long)]
        udf: bool,
        /// Make the image bootable from USB as well
        #[arg(long)]
        hybrid: bool,
    },
    /// Write the content of one file in the image to the host
    Extract {
        image: PathBuf,
        /// Path inside the image
        path: String,
        /// Destination file on the host
        dest: PathBuf,
    },
    /// List names that are not valid ISO 9660 level 1 names
    CheckNames { image: PathBuf },
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult {
    let config = match &cli.config {
        Some(path) => EditorConfig::load_from_path(path)
            .map_err(|e| format!("cannot load config {}: {}", path.display(), e))?,
        None => config::get_config().clone(),
    };
    let mut session = Session::with_config(config);

    match cli.command {
        Commands::Info { image } => {
            session.load(&image)?;
            print_info(&session, &image);
        }
        Commands::Build {
            output,
            from,
            add_files,
            add_folders,
            imports,
            removals,
            volume_id,
            system_id,
            boot,
            efi_boot,
            boot_emulation,
            udf,
            hybrid,
        } => {
            if let Some(from) = from {
                session.load(&from)?;
            }

            for path in &removals {
                let id = lookup(&session, path)?;
                if !session.remove_node(id) {
                    return Err(format!("cannot remove {}", path).into());
                }
            }
            for path in &add_folders {
                let (parent, name) = split_image_path(path)?;
                let target = lookup(&session, parent)?;
                session
                    .add_folder(name, target)
                    .ok_or_else(|| format!("cannot create folder {}", path))?;
            }
            for spec in &add_files {
                let (host, target) = split_spec(spec);
                let target = lookup(&session, target)?;
                session
                    .add_file(host, target)
                    .ok_or_else(|| format!("cannot add file {}", host.display()))?;
            }
            for spec in &imports {
                let (host, target) = split_spec(spec);
                let target = lookup(&session, target)?;
                session
                    .import_directory(host, target)
                    .ok_or_else(|| format!("cannot import {}", host.display()))?;
            }

            if let Some(volume_id) = volume_id {
                session.set_volume_id(&volume_id);
            }
            if let Some(system_id) = system_id {
                session.set_system_id(&system_id);
            }
            if boot.is_some() {
                session.set_boot_image(boot);
            }
            if efi_boot.is_some() {
                session.set_efi_boot_image(efi_boot);
            }
            if let Some(mode) = boot_emulation {
                session.set_boot_emulation(mode);
            }

            let options = SaveOptions {
                use_udf: udf,
                make_hybrid: hybrid,
            };
            session.save(&output, options)?;
            println!("Wrote {}", output.display());
        }
        Commands::Extract { image, path, dest } => {
            session.load(&image)?;
            let id = lookup(&session, &path)?;
            if session.tree().is_directory(id) {
                return Err(format!("{} is a directory", path).into());
            }
            let data = session.resolver().try_read(id)?;
            fs::write(&dest, &data)?;
            println!("Extracted {} bytes to {}", data.len(), dest.display());
        }
        Commands::CheckNames { image } => {
            session.load(&image)?;
            let names = non_compliant_names(session.tree());
            if names.is_empty() {
                println!("All names are ISO 9660 level 1 compliant");
            }
            for name in names {
                println!("{}  ->  {}", name, suggest_level1_name(&name));
            }
        }
    }

    Ok(())
}

fn print_info(session: &Session, image: &Path) {
    let metadata = session.metadata();
    let tree = session.tree();

    println!("Image:     {}", image.display());
    println!("Format:    {}", ImageFormat::from_path(image).display_name());
    println!("Volume ID: {}", metadata.volume_id);
    println!("System ID: {}", metadata.system_id);
    println!(
        "Contents:  {} entries, {} bytes",
        tree.len() - 1,
        tree.total_size()
    );
    println!();
    print_children(session, tree.root(), 0);
}

fn print_children(session: &Session, dir: NodeId, depth: usize) {
    let tree = session.tree();
    for &id in tree.children(dir) {
        let Some(node) = tree.get(id) else {
            continue;
        };
        let indent = "  ".repeat(depth);
        if node.is_directory() {
            println!("{}{}/", indent, node.name);
            print_children(session, id, depth + 1);
        } else {
            let origin = node.origin().map(|o| o.label()).unwrap_or_default();
            let hidden = if node.hidden { " hidden" } else { "" };
            println!(
                "{}{}  {} ({}{})",
                indent,
                node.name,
                node.size_string(),
                origin,
                hidden
            );
        }
    }
}

fn lookup(session: &Session, path: &str) -> Result<NodeId, Box<dyn Error>> {
    session
        .tree()
        .resolve_path(path)
        .ok_or_else(|| format!("no such path in image: {}", path).into())
}

/// Split `HOST=/IMAGE/DIR` into its parts; the target defaults to the root
fn split_spec(spec: &str) -> (&Path, &str) {
    match spec.rsplit_once('=') {
        Some((host, target)) if target.starts_with('/') => (Path::new(host), target),
        _ => (Path::new(spec), "/"),
    }
}

/// Split an image path into parent directory and final name
fn split_image_path(path: &str) -> Result<(&str, &str), Box<dyn Error>> {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rsplit_once('/') {
        Some((parent, name)) if !name.is_empty() => {
            Ok((if parent.is_empty() { "/" } else { parent }, name))
        }
        None if !trimmed.is_empty() => Ok(("/", trimmed)),
        _ => Err(format!("invalid image path: {}", path).into()),
    }
}
