//! BIN/CUE track layout
//!
//! Parses CUE sheet files into a flat list of tracks, each addressed by a
//! byte offset into its companion BIN file.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use cue_sheet::parser::{parse_cue, Command, Time, TrackType};
use thiserror::Error;

/// CD frame size for raw data (2352 bytes)
pub const CD_FRAME_SIZE: u64 = 2352;

/// CD frames per second in MM:SS:FF positions
pub const CD_FRAMES_PER_SECOND: i64 = 75;

/// Result type for BIN/CUE operations
pub type BinCueResult<T> = Result<T, BinCueError>;

/// Errors specific to BIN/CUE reading
#[derive(Debug, Error)]
pub enum BinCueError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CUE parse error: {0}")]
    CueParse(String),

    #[error("BIN file not found: {0}")]
    BinNotFound(String),

    #[error("No FILE entry in CUE sheet")]
    NoFileEntry,
}

/// One track of a CUE sheet, located inside its BIN file
#[derive(Debug, Clone)]
pub struct CueTrack {
    /// Track number as written in the sheet
    pub number: u32,
    pub track_type: TrackType,
    /// Resolved path of the BIN file holding this track
    pub bin_path: PathBuf,
    /// Byte offset of INDEX 01 within the BIN file
    pub offset: u64,
    /// Bytes up to the next track in the same file, or to the end of the file
    pub size: u64,
}

impl CueTrack {
    /// Check if this is a data (not audio) track
    pub fn is_data(&self) -> bool {
        !matches!(self.track_type, TrackType::Audio | TrackType::Cdg)
    }

    /// Node name used for this track, e.g. "Track 01"
    pub fn display_name(&self) -> String {
        format!("Track {:02}", self.number)
    }
}

/// Everything the loader needs from a CUE sheet
#[derive(Debug, Clone)]
pub struct CueLayout {
    /// Disc-level TITLE, if present
    pub title: Option<String>,
    pub tracks: Vec<CueTrack>,
}

/// Read a CUE sheet and compute the byte layout of its tracks
pub fn read_cue_sheet(cue_path: &Path) -> BinCueResult<CueLayout> {
    // Read file as bytes to handle non-UTF-8 encodings (Latin-1, etc.)
    let mut cue_bytes = Vec::new();
    File::open(cue_path)?.read_to_end(&mut cue_bytes)?;

    let cue_content = match String::from_utf8(cue_bytes) {
        Ok(s) => s,
        Err(e) => {
            log::info!("CUE file is not valid UTF-8, using lossy conversion");
            String::from_utf8_lossy(e.as_bytes()).to_string()
        }
    };

    let cue_dir = cue_path.parent().unwrap_or(Path::new("."));
    parse_cue_layout(&cue_content, cue_dir, Some(cue_path))
}

/// Build a layout from CUE text, resolving BIN files against `cue_dir`
pub fn parse_cue_layout(
    content: &str,
    cue_dir: &Path,
    cue_path: Option<&Path>,
) -> BinCueResult<CueLayout> {
    let normalized = normalize_cue_keywords(content);
    let commands = parse_cue(&normalized)
        .map_err(|e| BinCueError::CueParse(format!("{:?}", e)))?;

    let mut title = None;
    let mut saw_file = false;
    let mut current_file: Option<PathBuf> = None;
    let mut current_track: Option<(u32, TrackType)> = None;
    let mut tracks: Vec<CueTrack> = Vec::new();

    for cmd in &commands {
        match cmd {
            Command::File(filename, _format) => {
                saw_file = true;
                current_file = Some(resolve_bin_path(cue_dir, filename, cue_path)?);
                current_track = None;
            }
            Command::Title(text) if tracks.is_empty() && current_track.is_none() => {
                title = Some(text.clone());
            }
            Command::Track(track_no, track_type) => {
                current_track = Some((*track_no, track_type.clone()));
            }
            Command::Index(1, time) => {
                // INDEX 01 marks where the track's data begins
                if let (Some(bin_path), Some((number, track_type))) =
                    (&current_file, current_track.take())
                {
                    log::debug!("Track {}: {:?} at {}", number, track_type, time);
                    tracks.push(CueTrack {
                        number,
                        track_type,
                        bin_path: bin_path.clone(),
                        offset: time_to_bytes(time),
                        size: 0,
                    });
                }
            }
            _ => {}
        }
    }

    if !saw_file {
        return Err(BinCueError::NoFileEntry);
    }

    assign_track_sizes(&mut tracks)?;

    log::debug!("CUE sheet has {} tracks", tracks.len());

    Ok(CueLayout { title, tracks })
}

/// Convert an MM:SS:FF position to a byte offset in a raw BIN file
pub fn time_to_bytes(time: &Time) -> u64 {
    let frames = (time.mins as i64 * 60 + time.secs as i64) * CD_FRAMES_PER_SECOND
        + time.frames as i64;
    frames.max(0) as u64 * CD_FRAME_SIZE
}

/// Each track runs to the next track of the same BIN file; the last one to EOF
fn assign_track_sizes(tracks: &mut [CueTrack]) -> BinCueResult<()> {
    let mut file_lengths: HashMap<PathBuf, u64> = HashMap::new();

    for i in 0..tracks.len() {
        let next_offset = tracks[i + 1..]
            .iter()
            .find(|t| t.bin_path == tracks[i].bin_path)
            .map(|t| t.offset);

        let end = match next_offset {
            Some(offset) => offset,
            None => match file_lengths.get(&tracks[i].bin_path) {
                Some(length) => *length,
                None => {
                    let length = std::fs::metadata(&tracks[i].bin_path)?.len();
                    file_lengths.insert(tracks[i].bin_path.clone(), length);
                    length
                }
            },
        };

        tracks[i].size = end.saturating_sub(tracks[i].offset);
    }

    Ok(())
}

/// Normalize CUE sheet lines for parser compatibility
fn normalize_cue_keywords(content: &str) -> String {
    let mut result = String::new();

    for line in content.lines() {
        let trimmed = line.trim();

        // CATALOG numbers overflow the parser; REM values may span several tokens
        if trimmed.starts_with("CATALOG") || trimmed.starts_with("REM") {
            continue;
        }

        // The parser only accepts the mixed-case spelling of these file formats
        if trimmed.starts_with("FILE ") {
            if let Some(idx) = trimmed.rfind(char::is_whitespace) {
                let (head, format) = trimmed.split_at(idx);
                let format = match format.trim() {
                    "BINARY" => "Binary",
                    "MOTOROLA" => "Motorola",
                    other => other,
                };
                result.push_str(&format!("{} {}\n", head, format));
                continue;
            }
        }

        result.push_str(line);
        result.push('\n');
    }

    result
}

/// Resolve BIN file path, trying different locations
fn resolve_bin_path(
    cue_dir: &Path,
    bin_filename: &str,
    cue_path: Option<&Path>,
) -> BinCueResult<PathBuf> {
    // Try the path as-is (relative to CUE dir)
    let bin_path = cue_dir.join(bin_filename);
    if bin_path.exists() {
        return Ok(bin_path);
    }

    // Try just the filename (in case the CUE has an absolute path)
    if let Some(filename) = Path::new(bin_filename).file_name() {
        let bin_path = cue_dir.join(filename);
        if bin_path.exists() {
            return Ok(bin_path);
        }
    }

    // Try common variations of the referenced filename
    let base = Path::new(bin_filename).file_stem().unwrap_or_default();
    for ext in &["bin", "BIN", "img", "IMG"] {
        let try_path = cue_dir.join(format!("{}.{}", base.to_string_lossy(), ext));
        if try_path.exists() {
            return Ok(try_path);
        }
    }

    // If CUE path provided, try using the CUE's basename with BIN extensions
    if let Some(cue_stem) = cue_path.and_then(|p| p.file_stem()) {
        for ext in &["bin", "BIN", "img", "IMG"] {
            let try_path = cue_dir.join(format!("{}.{}", cue_stem.to_string_lossy(), ext));
            if try_path.exists() {
                return Ok(try_path);
            }
        }
    }

    Err(BinCueError::BinNotFound(bin_path.display().to_string()))
}
