//! ISO 9660 filesystem implementation for directory listing and block reads

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};

use super::entry::{join_path, EntryType, FileEntry};
use super::filesystem::{Filesystem, FilesystemError};
use super::reader::{SectorReader, SECTOR_SIZE};
use crate::disc::formats::FilesystemType;
use crate::disc::iso9660::{decode_ucs2, VolumeDescriptorSet};

/// Directory flag bit
const FLAG_HIDDEN: u8 = 0x01;
const FLAG_DIRECTORY: u8 = 0x02;
const FLAG_MULTI_EXTENT: u8 = 0x80;

/// ISO 9660 filesystem implementation
pub struct Iso9660Filesystem {
    reader: Box<dyn SectorReader>,
    descriptors: VolumeDescriptorSet,
    name_source: FilesystemType,
    /// Location and size of the root extent of the tree being browsed
    root: (u32, u32),
    /// Directory extents discovered so far, keyed by lower-cased path
    ///
    /// The first of several case-insensitive twins wins, matching the
    /// loader which keeps the first same-named sibling.
    extents: HashMap<String, (u32, u32)>,
}

/// ISO 9660 Directory Record
#[derive(Debug, Clone)]
struct DirectoryRecord {
    /// Location of extent (LBA)
    extent_location: u32,
    /// Data length (file size)
    data_length: u32,
    /// Recording date and time
    recorded_at: Option<DateTime<Utc>>,
    /// File flags
    file_flags: u8,
    /// Raw file identifier
    file_identifier: Vec<u8>,
    /// System use area (Rock Ridge lives here)
    system_use: Vec<u8>,
}

impl DirectoryRecord {
    fn is_directory(&self) -> bool {
        (self.file_flags & FLAG_DIRECTORY) != 0
    }

    fn is_hidden(&self) -> bool {
        (self.file_flags & FLAG_HIDDEN) != 0
    }

    fn is_multi_extent(&self) -> bool {
        (self.file_flags & FLAG_MULTI_EXTENT) != 0
    }

    /// Check if this is the "." entry
    fn is_self(&self) -> bool {
        self.file_identifier.is_empty() || self.file_identifier == [0]
    }

    /// Check if this is the ".." entry
    fn is_parent(&self) -> bool {
        self.file_identifier == [1]
    }

    /// Get the display name for the given name source
    fn clean_name(&self, source: FilesystemType) -> String {
        if source == FilesystemType::RockRidge {
            if let Some(name) = rock_ridge_name(&self.system_use) {
                return name;
            }
        }

        let raw = match source {
            FilesystemType::Joliet => decode_ucs2(&self.file_identifier),
            _ => String::from_utf8_lossy(&self.file_identifier).to_string(),
        };

        // Remove version suffix (;1)
        let name = match raw.rfind(';') {
            Some(idx) => &raw[..idx],
            None => raw.as_str(),
        };

        // Files without an extension are recorded as "NAME."
        name.trim_end_matches('.').to_string()
    }
}

impl Iso9660Filesystem {
    /// Create a new ISO 9660 filesystem from a sector reader
    pub fn new(mut reader: Box<dyn SectorReader>) -> Result<Self, FilesystemError> {
        let descriptors =
            VolumeDescriptorSet::read(reader.as_mut()).map_err(FilesystemError::Parse)?;

        let primary_root = (
            descriptors.primary.root_location,
            descriptors.primary.root_size,
        );

        let name_source = if has_rock_ridge(reader.as_mut(), primary_root.0)? {
            FilesystemType::RockRidge
        } else if descriptors.joliet.is_some() {
            FilesystemType::Joliet
        } else {
            FilesystemType::Iso9660
        };

        let root = match (&descriptors.joliet, name_source) {
            (Some(joliet), FilesystemType::Joliet) => (joliet.root_location, joliet.root_size),
            _ => primary_root,
        };

        log::debug!(
            "Opened ISO 9660 volume '{}' using {} names",
            descriptors.primary.volume_id,
            name_source.display_name()
        );

        Ok(Self {
            reader,
            descriptors,
            name_source,
            root,
            extents: HashMap::new(),
        })
    }

    /// Find the extent of a directory path, listing parents as needed
    fn directory_extent(&mut self, path: &str) -> Result<(u32, u32), FilesystemError> {
        if path == "/" {
            return Ok(self.root);
        }

        let key = path.to_lowercase();
        if let Some(extent) = self.extents.get(&key) {
            return Ok(*extent);
        }

        let (parent, name) = match path.rfind('/') {
            Some(0) => ("/", &path[1..]),
            Some(idx) => (&path[..idx], &path[idx + 1..]),
            None => return Err(FilesystemError::NotFound(path.to_string())),
        };

        let siblings = self.list_directory(parent)?;
        let entry = siblings
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| FilesystemError::NotFound(path.to_string()))?;

        if !entry.is_directory() {
            return Err(FilesystemError::NotADirectory(path.to_string()));
        }

        Ok((entry.location as u32, entry.size as u32))
    }

    /// Parse directory records from raw directory data
    fn parse_directory(&mut self, data: &[u8], parent_path: &str) -> Vec<FileEntry> {
        let mut entries: Vec<FileEntry> = Vec::new();
        let mut continues_previous = false;
        let mut offset = 0;

        while offset < data.len() {
            let record_length = data[offset] as usize;

            // Length 0 means end of sector, skip to next sector boundary
            if record_length == 0 {
                let next_sector = ((offset / SECTOR_SIZE as usize) + 1) * SECTOR_SIZE as usize;
                if next_sector >= data.len() {
                    break;
                }
                offset = next_sector;
                continue;
            }

            if offset + record_length > data.len() {
                break;
            }

            if let Some(record) = parse_directory_record(&data[offset..offset + record_length]) {
                if !record.is_self() && !record.is_parent() {
                    if continues_previous {
                        // Further extents of a multi-extent file follow the first one
                        if let Some(last) = entries.last_mut() {
                            last.size += record.data_length as u64;
                        }
                    } else {
                        entries.push(self.entry_from_record(&record, parent_path));
                    }
                    continues_previous = !record.is_directory() && record.is_multi_extent();
                }
            }

            offset += record_length;
        }

        entries
    }

    fn entry_from_record(&mut self, record: &DirectoryRecord, parent_path: &str) -> FileEntry {
        let name = record.clean_name(self.name_source);
        let path = join_path(parent_path, &name);

        let entry_type = if record.is_directory() {
            self.extents
                .entry(path.to_lowercase())
                .or_insert((record.extent_location, record.data_length));
            EntryType::Directory
        } else {
            EntryType::File
        };

        FileEntry {
            name,
            path,
            entry_type,
            size: record.data_length as u64,
            location: record.extent_location as u64,
            modified: record.recorded_at,
            hidden: record.is_hidden(),
        }
    }

    /// Read directory data from the disc
    fn read_directory_data(&mut self, location: u32, size: u32) -> Result<Vec<u8>, FilesystemError> {
        let sector_count = (size as u64).div_ceil(SECTOR_SIZE);
        let data = self.reader.read_sectors(location as u64, sector_count)?;
        Ok(data[..size as usize].to_vec())
    }
}

impl Filesystem for Iso9660Filesystem {
    fn volume_id(&self) -> &str {
        match (&self.descriptors.joliet, self.name_source) {
            (Some(joliet), FilesystemType::Joliet) if !joliet.volume_id.is_empty() => {
                &joliet.volume_id
            }
            _ => &self.descriptors.primary.volume_id,
        }
    }

    fn system_id(&self) -> &str {
        match (&self.descriptors.joliet, self.name_source) {
            (Some(joliet), FilesystemType::Joliet) if !joliet.system_id.is_empty() => {
                &joliet.system_id
            }
            _ => &self.descriptors.primary.system_id,
        }
    }

    fn name_source(&self) -> FilesystemType {
        self.name_source
    }

    fn list_directory(&mut self, path: &str) -> Result<Vec<FileEntry>, FilesystemError> {
        let trimmed = path.trim_end_matches('/');
        let path = if trimmed.is_empty() { "/" } else { trimmed };

        let (location, size) = self.directory_extent(path)?;
        let data = self.read_directory_data(location, size)?;

        Ok(self.parse_directory(&data, path))
    }

    fn read_blocks(&mut self, lba: u64, count: u64) -> Result<Vec<u8>, FilesystemError> {
        Ok(self.reader.read_sectors(lba, count)?)
    }
}

/// Parse a single directory record
fn parse_directory_record(data: &[u8]) -> Option<DirectoryRecord> {
    if data.len() < 34 {
        return None;
    }

    // Location of extent (LBA) - little-endian at bytes 2-5
    let extent_location = u32::from_le_bytes([data[2], data[3], data[4], data[5]]);

    // Data length - little-endian at bytes 10-13
    let data_length = u32::from_le_bytes([data[10], data[11], data[12], data[13]]);

    let recorded_at = parse_record_date(&data[18..25]);

    let file_flags = data[25];

    let identifier_length = data[32] as usize;
    if data.len() < 33 + identifier_length {
        return None;
    }

    let file_identifier = data[33..33 + identifier_length].to_vec();

    // A padding byte follows identifiers of even length
    let system_use_start = 33 + identifier_length + (1 - identifier_length % 2);
    let system_use = data.get(system_use_start..).unwrap_or_default().to_vec();

    Some(DirectoryRecord {
        extent_location,
        data_length,
        recorded_at,
        file_flags,
        file_identifier,
        system_use,
    })
}

/// Convert the 7-byte directory record date to UTC
fn parse_record_date(bytes: &[u8]) -> Option<DateTime<Utc>> {
    let date = NaiveDate::from_ymd_opt(1900 + bytes[0] as i32, bytes[1] as u32, bytes[2] as u32)?;
    let naive = date.and_hms_opt(bytes[3] as u32, bytes[4] as u32, bytes[5] as u32)?;

    // GMT offset in 15 minute intervals
    let offset = FixedOffset::east_opt(bytes[6] as i8 as i32 * 15 * 60)?;

    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Collect the Rock Ridge alternate name from a system use area
fn rock_ridge_name(system_use: &[u8]) -> Option<String> {
    let mut name = Vec::new();
    let mut found = false;
    let mut offset = 0;

    while offset + 4 <= system_use.len() {
        let signature = &system_use[offset..offset + 2];
        let length = system_use[offset + 2] as usize;

        if length < 4 || offset + length > system_use.len() || signature == b"ST" {
            break;
        }

        // NM: flags byte, then name bytes. CURRENT/PARENT names carry no text.
        if signature == b"NM" && length >= 5 && system_use[offset + 4] & 0x06 == 0 {
            name.extend_from_slice(&system_use[offset + 5..offset + length]);
            found = true;
        }

        offset += length;
    }

    found.then(|| String::from_utf8_lossy(&name).to_string())
}

/// Rock Ridge images mark the root "." record with a SUSP "SP" entry
fn has_rock_ridge(reader: &mut dyn SectorReader, root_location: u32) -> Result<bool, FilesystemError> {
    let sector = reader.read_sector(root_location as u64)?;
    let length = sector[0] as usize;
    if length == 0 || length > sector.len() {
        return Ok(false);
    }

    Ok(parse_directory_record(&sector[..length])
        .map(|record| record.system_use.starts_with(b"SP") && record.system_use.len() >= 7)
        .unwrap_or(false))
}
