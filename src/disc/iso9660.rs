//! ISO 9660 volume descriptor parsing
//!
//! Reads the volume descriptor set starting at sector 16. The Primary Volume
//! Descriptor (PVD) is always required; a Joliet Supplementary Volume
//! Descriptor is picked up when present so its UCS-2 directory tree can be
//! used for long file names.

use super::browse::reader::{SectorReader, SECTOR_SIZE};

/// Sector number where the volume descriptor set starts
pub const PVD_SECTOR: u64 = 16;

/// Volume descriptor type for Primary Volume Descriptor
const PVD_TYPE: u8 = 1;

/// Volume descriptor type for Supplementary Volume Descriptor
const SVD_TYPE: u8 = 2;

/// Volume descriptor set terminator
const TERMINATOR_TYPE: u8 = 255;

/// Upper bound on descriptors scanned before giving up on a terminator
const MAX_DESCRIPTORS: u64 = 32;

/// Standard identifier for ISO 9660 volume descriptors
const ISO9660_IDENTIFIER: &[u8; 5] = b"CD001";

/// Joliet escape sequences (UCS-2 level 1, 2 and 3)
const JOLIET_ESCAPES: [&[u8; 3]; 3] = [b"%/@", b"%/C", b"%/E"];

/// Which descriptor a [`VolumeDescriptor`] was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorKind {
    Primary,
    Joliet,
}

/// A parsed primary or Joliet volume descriptor
#[derive(Debug, Clone)]
pub struct VolumeDescriptor {
    pub kind: DescriptorKind,
    /// System identifier (32 bytes, space-padded)
    pub system_id: String,
    /// Volume identifier (32 bytes, space-padded)
    pub volume_id: String,
    /// Logical block size (2048 on every image we accept)
    pub logical_block_size: u16,
    /// LBA of the root directory extent
    pub root_location: u32,
    /// Size of the root directory extent in bytes
    pub root_size: u32,
}

impl VolumeDescriptor {
    /// Parse a Primary Volume Descriptor from raw sector data
    pub fn parse_primary(sector: &[u8]) -> Result<Self, String> {
        check_header(sector)?;

        if sector[0] != PVD_TYPE {
            return Err(format!(
                "Not a Primary Volume Descriptor (type {} != {})",
                sector[0], PVD_TYPE
            ));
        }

        // Layout according to ECMA-119:
        // Offset 8-39: System Identifier
        // Offset 40-71: Volume Identifier
        // Offset 128-131: Logical Block Size (both-endian)
        // Offset 156-189: Root Directory Record
        Ok(Self::from_fields(DescriptorKind::Primary, sector, extract_string))
    }

    /// Parse a Joliet Supplementary Volume Descriptor
    ///
    /// Returns `Ok(None)` for supplementary descriptors that are not Joliet.
    pub fn parse_joliet(sector: &[u8]) -> Result<Option<Self>, String> {
        check_header(sector)?;

        if sector[0] != SVD_TYPE {
            return Ok(None);
        }

        let escapes = &sector[88..91];
        if !JOLIET_ESCAPES.iter().any(|e| escapes == &e[..]) {
            return Ok(None);
        }

        Ok(Some(Self::from_fields(DescriptorKind::Joliet, sector, decode_ucs2)))
    }

    fn from_fields(kind: DescriptorKind, sector: &[u8], decode: fn(&[u8]) -> String) -> Self {
        let root_record = &sector[156..190];

        Self {
            kind,
            system_id: decode(&sector[8..40]),
            volume_id: decode(&sector[40..72]),
            logical_block_size: u16::from_le_bytes([sector[128], sector[129]]),
            root_location: read_u32_le(&root_record[2..6]),
            root_size: read_u32_le(&root_record[10..14]),
        }
    }
}

/// The descriptors of one image that matter for browsing
#[derive(Debug, Clone)]
pub struct VolumeDescriptorSet {
    pub primary: VolumeDescriptor,
    pub joliet: Option<VolumeDescriptor>,
}

impl VolumeDescriptorSet {
    /// Scan the descriptor set from sector 16 up to the terminator
    pub fn read(reader: &mut dyn SectorReader) -> Result<Self, String> {
        let mut primary = None;
        let mut joliet = None;

        for index in 0..MAX_DESCRIPTORS {
            let sector = reader
                .read_sector(PVD_SECTOR + index)
                .map_err(|e| format!("Failed to read volume descriptor {}: {}", index, e))?;

            match sector[0] {
                TERMINATOR_TYPE => break,
                PVD_TYPE if primary.is_none() => {
                    primary = Some(VolumeDescriptor::parse_primary(&sector)?);
                }
                SVD_TYPE if joliet.is_none() => {
                    joliet = VolumeDescriptor::parse_joliet(&sector)?;
                }
                _ => {
                    // Boot records, enhanced descriptors and partitions are not needed
                    check_header(&sector)?;
                }
            }
        }

        let primary = primary.ok_or_else(|| "No Primary Volume Descriptor found".to_string())?;

        if primary.logical_block_size as u64 != SECTOR_SIZE {
            return Err(format!(
                "Unsupported logical block size: {}",
                primary.logical_block_size
            ));
        }

        log::debug!(
            "Volume descriptors: volume_id='{}', joliet={}",
            primary.volume_id,
            joliet.is_some()
        );

        Ok(Self { primary, joliet })
    }
}

fn check_header(sector: &[u8]) -> Result<(), String> {
    if sector.len() < SECTOR_SIZE as usize {
        return Err(format!(
            "Sector too small: {} bytes (expected {})",
            sector.len(),
            SECTOR_SIZE
        ));
    }

    if &sector[1..6] != ISO9660_IDENTIFIER {
        return Err("Invalid ISO 9660 identifier (expected 'CD001')".to_string());
    }

    if sector[6] != 1 {
        return Err(format!("Unsupported volume descriptor version: {}", sector[6]));
    }

    Ok(())
}

fn read_u32_le(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Extract a string from a byte slice, trimming trailing spaces and nulls
pub fn extract_string(bytes: &[u8]) -> String {
    let s = String::from_utf8_lossy(bytes);
    s.trim_end_matches(|c: char| c == ' ' || c == '\0')
        .to_string()
}

/// Decode a big-endian UCS-2 field as used by Joliet, trimming padding
pub fn decode_ucs2(bytes: &[u8]) -> String {
    let units = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));

    char::decode_utf16(units)
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect::<String>()
        .trim_end_matches(|c: char| c == ' ' || c == '\0')
        .to_string()
}
