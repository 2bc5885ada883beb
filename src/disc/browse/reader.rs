//! Sector reader trait and the direct-image implementation

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

/// Logical sector size for ISO 9660 data (cooked)
pub const SECTOR_SIZE: u64 = 2048;

/// Trait for reading logical sectors from a disc image
pub trait SectorReader: Send {
    /// Read a single sector at the given LBA (Logical Block Address)
    fn read_sector(&mut self, lba: u64) -> Result<Vec<u8>, io::Error> {
        self.read_sectors(lba, 1)
    }

    /// Read multiple contiguous sectors
    fn read_sectors(&mut self, start_lba: u64, count: u64) -> Result<Vec<u8>, io::Error>;
}

/// Sector reader over any seekable byte source laid out as 2048-byte blocks
pub struct IsoSectorReader<R = BufReader<File>> {
    inner: R,
}

impl IsoSectorReader {
    /// Open an image file on disk
    pub fn open(path: &Path) -> Result<Self, io::Error> {
        let file = File::open(path)?;
        Ok(Self {
            inner: BufReader::new(file),
        })
    }
}

impl<R: Read + Seek + Send> IsoSectorReader<R> {
    /// Wrap an already-open source
    pub fn from_reader(inner: R) -> Self {
        Self { inner }
    }
}

impl<R: Read + Seek + Send> SectorReader for IsoSectorReader<R> {
    fn read_sectors(&mut self, start_lba: u64, count: u64) -> Result<Vec<u8>, io::Error> {
        let offset = start_lba * SECTOR_SIZE;
        let length = (count * SECTOR_SIZE) as usize;
        self.inner.seek(SeekFrom::Start(offset))?;
        let mut buffer = vec![0u8; length];
        self.inner.read_exact(&mut buffer)?;
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_read_sectors_from_cursor() {
        let mut data = vec![0u8; 3 * SECTOR_SIZE as usize];
        data[SECTOR_SIZE as usize] = 0xAB;
        data[2 * SECTOR_SIZE as usize] = 0xCD;

        let mut reader = IsoSectorReader::from_reader(Cursor::new(data));
        let sectors = reader.read_sectors(1, 2).unwrap();

        assert_eq!(sectors.len(), 2 * SECTOR_SIZE as usize);
        assert_eq!(sectors[0], 0xAB);
        assert_eq!(sectors[SECTOR_SIZE as usize], 0xCD);
    }

    #[test]
    fn test_read_past_end_fails() {
        let mut reader = IsoSectorReader::from_reader(Cursor::new(vec![0u8; 100]));
        assert!(reader.read_sector(0).is_err());
    }
}
