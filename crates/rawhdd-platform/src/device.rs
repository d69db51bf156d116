//! File and block-device backed sector reads
//!
//! CHS addresses are translated to byte offsets with a fixed geometry, so an
//! image of a drive can be read back exactly the way the drive itself was.

use crate::{open_error, Result};
use rawhdd_core::{DriveSelector, Geometry, SectorDevice};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Read-only [`SectorDevice`] over a file or block device
///
/// The device is bound to one path; the drive selector passed to each read
/// is ignored. The sector size is taken from the buffers the engine passes
/// in: one sector for [`SectorDevice::read_sector`], one track for
/// [`SectorDevice::read_track`]. A short read counts as a failed read.
#[derive(Debug)]
pub struct DeviceSource {
    path: PathBuf,
    file: File,
    geometry: Geometry,
}

impl DeviceSource {
    /// Open `path` for reading with the given geometry
    pub fn open<P: AsRef<Path>>(path: P, geometry: Geometry) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = open_read_only(&path)?;

        tracing::debug!("Opened {:?} as CHS {}", path, geometry);

        Ok(Self {
            path,
            file,
            geometry,
        })
    }

    /// Byte offset of a sector
    fn offset(&self, cylinder: u32, head: u32, sector: u32, sector_size: usize) -> io::Result<u64> {
        let g = &self.geometry;
        if cylinder >= g.cylinders || head >= g.heads || sector == 0 || sector > g.sectors {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "CHS {},{},{} outside geometry {}",
                    cylinder, head, sector, g
                ),
            ));
        }
        if sector_size == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "empty read buffer",
            ));
        }
        Ok(g.lba(cylinder, head, sector) * sector_size as u64)
    }

    fn read_at(&mut self, offset: u64, buffer: &mut [u8]) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(buffer)
    }
}

impl SectorDevice for DeviceSource {
    fn read_track(
        &mut self,
        _drive: DriveSelector,
        cylinder: u32,
        head: u32,
        buffer: &mut [u8],
    ) -> io::Result<()> {
        let sectors = self.geometry.sectors as usize;
        if sectors == 0 || buffer.len() % sectors != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "track buffer of {} bytes does not hold {} sectors",
                    buffer.len(),
                    sectors
                ),
            ));
        }
        let offset = self.offset(cylinder, head, 1, buffer.len() / sectors)?;
        self.read_at(offset, buffer)
    }

    fn read_sector(
        &mut self,
        _drive: DriveSelector,
        cylinder: u32,
        head: u32,
        sector: u32,
        buffer: &mut [u8],
    ) -> io::Result<()> {
        let offset = self.offset(cylinder, head, sector, buffer.len())?;
        self.read_at(offset, buffer)
    }

    fn reset_controller(&mut self, _drive: DriveSelector) {
        // Reopening drops any error state the old descriptor carried
        match open_read_only(&self.path) {
            Ok(file) => {
                tracing::debug!("Reopened {:?}", self.path);
                self.file = file;
            }
            Err(e) => tracing::warn!("Failed to reopen {:?}: {}", self.path, e),
        }
    }
}

fn open_read_only(path: &Path) -> Result<File> {
    OpenOptions::new()
        .read(true)
        .open(path)
        .map_err(|e| open_error(&path.display().to_string(), e))
}

// ============================================================================
// UNIT TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PlatformError;
    use rawhdd_core::SECTOR_SIZE;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn drive() -> DriveSelector {
        DriveSelector::new(0)
    }

    /// File whose every sector is filled with its own LBA
    fn patterned(geometry: Geometry) -> NamedTempFile {
        let mut temp = NamedTempFile::new().unwrap();
        for lba in 0..geometry.total_sectors() {
            temp.write_all(&[lba as u8; SECTOR_SIZE]).unwrap();
        }
        temp.flush().unwrap();
        temp
    }

    #[test]
    fn test_open_nonexistent() {
        let result = DeviceSource::open("/nonexistent/rawhdd-test", Geometry::new(1, 1, 1));
        assert!(matches!(result, Err(PlatformError::DeviceNotFound(_))));
    }

    #[test]
    fn test_read_sector_offsets() {
        let geometry = Geometry::new(3, 2, 4);
        let temp = patterned(geometry);
        let mut source = DeviceSource::open(temp.path(), geometry).unwrap();

        let mut buf = [0u8; SECTOR_SIZE];
        source.read_sector(drive(), 0, 0, 1, &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 0));

        source.read_sector(drive(), 1, 1, 3, &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 14));
    }

    #[test]
    fn test_read_track() {
        let geometry = Geometry::new(2, 2, 3);
        let temp = patterned(geometry);
        let mut source = DeviceSource::open(temp.path(), geometry).unwrap();

        let mut buf = vec![0u8; geometry.track_bytes(SECTOR_SIZE)];
        source.read_track(drive(), 1, 0, &mut buf).unwrap();

        for (i, chunk) in buf.chunks(SECTOR_SIZE).enumerate() {
            assert!(chunk.iter().all(|&b| b == 6 + i as u8));
        }
    }

    #[test]
    fn test_short_read_fails() {
        let geometry = Geometry::new(2, 1, 2);
        let mut temp = NamedTempFile::new().unwrap();
        // One and a half tracks
        temp.write_all(&[0xAB; 3 * SECTOR_SIZE - 100]).unwrap();
        temp.flush().unwrap();

        let mut source = DeviceSource::open(temp.path(), geometry).unwrap();
        let mut buf = vec![0u8; 2 * SECTOR_SIZE];
        assert!(source.read_track(drive(), 0, 0, &mut buf).is_ok());
        assert!(source.read_track(drive(), 1, 0, &mut buf).is_err());

        let mut sector = [0u8; SECTOR_SIZE];
        assert!(source.read_sector(drive(), 1, 0, 2, &mut sector).is_err());
    }

    #[test]
    fn test_address_outside_geometry() {
        let geometry = Geometry::new(1, 1, 2);
        let temp = patterned(geometry);
        let mut source = DeviceSource::open(temp.path(), geometry).unwrap();

        let mut buf = [0u8; SECTOR_SIZE];
        let err = source.read_sector(drive(), 0, 0, 0, &mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(source.read_sector(drive(), 0, 0, 3, &mut buf).is_err());
        assert!(source.read_sector(drive(), 1, 0, 1, &mut buf).is_err());
    }

    #[test]
    fn test_reset_keeps_source_usable() {
        let geometry = Geometry::new(1, 1, 2);
        let temp = patterned(geometry);
        let mut source = DeviceSource::open(temp.path(), geometry).unwrap();

        source.reset_controller(drive());

        let mut buf = [0u8; SECTOR_SIZE];
        source.read_sector(drive(), 0, 0, 2, &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 1));
    }

    #[test]
    fn test_sector_size_follows_buffer() {
        let geometry = Geometry::new(2, 1, 2);
        let mut temp = NamedTempFile::new().unwrap();
        for lba in 0..geometry.total_sectors() {
            temp.write_all(&[lba as u8; 1024]).unwrap();
        }
        temp.flush().unwrap();
        let mut source = DeviceSource::open(temp.path(), geometry).unwrap();

        let mut sector = [0u8; 1024];
        source.read_sector(drive(), 1, 0, 2, &mut sector).unwrap();
        assert!(sector.iter().all(|&b| b == 3));

        let mut track = vec![0u8; 2 * 1024];
        source.read_track(drive(), 1, 0, &mut track).unwrap();
        assert!(track[..1024].iter().all(|&b| b == 2));
        assert!(track[1024..].iter().all(|&b| b == 3));
    }

    #[test]
    fn test_ragged_track_buffer_rejected() {
        let geometry = Geometry::new(1, 1, 2);
        let temp = patterned(geometry);
        let mut source = DeviceSource::open(temp.path(), geometry).unwrap();

        let mut buf = vec![0u8; SECTOR_SIZE + 1];
        let err = source.read_track(drive(), 0, 0, &mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);

        let err = source.read_sector(drive(), 0, 0, 1, &mut []).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
