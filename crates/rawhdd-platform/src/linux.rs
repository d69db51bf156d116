//! Linux platform implementation
//!
//! Geometry comes from the `HDIO_GETGEO` and `BLKGETSIZE64` block-device
//! ioctls.

use crate::{open_error, PlatformError, Result};
use rawhdd_core::{DriveSelector, GeometrySource, PackedGeometry, TableGeometry, SECTOR_SIZE};
use std::fs::OpenOptions;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

// Use libc::Ioctl type for cross-platform compatibility
// Cast via u32 to handle the sign bit correctly on platforms where Ioctl is i32
const HDIO_GETGEO: libc::Ioctl = 0x0301u32 as libc::Ioctl;
const BLKGETSIZE64: libc::Ioctl = 0x80081272u32 as libc::Ioctl;

/// `struct hd_geometry` from `<linux/hdreg.h>`
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
struct HdGeometry {
    heads: libc::c_uchar,
    sectors: libc::c_uchar,
    cylinders: libc::c_ushort,
    start: libc::c_ulong,
}

/// Geometry reported by the kernel for a block device
///
/// The controller reading is the kernel's legacy CHS geometry packed into
/// register form, which caps it at 1024 cylinders. The parameter table
/// reading divides the device capacity by the reported heads and sectors, so
/// large drives show a cylinder mismatch between the two.
#[derive(Debug, Clone, Default)]
pub struct BlockGeometrySource {
    device: Option<PathBuf>,
}

impl BlockGeometrySource {
    /// Query the device a drive index maps to
    pub fn new() -> Self {
        Self::default()
    }

    /// Query a specific device path regardless of drive index
    pub fn with_device<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            device: Some(path.into()),
        }
    }

    fn path_for(&self, drive: DriveSelector) -> PathBuf {
        self.device
            .clone()
            .unwrap_or_else(|| PathBuf::from(drive_path(drive.index())))
    }

    fn query(path: &Path) -> Result<(HdGeometry, u64)> {
        let file = OpenOptions::new()
            .read(true)
            .open(path)
            .map_err(|e| open_error(&path.display().to_string(), e))?;
        let fd = file.as_raw_fd();

        let mut geometry = HdGeometry::default();
        // SAFETY: ioctl with HDIO_GETGEO writes a struct hd_geometry to the
        // provided pointer. HdGeometry matches its layout and fd is valid.
        #[allow(unsafe_code)]
        let result = unsafe { libc::ioctl(fd, HDIO_GETGEO, &mut geometry) };
        if result != 0 {
            return Err(PlatformError::GeometryQuery(format!(
                "HDIO_GETGEO on {}: {}",
                path.display(),
                std::io::Error::last_os_error()
            )));
        }

        let mut size: u64 = 0;
        // SAFETY: ioctl with BLKGETSIZE64 writes a u64 to the provided pointer.
        // We pass a valid mutable reference to a u64, and fd is valid.
        #[allow(unsafe_code)]
        let result = unsafe { libc::ioctl(fd, BLKGETSIZE64, &mut size) };
        if result != 0 {
            return Err(PlatformError::GeometryQuery(format!(
                "BLKGETSIZE64 on {}: {}",
                path.display(),
                std::io::Error::last_os_error()
            )));
        }

        tracing::debug!(
            heads = geometry.heads,
            sectors = geometry.sectors,
            cylinders = geometry.cylinders,
            start = geometry.start,
            size,
            "Kernel geometry for {:?}",
            path
        );

        Ok((geometry, size))
    }
}

impl GeometrySource for BlockGeometrySource {
    fn read_table_geometry(&mut self, drive: DriveSelector) -> TableGeometry {
        let path = self.path_for(drive);
        match Self::query(&path) {
            Ok((geometry, size)) => table_from_capacity(
                size,
                u32::from(geometry.heads),
                u32::from(geometry.sectors),
            ),
            Err(e) => {
                tracing::warn!("No parameter table for {:?}: {}", path, e);
                TableGeometry {
                    cylinders: 0,
                    heads: 0,
                }
            }
        }
    }

    fn read_controller_geometry(
        &mut self,
        drive: DriveSelector,
    ) -> rawhdd_core::Result<PackedGeometry> {
        let path = self.path_for(drive);
        let (geometry, _) = Self::query(&path)
            .map_err(|e| rawhdd_core::Error::GeometryUnavailable(e.to_string()))?;

        if geometry.heads == 0 || geometry.sectors == 0 {
            return Err(rawhdd_core::Error::GeometryUnavailable(format!(
                "{} reports no CHS geometry",
                path.display()
            )));
        }

        Ok(PackedGeometry::pack(
            u32::from(geometry.cylinders),
            u32::from(geometry.heads),
            u32::from(geometry.sectors),
        ))
    }
}

/// Cylinder count implied by a capacity and a heads/sectors layout
pub(crate) fn table_from_capacity(size: u64, heads: u32, sectors: u32) -> TableGeometry {
    let per_cylinder = u64::from(heads) * u64::from(sectors) * SECTOR_SIZE as u64;
    let cylinders = if per_cylinder == 0 {
        0
    } else {
        u32::try_from(size / per_cylinder).unwrap_or(u32::MAX)
    };
    TableGeometry { cylinders, heads }
}

/// `/dev/sda` for index 0, ... `/dev/sdz`, then `/dev/sdaa`
pub(crate) fn drive_path(index: u8) -> String {
    let mut n = u32::from(index) + 1;
    let mut letters = Vec::new();
    while n > 0 {
        n -= 1;
        letters.push(char::from(b'a' + (n % 26) as u8));
        n /= 26;
    }
    let name: String = letters.iter().rev().collect();
    format!("/dev/sd{}", name)
}

pub(crate) fn has_elevated_privileges() -> bool {
    // SAFETY: geteuid() is a simple syscall that returns the effective user ID.
    // It has no preconditions and cannot cause undefined behavior.
    #[allow(unsafe_code)]
    unsafe {
        libc::geteuid() == 0
    }
}

// ============================================================================
// UNIT TESTS
// ============================================================================
