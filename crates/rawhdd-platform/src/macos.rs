//! macOS platform implementation
//!
//! macOS exposes no CHS geometry for disks, so the controller query always
//! fails and a geometry must be supplied on the command line.

use crate::PlatformError;
use rawhdd_core::{DriveSelector, GeometrySource, PackedGeometry, TableGeometry};

/// Geometry source that reports the query as unsupported
#[derive(Debug, Clone, Default)]
pub struct BlockGeometrySource;

impl BlockGeometrySource {
    /// Create the source
    pub fn new() -> Self {
        Self
    }

    /// Accepted for parity with Linux; the path is not queried
    pub fn with_device<P: Into<std::path::PathBuf>>(_path: P) -> Self {
        Self
    }
}

impl GeometrySource for BlockGeometrySource {
    fn read_table_geometry(&mut self, _drive: DriveSelector) -> TableGeometry {
        TableGeometry {
            cylinders: 0,
            heads: 0,
        }
    }

    fn read_controller_geometry(
        &mut self,
        drive: DriveSelector,
    ) -> rawhdd_core::Result<PackedGeometry> {
        Err(PlatformError::NotSupported(format!(
            "geometry query for {} on macOS",
            drive_path(drive.index())
        ))
        .into())
    }
}

pub(crate) fn drive_path(index: u8) -> String {
    format!("/dev/disk{}", index)
}

pub(crate) fn has_elevated_privileges() -> bool {
    // SAFETY: geteuid() is a simple syscall that returns the effective user ID.
    // It has no preconditions and cannot cause undefined behavior.
    #[allow(unsafe_code)]
    unsafe {
        libc::geteuid() == 0
    }
}
