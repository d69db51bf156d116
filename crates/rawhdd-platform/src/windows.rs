//! Windows platform implementation
//!
//! Drives are addressed as `\\.\PhysicalDriveN`. Geometry queries are not
//! implemented, so a geometry must be supplied on the command line.

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
            "geometry query for {} on Windows",
            drive_path(drive.index())
        ))
        .into())
    }
}

pub(crate) fn drive_path(index: u8) -> String {
    format!("\\\\.\\PhysicalDrive{}", index)
}

/// Check if running with elevated privileges (Administrator)
pub(crate) fn has_elevated_privileges() -> bool {
    use windows_sys::Win32::Foundation::{CloseHandle, HANDLE};
    use windows_sys::Win32::Security::{
        GetTokenInformation, TokenElevation, TOKEN_ELEVATION, TOKEN_QUERY,
    };
    use windows_sys::Win32::System::Threading::{GetCurrentProcess, OpenProcessToken};

    // SAFETY: the token handle is only used after OpenProcessToken succeeds
    // and is closed before returning. TOKEN_ELEVATION is plain data.
    #[allow(unsafe_code)]
    unsafe {
        let mut token: HANDLE = 0;
        if OpenProcessToken(GetCurrentProcess(), TOKEN_QUERY, &mut token) == 0 {
            return false;
        }

        let mut elevation: TOKEN_ELEVATION = std::mem::zeroed();
        let mut size: u32 = 0;

        let result = GetTokenInformation(
            token,
            TokenElevation,
            &mut elevation as *mut _ as *mut _,
            std::mem::size_of::<TOKEN_ELEVATION>() as u32,
            &mut size,
        );

        CloseHandle(token);

        result != 0 && elevation.TokenIsElevated != 0
    }
}
