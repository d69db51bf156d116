//! # rawhdd platform
//!
//! Platform adapters that connect the imaging engine to real drives.
//!
//! - [`DeviceSource`] reads sectors and tracks from any file or block device
//!   by translating CHS addresses into byte offsets.
//! - [`BlockGeometrySource`] asks the operating system for a drive's
//!   geometry. Only Linux answers; elsewhere the controller query fails and
//!   the operator must pass the geometry explicitly.
//! - [`drive_path`] maps a drive index to the platform's device path.
//!
//! ## Safety
//!
//! Devices are only ever opened read-only. Reading a whole disk still
//! usually needs elevated privileges; see [`has_elevated_privileges`].

#![warn(missing_docs)]
#![warn(clippy::all)]

use rawhdd_core::DriveSelector;
use thiserror::Error;

mod device;

pub use device::DeviceSource;

/// Platform-specific errors
#[derive(Error, Debug)]
pub enum PlatformError {
    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Device access denied (need elevated privileges)
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Device not found
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Operation not supported on this platform
    #[error("Not supported: {0}")]
    NotSupported(String),

    /// The device did not report a usable geometry
    #[error("Geometry query failed: {0}")]
    GeometryQuery(String),
}

/// Result type for platform operations
pub type Result<T> = std::result::Result<T, PlatformError>;

impl From<PlatformError> for rawhdd_core::Error {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::Io(e) => rawhdd_core::Error::Io(e),
            other => rawhdd_core::Error::GeometryUnavailable(other.to_string()),
        }
    }
}

/// Map an open failure on `path` to a descriptive error
pub(crate) fn open_error(path: &str, e: std::io::Error) -> PlatformError {
    match e.kind() {
        std::io::ErrorKind::NotFound => PlatformError::DeviceNotFound(path.to_string()),
        std::io::ErrorKind::PermissionDenied => PlatformError::PermissionDenied(format!(
            "Cannot open {}: {}. Try running with elevated privileges.",
            path, e
        )),
        _ => PlatformError::Io(e),
    }
}

// Platform-specific implementations
cfg_if::cfg_if! {
    if #[cfg(target_os = "linux")] {
        mod linux;
        pub use linux::BlockGeometrySource;
        use self::linux as platform;
    } else if #[cfg(target_os = "macos")] {
        mod macos;
        pub use macos::BlockGeometrySource;
        use self::macos as platform;
    } else if #[cfg(target_os = "windows")] {
        mod windows;
        pub use windows::BlockGeometrySource;
        use self::windows as platform;
    }
}

cfg_if::cfg_if! {
    if #[cfg(any(target_os = "linux", target_os = "macos", target_os = "windows"))] {
        /// Device path for a drive index
        ///
        /// `/dev/sda`, `/dev/sdb`, ... on Linux, `/dev/disk0`, ... on macOS and
        /// `\\.\PhysicalDrive0`, ... on Windows.
        pub fn drive_path(drive: DriveSelector) -> String {
            platform::drive_path(drive.index())
        }

        /// Check if running with elevated privileges
        pub fn has_elevated_privileges() -> bool {
            platform::has_elevated_privileges()
        }
    } else {
        /// Device path for a drive index (unsupported platform)
        pub fn drive_path(drive: DriveSelector) -> String {
            format!("drive{}", drive.index())
        }

        /// Check privileges (unsupported platform)
        pub fn has_elevated_privileges() -> bool {
            false
        }
    }
}

// ============================================================================
// UNIT TESTS
// ============================================================================
