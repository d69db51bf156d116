//! Integration tests for rawhdd-platform
//!
//! These tests image temporary files through the platform adapters and the
//! core engine. Tests that require actual drives are marked with #[ignore].

use rawhdd_core::{
    geometry, DriveSelector, Geometry, GeometryOverrides, Imager, SectorDevice, Session,
    SECTOR_SIZE,
};
use rawhdd_platform::*;
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

fn source_image(geometry: Geometry) -> NamedTempFile {
    let mut temp = NamedTempFile::new().unwrap();
    for lba in 0..geometry.total_sectors() {
        let mut sector = [0u8; SECTOR_SIZE];
        sector[..8].copy_from_slice(&lba.to_le_bytes());
        sector[8..].fill((lba % 199) as u8);
        temp.write_all(&sector).unwrap();
    }
    temp.flush().unwrap();
    temp
}

// ============================================================================
// Imaging through DeviceSource
// ============================================================================

#[test]
fn test_image_copy_is_byte_identical() {
    let geometry = Geometry::new(6, 3, 9);
    let source_file = source_image(geometry);
    let dir = TempDir::new().unwrap();
    let image = dir.path().join("copy.img");
    let log = dir.path().join("rawhdd.log");

    let mut source = DeviceSource::open(source_file.path(), geometry).unwrap();
    let session = Session::create(&image, &log, DriveSelector::new(0), geometry).unwrap();
    let report = Imager::new().run(&mut source, session).unwrap();

    assert!(report.is_clean());
    assert_eq!(report.tracks_copied, geometry.total_tracks());
    assert_eq!(
        std::fs::read(&image).unwrap(),
        std::fs::read(source_file.path()).unwrap()
    );
}

#[test]
fn test_truncated_source_pads_image() {
    let geometry = Geometry::new(2, 2, 4);
    let mut source_file = NamedTempFile::new().unwrap();
    // Last track is missing its final two sectors
    let present = geometry.total_sectors() as usize - 2;
    source_file
        .write_all(&vec![0x5A; present * SECTOR_SIZE])
        .unwrap();
    source_file.flush().unwrap();

    let dir = TempDir::new().unwrap();
    let image = dir.path().join("copy.img");
    let log = dir.path().join("rawhdd.log");

    let mut source = DeviceSource::open(source_file.path(), geometry).unwrap();
    let session = Session::create(&image, &log, DriveSelector::new(0), geometry).unwrap();
    let imager = Imager::with_config(rawhdd_core::ImagingConfig::new().retry_attempts(1));
    let report = imager.run(&mut source, session).unwrap();

    assert_eq!(report.tracks_copied, 3);
    assert_eq!(report.tracks_recovered, 1);
    assert_eq!(report.failed_sectors.len(), 2);
    assert_eq!(
        std::fs::metadata(&image).unwrap().len(),
        geometry.total_bytes(SECTOR_SIZE)
    );

    let contents = std::fs::read_to_string(&log).unwrap();
    assert!(contents.contains("OK: 1,1,1\nOK: 1,1,2\nERR: 1,1,3\nERR: 1,1,4\n"));
}

#[test]
fn test_full_overrides_skip_geometry_query() {
    // Pointing the geometry source at a regular file would fail the query
    let source_file = source_image(Geometry::new(1, 1, 1));
    let mut geometry_source = BlockGeometrySource::with_device(source_file.path());

    let overrides = GeometryOverrides::new().cylinders(4).heads(2).sectors(17);
    let chs = geometry::resolve(&mut geometry_source, DriveSelector::new(0), &overrides).unwrap();

    assert_eq!(chs.geometry, Geometry::new(4, 2, 17));
    assert!(chs.overridden);
    assert!(!chs.mismatch);
}

#[test]
fn test_partial_overrides_need_geometry_query() {
    let source_file = source_image(Geometry::new(1, 1, 1));
    let mut geometry_source = BlockGeometrySource::with_device(source_file.path());

    let overrides = GeometryOverrides::new().sectors(63);
    let result = geometry::resolve(&mut geometry_source, DriveSelector::new(0), &overrides);

    assert!(matches!(
        result,
        Err(rawhdd_core::Error::GeometryUnavailable(_))
    ));
}

// ============================================================================
// Device paths and errors
// ============================================================================

#[test]
fn test_drive_path_distinct_per_index() {
    let a = drive_path(DriveSelector::new(0));
    let b = drive_path(DriveSelector::new(1));
    assert!(!a.is_empty());
    assert_ne!(a, b);
}

#[cfg(target_os = "windows")]
#[test]
fn test_drive_path_windows() {
    assert_eq!(
        drive_path(DriveSelector::new(1)),
        "\\\\.\\PhysicalDrive1"
    );
}

#[cfg(target_os = "macos")]
#[test]
fn test_drive_path_macos() {
    assert_eq!(drive_path(DriveSelector::new(2)), "/dev/disk2");
}

#[test]
fn test_open_missing_device() {
    let result = DeviceSource::open("/nonexistent/rawhdd/disk", Geometry::new(1, 1, 1));
    let err = result.unwrap_err();
    assert!(matches!(err, PlatformError::DeviceNotFound(_)));
    assert!(err.to_string().contains("/nonexistent/rawhdd/disk"));
}

#[test]
fn test_read_past_end_is_failure_not_panic() {
    let geometry = Geometry::new(2, 1, 1);
    let source_file = source_image(Geometry::new(1, 1, 1));
    let mut source = DeviceSource::open(source_file.path(), geometry).unwrap();

    let mut buf = [0u8; SECTOR_SIZE];
    assert!(source
        .read_sector(DriveSelector::new(0), 0, 0, 1, &mut buf)
        .is_ok());
    assert!(source
        .read_sector(DriveSelector::new(0), 1, 0, 1, &mut buf)
        .is_err());
}

#[test]
fn test_has_elevated_privileges_does_not_panic() {
    let _ = has_elevated_privileges();
}

#[test]
#[ignore = "requires a real disk and root privileges"]
fn test_query_first_drive() {
    use rawhdd_core::GeometrySource;

    let mut source = BlockGeometrySource::new();
    let packed = source
        .read_controller_geometry(DriveSelector::new(0))
        .unwrap();
    assert!(packed.sectors() > 0);
    assert!(packed.heads() > 0);
}
