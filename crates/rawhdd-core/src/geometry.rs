//! Drive geometry and reconciliation
//!
//! Two independent readings describe a drive:
//! - the *table* reading, the controller's parameter table (cylinders and heads)
//! - the *controller* reading, a query answered in packed register form
//!   (cylinders, heads and sectors per track)
//!
//! The table usually reports one cylinder more than the controller query,
//! which reserves the last cylinder for diagnostics. [`reconcile`] takes the
//! table's cylinder and head counts, the controller's sector count, and
//! flags anything beyond that one-cylinder difference as a mismatch.

use crate::device::DriveSelector;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bytes per sector
pub const SECTOR_SIZE: usize = 512;

/// Largest cylinder/head difference between the two readings that is still
/// considered normal
pub const CYLINDER_TOLERANCE: u32 = 1;

/// Cylinder/head/sector layout of a drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    /// Number of cylinders
    pub cylinders: u32,

    /// Number of heads
    pub heads: u32,

    /// Sectors per track
    pub sectors: u32,
}

impl Geometry {
    /// Create a geometry from its three counts
    pub fn new(cylinders: u32, heads: u32, sectors: u32) -> Self {
        Self {
            cylinders,
            heads,
            sectors,
        }
    }

    /// Check that every field is non-zero
    pub fn is_complete(&self) -> bool {
        self.cylinders > 0 && self.heads > 0 && self.sectors > 0
    }

    /// Fail with [`Error::IncompleteGeometry`] unless every field is set
    pub fn validate(&self) -> Result<()> {
        if self.is_complete() {
            Ok(())
        } else {
            Err(Error::IncompleteGeometry {
                cylinders: self.cylinders,
                heads: self.heads,
                sectors: self.sectors,
            })
        }
    }

    /// Bytes in one track (one head of one cylinder)
    pub fn track_bytes(&self, sector_size: usize) -> usize {
        self.sectors as usize * sector_size
    }

    /// Number of tracks on the drive
    pub fn total_tracks(&self) -> u64 {
        u64::from(self.cylinders) * u64::from(self.heads)
    }

    /// Number of sectors on the drive
    pub fn total_sectors(&self) -> u64 {
        self.total_tracks() * u64::from(self.sectors)
    }

    /// Size of a full image in bytes
    pub fn total_bytes(&self, sector_size: usize) -> u64 {
        self.total_sectors() * sector_size as u64
    }

    /// Linear block address of a sector (sectors are 1-based)
    pub fn lba(&self, cylinder: u32, head: u32, sector: u32) -> u64 {
        (u64::from(cylinder) * u64::from(self.heads) + u64::from(head)) * u64::from(self.sectors)
            + u64::from(sector.saturating_sub(1))
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.cylinders, self.heads, self.sectors)
    }
}

/// Position of a single sector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SectorAddress {
    /// Cylinder
    pub cylinder: u32,
    /// Head
    pub head: u32,
    /// Sector, starting at 1
    pub sector: u32,
}

impl fmt::Display for SectorAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.cylinder, self.head, self.sector)
    }
}

/// Controller geometry in its packed register form
///
/// - `cl` bits 0-5: sectors per track
/// - `cl` bits 6-7: high two bits of the maximum cylinder index
/// - `ch`: low eight bits of the maximum cylinder index
/// - `dh`: maximum head index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackedGeometry {
    /// Sector count and cylinder high bits
    pub cl: u8,
    /// Cylinder low bits
    pub ch: u8,
    /// Maximum head index
    pub dh: u8,
}

impl PackedGeometry {
    /// Pack counts into register form, clamping to what the encoding can hold
    pub fn pack(cylinders: u32, heads: u32, sectors: u32) -> Self {
        let max_cylinder = cylinders.saturating_sub(1).min(0x3FF);
        let max_head = heads.saturating_sub(1).min(0xFF);
        let sectors = sectors.min(0x3F);

        Self {
            cl: (sectors as u8) | (((max_cylinder >> 2) & 0xC0) as u8),
            ch: (max_cylinder & 0xFF) as u8,
            dh: max_head as u8,
        }
    }

    /// Sectors per track
    pub fn sectors(&self) -> u32 {
        u32::from(self.cl & 0x3F)
    }

    /// Cylinder count
    pub fn cylinders(&self) -> u32 {
        1 + ((u32::from(self.cl & 0xC0) << 2) | u32::from(self.ch))
    }

    /// Head count
    pub fn heads(&self) -> u32 {
        1 + u32::from(self.dh)
    }

    /// Decode into a [`Geometry`]
    pub fn decode(&self) -> Geometry {
        Geometry::new(self.cylinders(), self.heads(), self.sectors())
    }
}

/// Cylinder and head counts from the controller parameter table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableGeometry {
    /// Cylinder count
    pub cylinders: u32,
    /// Head count
    pub heads: u32,
}

/// Provider of the two geometry readings for a drive
#[cfg_attr(test, mockall::automock)]
pub trait GeometrySource {
    /// Read cylinder and head counts from the parameter table
    fn read_table_geometry(&mut self, drive: DriveSelector) -> TableGeometry;

    /// Query the controller for its packed geometry
    fn read_controller_geometry(&mut self, drive: DriveSelector) -> Result<PackedGeometry>;
}

/// Explicit geometry values supplied by the operator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeometryOverrides {
    /// Cylinder count override
    pub cylinders: Option<u32>,
    /// Head count override
    pub heads: Option<u32>,
    /// Sectors per track override
    pub sectors: Option<u32>,
    /// Drive override
    pub drive: Option<DriveSelector>,
}

impl GeometryOverrides {
    /// Create an empty override set
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the cylinder count
    pub fn cylinders(mut self, cylinders: u32) -> Self {
        self.cylinders = Some(cylinders);
        self
    }

    /// Override the head count
    pub fn heads(mut self, heads: u32) -> Self {
        self.heads = Some(heads);
        self
    }

    /// Override sectors per track
    pub fn sectors(mut self, sectors: u32) -> Self {
        self.sectors = Some(sectors);
        self
    }

    /// Override the drive
    pub fn drive(mut self, drive: DriveSelector) -> Self {
        self.drive = Some(drive);
        self
    }

    /// True when any geometry field is overridden
    pub fn any_geometry(&self) -> bool {
        self.cylinders.is_some() || self.heads.is_some() || self.sectors.is_some()
    }

    /// Return the full geometry when all three fields are overridden
    pub fn full_geometry(&self) -> Option<Geometry> {
        Some(Geometry::new(self.cylinders?, self.heads?, self.sectors?))
    }

    /// Apply the overrides on top of a detected geometry
    pub fn apply(&self, detected: Geometry) -> Geometry {
        Geometry {
            cylinders: self.cylinders.unwrap_or(detected.cylinders),
            heads: self.heads.unwrap_or(detected.heads),
            sectors: self.sectors.unwrap_or(detected.sectors),
        }
    }
}

/// Outcome of reconciling the two readings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciliation {
    /// Geometry to image with
    pub geometry: Geometry,

    /// Whether the readings disagreed beyond the normal tolerance
    pub mismatch: bool,

    /// Whether any override changed the result
    pub overridden: bool,
}

/// The two raw geometry readings for one drive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryReadings {
    /// Parameter table reading
    pub table: TableGeometry,
    /// Controller reading in register form
    pub controller: PackedGeometry,
}

/// Take both geometry readings for `drive`, controller first
///
/// Fails with [`Error::GeometryUnavailable`] if the controller query fails.
pub fn read_geometry<G>(source: &mut G, drive: DriveSelector) -> Result<GeometryReadings>
where
    G: GeometrySource + ?Sized,
{
    let controller = source.read_controller_geometry(drive)?;
    let table = source.read_table_geometry(drive);

    tracing::debug!(
        drive = drive.index(),
        code = ?drive.bios_code(),
        table_cylinders = table.cylinders,
        table_heads = table.heads,
        controller = %controller.decode(),
        "Read drive geometry"
    );

    Ok(GeometryReadings { table, controller })
}

/// Merge readings already taken into one geometry and a mismatch flag
///
/// Table values win for cylinders and heads; the controller only provides the
/// sector count and a cross-check.
pub fn reconcile_readings(readings: &GeometryReadings) -> (Geometry, bool) {
    let table = readings.table;
    let controller = readings.controller.decode();
    let mut mismatch = false;

    // Signed: a table shorter than the controller is never flagged
    let cylinder_diff = i64::from(table.cylinders) - i64::from(controller.cylinders);
    if cylinder_diff > i64::from(CYLINDER_TOLERANCE) {
        tracing::warn!(
            "Parameter table cylinders: {}; controller cylinders: {}",
            table.cylinders,
            controller.cylinders
        );
        mismatch = true;
    }

    if table.heads != controller.heads {
        tracing::warn!(
            "Parameter table heads: {}; controller heads: {}",
            table.heads,
            controller.heads
        );
        mismatch = true;
    }

    let geometry = Geometry::new(table.cylinders, table.heads, controller.sectors);
    (geometry, mismatch)
}

/// Merge the table and controller readings for `drive`
///
/// Fails with [`Error::GeometryUnavailable`] if the controller query fails.
pub fn reconcile<G>(source: &mut G, drive: DriveSelector) -> Result<(Geometry, bool)>
where
    G: GeometrySource + ?Sized,
{
    let readings = read_geometry(source, drive)?;
    Ok(reconcile_readings(&readings))
}

/// Produce the final session geometry for `drive`
///
/// When the overrides name all three fields the hardware is not queried.
/// Otherwise the readings are reconciled and the overrides applied on top.
/// Fails with [`Error::IncompleteGeometry`] if any field ends up zero.
pub fn resolve<G>(
    source: &mut G,
    drive: DriveSelector,
    overrides: &GeometryOverrides,
) -> Result<Reconciliation>
where
    G: GeometrySource + ?Sized,
{
    if let Some(geometry) = overrides.full_geometry() {
        tracing::debug!("Using command line geometry {}, skipping detection", geometry);
        geometry.validate()?;
        return Ok(Reconciliation {
            geometry,
            mismatch: false,
            overridden: true,
        });
    }

    let (detected, mismatch) = reconcile(source, drive)?;
    let geometry = overrides.apply(detected);
    geometry.validate()?;

    Ok(Reconciliation {
        geometry,
        mismatch,
        overridden: overrides.any_geometry(),
    })
}
