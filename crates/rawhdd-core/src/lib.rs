//! # rawhdd core
//!
//! Sector-for-sector hard disk imaging.
//!
//! ## Modules
//!
//! - `geometry`: Drive geometry, the two geometry readings and their reconciliation
//! - `device`: Drive selection and the raw sector device interface
//! - `imager`: The track/sector imaging engine
//! - `log`: Append-only activity log
//! - `abort`: Operator abort handle
//! - `config`: Runtime configuration
//! - `settings`: Persistent user settings from configuration file
//! - `error`: Error types and result aliases
//!
//! ## Example
//!
//! ```ignore
//! use rawhdd_core::{geometry, DriveSelector, GeometryOverrides, Imager, Session};
//!
//! let drive = DriveSelector::new(0);
//! let chs = geometry::resolve(&mut geometry_source, drive, &GeometryOverrides::new())?;
//!
//! let session = Session::create("disk.img", "rawhdd.log", drive, chs.geometry)?;
//! let report = Imager::new().run(&mut device, session)?;
//! println!("{} bad sectors", report.failed_sectors.len());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod abort;
pub mod config;
pub mod device;
pub mod error;
pub mod geometry;
pub mod imager;
pub mod log;
pub mod settings;

pub use abort::AbortHandle;
pub use config::{ImagingConfig, DEFAULT_RETRY_ATTEMPTS};
pub use device::{DriveSelector, SectorDevice, FIRST_HARD_DRIVE, MAX_DRIVE_INDEX};
pub use error::{Error, Result};
pub use geometry::{
    read_geometry, reconcile, reconcile_readings, resolve, Geometry, GeometryOverrides,
    GeometryReadings, GeometrySource, PackedGeometry, Reconciliation, SectorAddress,
    TableGeometry, SECTOR_SIZE,
};
pub use imager::{
    format_duration, format_speed, CopyOutcome, EventCallback, Imager, ImagingEvent,
    ImagingProgress, ImagingReport, Session,
};
pub use log::{ActivityLog, ABORT_MARKER, DEFAULT_LOG_FILE};
pub use settings::{BehaviorSettings, ImagingSettings, Settings, SettingsError};
