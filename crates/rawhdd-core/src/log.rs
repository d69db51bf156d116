//! Append-only activity log
//!
//! One line per imaged unit plus a banner when a session starts and ends.
//! The log is opened in append mode and every line is flushed as soon as it
//! is written, so an interrupted session still leaves a readable record.

use crate::device::DriveSelector;
use crate::geometry::{Geometry, SectorAddress};
use chrono::{DateTime, Local};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// Default log file name, created in the working directory
pub const DEFAULT_LOG_FILE: &str = "rawhdd.log";

/// Marker written when the operator aborts a session
pub const ABORT_MARKER: &str = "Aborted by user!";

/// Render a timestamp the way `asctime` does (`Sun Oct 18 14:03:07 2026`)
pub fn format_timestamp(time: &DateTime<Local>) -> String {
    time.format("%a %b %e %H:%M:%S %Y").to_string()
}

/// Append-only session log
#[derive(Debug)]
pub struct ActivityLog<W: Write = File> {
    out: W,
}

impl ActivityLog<File> {
    /// Open (or create) a log file for appending
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        tracing::debug!("Opened activity log {:?}", path.as_ref());
        Ok(Self::new(file))
    }
}

impl<W: Write> ActivityLog<W> {
    /// Wrap an already-open writer
    pub fn new(out: W) -> Self {
        Self { out }
    }

    fn line(&mut self, args: std::fmt::Arguments<'_>) -> io::Result<()> {
        self.out.write_fmt(args)?;
        self.out.write_all(b"\n")?;
        self.out.flush()
    }

    /// Write the start banner and the drive/geometry line
    pub fn session_started(
        &mut self,
        destination: &str,
        drive: DriveSelector,
        geometry: &Geometry,
    ) -> io::Result<()> {
        self.session_started_at(destination, drive, geometry, &Local::now())
    }

    /// Write the start banner with an explicit timestamp
    pub fn session_started_at(
        &mut self,
        destination: &str,
        drive: DriveSelector,
        geometry: &Geometry,
        time: &DateTime<Local>,
    ) -> io::Result<()> {
        self.line(format_args!(""))?;
        self.line(format_args!(
            "{} copy started at {}",
            destination,
            format_timestamp(time)
        ))?;
        self.line(format_args!("Drive {} CHS: {}", drive.index(), geometry))
    }

    /// Record a track copied in one piece
    pub fn track_ok(&mut self, cylinder: u32, head: u32) -> io::Result<()> {
        self.line(format_args!("OK: {},{},*", cylinder, head))
    }

    /// Record a sector read by the fallback path
    pub fn sector_ok(&mut self, address: SectorAddress) -> io::Result<()> {
        self.line(format_args!("OK: {}", address))
    }

    /// Record a sector that could not be read
    pub fn sector_err(&mut self, address: SectorAddress) -> io::Result<()> {
        self.line(format_args!("ERR: {}", address))
    }

    /// Record an operator abort
    pub fn aborted(&mut self) -> io::Result<()> {
        self.line(format_args!("{}", ABORT_MARKER))
    }

    /// Record a fatal write failure
    pub fn write_failed(&mut self, reason: &dyn std::fmt::Display) -> io::Result<()> {
        self.line(format_args!("Write failed: {}", reason))
    }

    /// Write the finish banner
    pub fn session_finished(&mut self, destination: &str) -> io::Result<()> {
        self.session_finished_at(destination, &Local::now())
    }

    /// Write the finish banner with an explicit timestamp
    pub fn session_finished_at(
        &mut self,
        destination: &str,
        time: &DateTime<Local>,
    ) -> io::Result<()> {
        self.line(format_args!(
            "{} copy finished at {}",
            destination,
            format_timestamp(time)
        ))
    }

    #[cfg(test)]
    fn into_inner(mut self) -> io::Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}
