//! Track-by-track imaging engine
//!
//! For every cylinder, and every head within it, the engine first tries to
//! read the whole track in one device call. When that fails it falls back to
//! reading the track one sector at a time, resetting the controller before
//! each retry of a bad sector. Whatever happens to a sector, exactly one
//! sector's worth of bytes is written for it, so offsets in the image always
//! line up with positions on the drive. Bytes written for a sector that
//! never read successfully are whatever the buffer held at the time.
//!
//! Write failures end the session immediately.

use crate::abort::AbortHandle;
use crate::config::ImagingConfig;
use crate::device::{DriveSelector, SectorDevice};
use crate::error::{Error, Result};
use crate::geometry::{Geometry, SectorAddress};
use crate::log::ActivityLog;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::time::{Duration, Instant};

/// Everything one imaging session owns
///
/// The output sink and the activity log are released when the session is
/// dropped, which is how every exit path from [`Imager::run`] closes them.
pub struct Session<W: Write = File, L: Write = File> {
    /// Geometry to image with
    pub geometry: Geometry,

    /// Drive being imaged
    pub drive: DriveSelector,

    /// Destination name used in log banners
    pub destination: String,

    output: W,
    log: ActivityLog<L>,
}

impl Session<File, File> {
    /// Create a fresh output file and open the activity log for appending
    pub fn create<P, Q>(
        output_path: P,
        log_path: Q,
        drive: DriveSelector,
        geometry: Geometry,
    ) -> Result<Self>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let output_path = output_path.as_ref();
        let output = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(output_path)?;
        let log = ActivityLog::open(log_path)?;

        Ok(Self::new(
            output,
            log,
            drive,
            geometry,
            output_path.display().to_string(),
        ))
    }
}

impl<W: Write, L: Write> Session<W, L> {
    /// Assemble a session from already-open handles
    pub fn new(
        output: W,
        log: ActivityLog<L>,
        drive: DriveSelector,
        geometry: Geometry,
        destination: impl Into<String>,
    ) -> Self {
        Self {
            geometry,
            drive,
            destination: destination.into(),
            output,
            log,
        }
    }

    fn write_unit(&mut self, data: &[u8]) -> io::Result<()> {
        self.output.write_all(data)
    }
}

/// Result of copying one track or one sector
#[derive(Debug)]
pub enum CopyOutcome {
    /// Data read and written
    Success,

    /// Every read attempt failed; the sector's bytes were still written
    FailedAfterRetries {
        /// Sector that could not be read
        position: SectorAddress,
        /// Number of read attempts made
        attempts: u32,
    },

    /// The destination rejected the data
    WriteFailed(io::Error),
}

/// Per-unit notification for operators watching a long transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImagingEvent {
    /// A whole track was copied in one read
    TrackCopied {
        /// Cylinder
        cylinder: u32,
        /// Head
        head: u32,
    },

    /// The bulk read failed; the track will be copied sector by sector
    TrackReadFailed {
        /// Cylinder
        cylinder: u32,
        /// Head
        head: u32,
    },

    /// A sector was copied by the fallback path
    SectorCopied(SectorAddress),

    /// A sector read failed and is about to be retried
    SectorRetry {
        /// Sector being retried
        address: SectorAddress,
        /// Retry number, starting at 1
        attempt: u32,
    },

    /// A sector could not be read
    SectorFailed {
        /// Sector that failed
        address: SectorAddress,
        /// Number of read attempts made
        attempts: u32,
    },
}

/// Running totals for an imaging session
#[derive(Debug, Clone)]
pub struct ImagingProgress {
    /// Tracks finished so far
    pub tracks_done: u64,

    /// Tracks on the drive
    pub total_tracks: u64,

    /// Bytes written to the output
    pub bytes_written: u64,

    /// Size of the complete image
    pub total_bytes: u64,

    /// Current transfer speed in bytes per second
    pub speed_bps: u64,

    /// Estimated time remaining in seconds
    pub eta_seconds: Option<u64>,

    /// Elapsed time since start
    pub elapsed: Duration,
}

impl ImagingProgress {
    /// Create progress for a geometry
    pub fn new(geometry: &Geometry, sector_size: usize) -> Self {
        Self {
            tracks_done: 0,
            total_tracks: geometry.total_tracks(),
            bytes_written: 0,
            total_bytes: geometry.total_bytes(sector_size),
            speed_bps: 0,
            eta_seconds: None,
            elapsed: Duration::ZERO,
        }
    }

    /// Format speed for display (e.g., "45.2 KB/s")
    pub fn speed_display(&self) -> String {
        format_speed(self.speed_bps)
    }

    /// Format ETA for display (e.g., "2m 30s")
    pub fn eta_display(&self) -> String {
        match self.eta_seconds {
            Some(secs) if secs > 0 => format_duration(secs),
            _ => "calculating...".to_string(),
        }
    }
}

/// Summary of a completed session
#[derive(Debug, Clone, Default)]
pub struct ImagingReport {
    /// Tracks copied with a single read
    pub tracks_copied: u64,

    /// Tracks that needed the sector-by-sector path
    pub tracks_recovered: u64,

    /// Sectors that read only after one or more retries
    pub sectors_recovered: u64,

    /// Sectors that never read
    pub failed_sectors: Vec<SectorAddress>,

    /// Total bytes written
    pub bytes_written: u64,

    /// Total time elapsed
    pub elapsed: Duration,
}

impl ImagingReport {
    /// Whether every sector was read
    pub fn is_clean(&self) -> bool {
        self.failed_sectors.is_empty()
    }
}

/// Event callback type
pub type EventCallback = Box<dyn Fn(&ImagingEvent, &ImagingProgress) + Send + Sync>;

/// Imaging engine
pub struct Imager {
    config: ImagingConfig,
    event_callback: Option<EventCallback>,
    abort: AbortHandle,
}

impl Imager {
    /// Create an imager with default configuration
    pub fn new() -> Self {
        Self::with_config(ImagingConfig::default())
    }

    /// Create an imager with custom configuration
    pub fn with_config(config: ImagingConfig) -> Self {
        Self {
            config,
            event_callback: None,
            abort: AbortHandle::new(),
        }
    }

    /// Set a per-unit event callback
    pub fn on_event<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ImagingEvent, &ImagingProgress) + Send + Sync + 'static,
    {
        self.event_callback = Some(Box::new(callback));
        self
    }

    /// Use an existing abort handle (e.g. one a signal handler holds)
    pub fn with_abort_handle(mut self, handle: AbortHandle) -> Self {
        self.abort = handle;
        self
    }

    /// Image the drive described by `session` from `device`
    ///
    /// The session is consumed; its output and log are closed on return
    /// whatever the outcome.
    ///
    /// # Returns
    /// * `Ok(ImagingReport)` - every track was visited
    /// * `Err(Error::WriteFailed)` - the destination rejected data
    /// * `Err(Error::AbortedByUser)` - the abort handle was triggered
    pub fn run<D, W, L>(&self, device: &mut D, mut session: Session<W, L>) -> Result<ImagingReport>
    where
        D: SectorDevice + ?Sized,
        W: Write,
        L: Write,
    {
        self.config.validate()?;
        session.geometry.validate()?;

        let start_time = Instant::now();
        session.log.session_started(
            &session.destination,
            session.drive,
            &session.geometry,
        )?;

        tracing::info!(
            "Imaging drive {} (CHS {}) to {}",
            session.drive,
            session.geometry,
            session.destination
        );

        let mut report = ImagingReport::default();
        let result = self.copy_all(device, &mut session, &mut report, start_time);
        report.elapsed = start_time.elapsed();

        match result {
            Ok(()) => {
                if self.config.sync_on_complete {
                    session.output.flush()?;
                }
                session.log.session_finished(&session.destination)?;
                tracing::info!(
                    "Done: {} bytes, {} failed sectors",
                    report.bytes_written,
                    report.failed_sectors.len()
                );
                Ok(report)
            }
            Err(Error::AbortedByUser) => {
                if let Err(e) = session.output.flush() {
                    tracing::warn!("Failed to flush output on abort: {}", e);
                }
                if let Err(e) = session.log.aborted() {
                    tracing::warn!("Failed to record abort in log: {}", e);
                }
                tracing::info!("Aborted after {} bytes", report.bytes_written);
                Err(Error::AbortedByUser)
            }
            Err(e) => {
                if let Err(log_err) = session.log.write_failed(&e) {
                    tracing::warn!("Failed to record failure in log: {}", log_err);
                }
                Err(e)
            }
        }
    }

    fn copy_all<D, W, L>(
        &self,
        device: &mut D,
        session: &mut Session<W, L>,
        report: &mut ImagingReport,
        start_time: Instant,
    ) -> Result<()>
    where
        D: SectorDevice + ?Sized,
        W: Write,
        L: Write,
    {
        let geometry = session.geometry;
        let sector_size = self.config.sector_size;
        let mut buffer = vec![0u8; geometry.track_bytes(sector_size)];
        let mut progress = ImagingProgress::new(&geometry, sector_size);
        let mut speed_tracker = SpeedTracker::new();

        for cylinder in 0..geometry.cylinders {
            for head in 0..geometry.heads {
                self.check_abort()?;

                match self.copy_track(device, session, &mut buffer, cylinder, head) {
                    Ok(CopyOutcome::WriteFailed(source)) => {
                        return Err(Error::WriteFailed {
                            cylinder,
                            head,
                            source,
                        });
                    }
                    Ok(_) => {
                        session.log.track_ok(cylinder, head)?;
                        report.tracks_copied += 1;
                        progress.bytes_written += buffer.len() as u64;
                        self.emit(&ImagingEvent::TrackCopied { cylinder, head }, &progress);
                    }
                    Err(e) => {
                        tracing::debug!(
                            "Track {},{} unreadable ({}), copying by sector",
                            cylinder,
                            head,
                            e
                        );
                        self.emit(&ImagingEvent::TrackReadFailed { cylinder, head }, &progress);
                        self.copy_sectors(
                            device,
                            session,
                            &mut buffer,
                            cylinder,
                            head,
                            report,
                            &mut progress,
                        )?;
                        report.tracks_recovered += 1;
                    }
                }

                progress.tracks_done += 1;
                report.bytes_written = progress.bytes_written;
                progress.elapsed = start_time.elapsed();
                speed_tracker.update(progress.bytes_written);
                progress.speed_bps = speed_tracker.current_speed();
                progress.eta_seconds = calculate_eta(
                    progress.bytes_written,
                    progress.total_bytes,
                    progress.speed_bps,
                );
            }
        }

        Ok(())
    }

    /// Copy one track with a single read
    ///
    /// The error is the failed read, telling the caller to fall back.
    fn copy_track<D, W, L>(
        &self,
        device: &mut D,
        session: &mut Session<W, L>,
        buffer: &mut [u8],
        cylinder: u32,
        head: u32,
    ) -> io::Result<CopyOutcome>
    where
        D: SectorDevice + ?Sized,
        W: Write,
        L: Write,
    {
        device.read_track(session.drive, cylinder, head, buffer)?;

        Ok(match session.write_unit(buffer) {
            Ok(()) => CopyOutcome::Success,
            Err(e) => CopyOutcome::WriteFailed(e),
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn copy_sectors<D, W, L>(
        &self,
        device: &mut D,
        session: &mut Session<W, L>,
        buffer: &mut [u8],
        cylinder: u32,
        head: u32,
        report: &mut ImagingReport,
        progress: &mut ImagingProgress,
    ) -> Result<()>
    where
        D: SectorDevice + ?Sized,
        W: Write,
        L: Write,
    {
        let sector_size = self.config.sector_size;

        for sector in 1..=session.geometry.sectors {
            self.check_abort()?;

            let address = SectorAddress {
                cylinder,
                head,
                sector,
            };
            let sector_buf = &mut buffer[..sector_size];

            match self.copy_sector(device, session, sector_buf, address, report, progress)? {
                CopyOutcome::Success => {
                    progress.bytes_written += sector_size as u64;
                    self.emit(&ImagingEvent::SectorCopied(address), progress);
                }
                CopyOutcome::FailedAfterRetries { position, attempts } => {
                    progress.bytes_written += sector_size as u64;
                    report.failed_sectors.push(position);
                    self.emit(
                        &ImagingEvent::SectorFailed {
                            address: position,
                            attempts,
                        },
                        progress,
                    );
                }
                CopyOutcome::WriteFailed(source) => {
                    return Err(Error::WriteFailed {
                        cylinder,
                        head,
                        source,
                    });
                }
            }
        }

        Ok(())
    }

    /// Read one sector with retries, log the outcome and write it
    fn copy_sector<D, W, L>(
        &self,
        device: &mut D,
        session: &mut Session<W, L>,
        buffer: &mut [u8],
        address: SectorAddress,
        report: &mut ImagingReport,
        progress: &ImagingProgress,
    ) -> Result<CopyOutcome>
    where
        D: SectorDevice + ?Sized,
        W: Write,
        L: Write,
    {
        let drive = session.drive;
        let SectorAddress {
            cylinder,
            head,
            sector,
        } = address;

        let mut attempts = 1;
        let mut result = device.read_sector(drive, cylinder, head, sector, buffer);
        let mut retry = 0;

        while result.is_err() && retry < self.config.retry_attempts {
            retry += 1;
            self.emit(
                &ImagingEvent::SectorRetry {
                    address,
                    attempt: retry,
                },
                progress,
            );
            device.reset_controller(drive);
            result = device.read_sector(drive, cylinder, head, sector, buffer);
            attempts += 1;
        }

        let outcome = match result {
            Ok(()) => {
                session.log.sector_ok(address)?;
                if retry > 0 {
                    report.sectors_recovered += 1;
                }
                CopyOutcome::Success
            }
            Err(e) => {
                tracing::warn!(
                    "{} ({})",
                    Error::ReadFailed {
                        cylinder,
                        head,
                        sector,
                        attempts,
                    },
                    e
                );
                session.log.sector_err(address)?;
                CopyOutcome::FailedAfterRetries {
                    position: address,
                    attempts,
                }
            }
        };

        // Written regardless of the read result to keep the image aligned
        if let Err(e) = session.write_unit(buffer) {
            return Ok(CopyOutcome::WriteFailed(e));
        }

        Ok(outcome)
    }

    fn check_abort(&self) -> Result<()> {
        if self.abort.is_aborted() {
            Err(Error::AbortedByUser)
        } else {
            Ok(())
        }
    }

    fn emit(&self, event: &ImagingEvent, progress: &ImagingProgress) {
        if let Some(ref callback) = self.event_callback {
            callback(event, progress);
        }
    }
}

impl Default for Imager {
    fn default() -> Self {
        Self::new()
    }
}

/// Speed tracking with smoothing
struct SpeedTracker {
    samples: Vec<(Instant, u64)>,
    max_samples: usize,
}

impl SpeedTracker {
    fn new() -> Self {
        Self {
            samples: Vec::with_capacity(10),
            max_samples: 10,
        }
    }

    fn update(&mut self, bytes_written: u64) {
        if self.samples.len() >= self.max_samples {
            self.samples.remove(0);
        }
        self.samples.push((Instant::now(), bytes_written));
    }

    fn current_speed(&self) -> u64 {
        let (Some(first), Some(last)) = (self.samples.first(), self.samples.last()) else {
            return 0;
        };

        let duration = last.0.duration_since(first.0);
        let bytes = last.1.saturating_sub(first.1);

        if duration.as_millis() > 0 {
            (bytes as f64 / duration.as_secs_f64()) as u64
        } else {
            0
        }
    }
}

/// Calculate estimated time remaining
fn calculate_eta(bytes_written: u64, total_bytes: u64, speed_bps: u64) -> Option<u64> {
    if speed_bps == 0 || bytes_written >= total_bytes {
        return None;
    }

    let remaining = total_bytes.saturating_sub(bytes_written);
    Some(remaining / speed_bps)
}

/// Format speed for display
pub fn format_speed(bytes_per_second: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes_per_second >= MB {
        format!("{:.1} MB/s", bytes_per_second as f64 / MB as f64)
    } else if bytes_per_second >= KB {
        format!("{:.1} KB/s", bytes_per_second as f64 / KB as f64)
    } else {
        format!("{} B/s", bytes_per_second)
    }
}

/// Format duration for display
pub fn format_duration(seconds: u64) -> String {
    if seconds >= 3600 {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    } else if seconds >= 60 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else {
        format!("{}s", seconds)
    }
}

// ============================================================================
// UNIT TESTS
// ============================================================================
