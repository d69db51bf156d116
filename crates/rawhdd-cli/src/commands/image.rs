//! Image command - copies a drive into an image file
//!
//! This is the main functionality of rawhdd. It handles:
//! - Geometry detection and command line overrides
//! - User confirmation
//! - Imaging with progress display
//! - Reporting unreadable sectors

use anyhow::{Context, Result};
use console::style;
use dialoguer::Confirm;
use humansize::{format_size, BINARY};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rawhdd_core::{
    geometry, AbortHandle, DriveSelector, Error, GeometryOverrides, Imager, ImagingReport,
    Reconciliation, Session, Settings,
};
use rawhdd_platform::{drive_path, has_elevated_privileges, BlockGeometrySource, DeviceSource};

use crate::progress::ImagingDisplay;

/// Exit status when the operator declines at the confirmation prompt
pub const EXIT_DECLINED: i32 = 2;

/// Exit status when the operator aborts imaging
pub const EXIT_ABORTED: i32 = 130;

/// Arguments for the image command
pub struct ImageArgs {
    pub destination: PathBuf,
    pub drive: u8,
    pub cylinders: Option<u32>,
    pub heads: Option<u32>,
    pub sectors: Option<u32>,
    pub device: Option<PathBuf>,
    pub log: Option<PathBuf>,
    pub retries: Option<u32>,
    pub skip_confirm: bool,
    pub quiet: bool,
    pub abort: AbortHandle,
}

impl ImageArgs {
    fn overrides(&self) -> GeometryOverrides {
        GeometryOverrides {
            cylinders: self.cylinders,
            heads: self.heads,
            sectors: self.sectors,
            drive: Some(DriveSelector::new(self.drive)),
        }
    }
}

/// How an image command ended without a fatal error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageStatus {
    /// Every track was visited
    Completed,
    /// The operator said no at the prompt
    Declined,
    /// The operator pressed Ctrl+C
    Aborted,
}

impl ImageStatus {
    /// Process exit status for this outcome
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Completed => 0,
            Self::Declined => EXIT_DECLINED,
            Self::Aborted => EXIT_ABORTED,
        }
    }
}

/// Conditionally println based on quiet mode
macro_rules! println_if {
    ($quiet:expr) => {
        if !$quiet {
            println!();
        }
    };
    ($quiet:expr, $($arg:tt)*) => {
        if !$quiet {
            println!($($arg)*);
        }
    };
}

/// Execute the image command
pub fn execute(args: ImageArgs) -> Result<ImageStatus> {
    execute_with_settings(args, &Settings::load())
}

fn execute_with_settings(args: ImageArgs, settings: &Settings) -> Result<ImageStatus> {
    let quiet = args.quiet || settings.behavior.quiet;
    let skip_confirm = args.skip_confirm || settings.behavior.skip_confirmation;
    let log_path = args
        .log
        .clone()
        .unwrap_or_else(|| settings.imaging.log_file.clone());
    let config = settings
        .imaging
        .to_config()
        .retry_attempts(args.retries.unwrap_or(settings.imaging.retry_attempts));

    let overrides = args.overrides();
    let drive = overrides.drive.unwrap_or_default();
    let device_path = args
        .device
        .clone()
        .unwrap_or_else(|| PathBuf::from(drive_path(drive)));

    // Step 1: Work out the geometry
    let mut geometry_source = match &args.device {
        Some(path) => BlockGeometrySource::with_device(path.clone()),
        None => BlockGeometrySource::new(),
    };
    let chs = geometry::resolve(&mut geometry_source, drive, &overrides)
        .context("Failed to determine drive geometry")?;
    tracing::debug!(
        "Resolved geometry {} (mismatch={}, overridden={})",
        chs.geometry,
        chs.mismatch,
        chs.overridden
    );

    if chs.overridden {
        println_if!(quiet, "{}", style("Using command line drive geometry").cyan());
    }
    if chs.mismatch {
        eprintln!(
            "{} Possible geometry mismatch, proceed at your own risk",
            style("Warning:").yellow().bold()
        );
    }

    print_summary(&chs, drive, &device_path, &args.destination, &log_path, quiet);

    if args.device.is_none() && !has_elevated_privileges() {
        eprintln!(
            "{} Reading a whole drive usually needs elevated privileges",
            style("Warning:").yellow()
        );
    }

    // Step 2: Confirmation
    if !skip_confirm {
        println!();
        let proceed = confirmation(drive, &args.destination).interact()?;

        if !proceed {
            tracing::debug!("Operator declined imaging of drive {}", drive);
            println!("{}", style("Aborted.").yellow());
            return Ok(ImageStatus::Declined);
        }
    }

    // Step 3: Open the drive, the destination and the log
    let mut source = DeviceSource::open(&device_path, chs.geometry)
        .with_context(|| format!("Failed to open device: {}", device_path.display()))?;

    let session = Session::create(&args.destination, &log_path, drive, chs.geometry)
        .with_context(|| {
            format!(
                "Failed to open {} or {}",
                args.destination.display(),
                log_path.display()
            )
        })?;

    // Step 4: Image with progress
    println_if!(quiet, "\n{}", style("Imaging drive...").bold());

    let display = Arc::new(ImagingDisplay::new(&chs.geometry, quiet));
    let display_clone = Arc::clone(&display);
    let imager = Imager::with_config(config)
        .with_abort_handle(args.abort.clone())
        .on_event(move |event, progress| display_clone.handle(event, progress));

    match imager.run(&mut source, session) {
        Ok(report) => {
            display.finish();
            print_report(&report, &log_path, quiet);
            Ok(ImageStatus::Completed)
        }
        Err(Error::AbortedByUser) => {
            display.abandon();
            eprintln!("\n{}", style("Aborted by user!").yellow().bold());
            Ok(ImageStatus::Aborted)
        }
        Err(e) => {
            display.abandon();
            Err(anyhow::Error::new(e).context("Imaging failed"))
        }
    }
}

/// Prompt shown before imaging starts; ENTER accepts
fn confirmation(drive: DriveSelector, destination: &Path) -> Confirm<'static> {
    Confirm::new()
        .with_prompt(confirmation_prompt(drive, destination))
        .default(PROCEED_BY_DEFAULT)
}

/// Answer taken when the operator just presses ENTER
const PROCEED_BY_DEFAULT: bool = true;

fn confirmation_prompt(drive: DriveSelector, destination: &Path) -> String {
    format!(
        "Image drive {} to {}? Press ENTER to continue",
        drive,
        destination.display()
    )
}

fn print_summary(
    chs: &Reconciliation,
    drive: DriveSelector,
    device_path: &Path,
    destination: &Path,
    log_path: &Path,
    quiet: bool,
) {
    let geometry = chs.geometry;
    println_if!(
        quiet,
        "{} {} ({})",
        style("Drive:").bold(),
        drive,
        style(device_path.display()).cyan()
    );
    println_if!(quiet, "  CHS: {}", geometry);
    println_if!(
        quiet,
        "  Image size: {} ({} sectors)",
        format_size(geometry.total_bytes(rawhdd_core::SECTOR_SIZE), BINARY),
        geometry.total_sectors()
    );
    println_if!(
        quiet,
        "{} {}",
        style("Destination:").bold(),
        style(destination.display()).cyan()
    );
    println_if!(quiet, "  Log: {}", log_path.display());
}

fn print_report(report: &ImagingReport, log_path: &Path, quiet: bool) {
    let secs = report.elapsed.as_secs_f64();
    let speed = if secs > 0.0 {
        (report.bytes_written as f64 / secs) as u64
    } else {
        0
    };

    println_if!(
        quiet,
        "  {} Imaged {} in {:.1}s ({}/s)",
        style("✓").green(),
        format_size(report.bytes_written, BINARY),
        secs,
        format_size(speed, BINARY)
    );

    if report.tracks_recovered > 0 {
        println_if!(
            quiet,
            "  {} {} tracks read sector by sector, {} sectors recovered after retries",
            style("ℹ").blue(),
            report.tracks_recovered,
            report.sectors_recovered
        );
    }

    if !report.is_clean() {
        eprintln!(
            "  {} {} unreadable sectors, see {}",
            style("⚠").yellow().bold(),
            report.failed_sectors.len(),
            log_path.display()
        );
    }

    println_if!(quiet);
    println_if!(quiet, "{}", style("✓ Image complete!").green().bold());
}
