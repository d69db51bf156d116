//! Probe command - shows both geometry readings for a drive

use anyhow::{Context, Result};
use console::style;
use humansize::{format_size, BINARY};
use serde::Serialize;
use std::path::PathBuf;

use rawhdd_core::{geometry, DriveSelector, Geometry, GeometrySource, SECTOR_SIZE};
use rawhdd_platform::{drive_path, BlockGeometrySource};

/// What the system reports about a drive
#[derive(Debug, Serialize)]
struct ProbeReport {
    drive: u8,
    drive_code: Option<u8>,
    device: String,
    table_cylinders: u32,
    table_heads: u32,
    controller: Geometry,
    geometry: Geometry,
    mismatch: bool,
    total_bytes: u64,
}

/// Execute the probe command
pub fn execute(drive: u8, device: Option<PathBuf>, json: bool) -> Result<()> {
    let drive = DriveSelector::new(drive);
    let device_path = device
        .clone()
        .unwrap_or_else(|| PathBuf::from(drive_path(drive)));

    let mut source = match device {
        Some(path) => BlockGeometrySource::with_device(path),
        None => BlockGeometrySource::new(),
    };

    let report = probe(&mut source, drive, device_path.display().to_string())
        .with_context(|| format!("Failed to probe {}", device_path.display()))?;

    if json {
        let output =
            serde_json::to_string_pretty(&report).context("Failed to serialize probe report")?;
        println!("{}", output);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn probe<G: GeometrySource + ?Sized>(
    source: &mut G,
    drive: DriveSelector,
    device: String,
) -> rawhdd_core::Result<ProbeReport> {
    let readings = geometry::read_geometry(source, drive)?;
    let (geometry, mismatch) = geometry::reconcile_readings(&readings);

    Ok(ProbeReport {
        drive: drive.index(),
        drive_code: drive.bios_code(),
        device,
        table_cylinders: readings.table.cylinders,
        table_heads: readings.table.heads,
        controller: readings.controller.decode(),
        geometry,
        mismatch,
        total_bytes: geometry.total_bytes(SECTOR_SIZE),
    })
}

fn print_report(report: &ProbeReport) {
    let code = report
        .drive_code
        .map(|code| format!(" [{:#04x}]", code))
        .unwrap_or_default();
    println!(
        "{} {}{} ({})",
        style("Drive").bold(),
        report.drive,
        code,
        style(&report.device).cyan()
    );
    println!(
        "  Parameter table: {} cylinders, {} heads",
        report.table_cylinders, report.table_heads
    );
    println!("  Controller:      CHS {}", report.controller);
    println!(
        "  {} CHS {} ({})",
        style("Using:").bold(),
        report.geometry,
        format_size(report.total_bytes, BINARY)
    );

    if report.mismatch {
        println!(
            "  {} Possible geometry mismatch, proceed at your own risk",
            style("⚠").yellow().bold()
        );
    }
}
