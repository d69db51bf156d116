//! Console progress for imaging sessions
//!
//! A progress bar counts tracks. Tracks that need the sector-by-sector path
//! also get a line of their own: `.` for each good sector and `*` for each
//! failed read attempt, followed by an error line for every sector that
//! never read.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use rawhdd_core::{Geometry, ImagingEvent, ImagingProgress};
use std::sync::Mutex;

/// Progress bar plus the per-sector marks of the track being recovered
pub struct ImagingDisplay {
    bar: ProgressBar,
    sectors: u32,
    marks: Mutex<String>,
}

impl ImagingDisplay {
    /// Create a display for a geometry; hidden when `quiet`
    pub fn new(geometry: &Geometry, quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(geometry.total_tracks())
        };

        let bar_style = ProgressStyle::default_bar()
            .template(
                "  {spinner:.green} Imaging [{bar:40.cyan/blue}] {pos}/{len} tracks {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        bar.set_style(bar_style);

        Self {
            bar,
            sectors: geometry.sectors,
            marks: Mutex::new(String::new()),
        }
    }

    /// Handle one engine event
    pub fn handle(&self, event: &ImagingEvent, progress: &ImagingProgress) {
        match *event {
            ImagingEvent::TrackCopied { cylinder, head } => {
                self.bar.set_position(progress.tracks_done + 1);
                self.bar.set_message(format!(
                    "CH {},{} OK  {}  ETA {}",
                    cylinder,
                    head,
                    progress.speed_display(),
                    progress.eta_display()
                ));
            }
            ImagingEvent::TrackReadFailed { cylinder, head } => {
                self.bar
                    .set_message(format!("CH {},{} reading by sector", cylinder, head));
                self.with_marks(|marks| {
                    marks.clear();
                    marks.push_str(&format!("CH {},{} ", cylinder, head));
                });
            }
            ImagingEvent::SectorCopied(address) => {
                self.with_marks(|marks| marks.push('.'));
                self.end_of_track(address.sector, progress);
            }
            ImagingEvent::SectorRetry { .. } => {
                self.with_marks(|marks| marks.push('*'));
            }
            ImagingEvent::SectorFailed { address, .. } => {
                self.bar.println(
                    style(format!("Error reading CHS {}", address))
                        .red()
                        .to_string(),
                );
                self.end_of_track(address.sector, progress);
            }
        }
    }

    fn with_marks(&self, f: impl FnOnce(&mut String)) {
        if let Ok(mut marks) = self.marks.lock() {
            f(&mut marks);
        }
    }

    fn end_of_track(&self, sector: u32, progress: &ImagingProgress) {
        if sector < self.sectors {
            return;
        }
        self.bar.set_position(progress.tracks_done + 1);
        self.with_marks(|marks| {
            self.bar.println(marks.as_str());
            marks.clear();
        });
    }

    /// Print the marks of a track that was interrupted part way
    fn flush_marks(&self) {
        self.with_marks(|marks| {
            if !marks.is_empty() {
                self.bar.println(marks.as_str());
                marks.clear();
            }
        });
    }

    /// Remove the bar after a completed session
    pub fn finish(&self) {
        self.flush_marks();
        self.bar.finish_and_clear();
    }

    /// Leave the bar where it stopped after an abort or failure
    pub fn abandon(&self) {
        self.flush_marks();
        self.bar.abandon();
    }

    #[cfg(test)]
    fn marks(&self) -> String {
        self.marks.lock().map(|m| m.clone()).unwrap_or_default()
    }
}
