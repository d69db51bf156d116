//! Runtime configuration for imaging sessions

use crate::error::{Error, Result};
use crate::geometry::SECTOR_SIZE;

/// Default number of retries for a sector that fails to read
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 10;

/// Configuration for an imaging session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagingConfig {
    /// Bytes per sector
    pub sector_size: usize,

    /// Retries after the first failed read of a sector, each preceded by a
    /// controller reset
    pub retry_attempts: u32,

    /// Whether to flush the output when the session completes
    pub sync_on_complete: bool,
}

impl Default for ImagingConfig {
    fn default() -> Self {
        Self {
            sector_size: SECTOR_SIZE,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            sync_on_complete: true,
        }
    }
}

impl ImagingConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set sector size
    pub fn sector_size(mut self, size: usize) -> Self {
        self.sector_size = size;
        self
    }

    /// Set retry attempts
    pub fn retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    /// Set sync on complete
    pub fn sync_on_complete(mut self, sync: bool) -> Self {
        self.sync_on_complete = sync;
        self
    }

    /// Check the config is usable
    pub fn validate(&self) -> Result<()> {
        if self.sector_size == 0 {
            return Err(Error::InvalidConfig(
                "sector size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
