//! Operator abort handling
//!
//! The signal handler only raises a flag. The imaging loop polls it before
//! every unit of work and unwinds through [`crate::Error::AbortedByUser`],
//! letting ownership close the output and log wherever that happens.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared abort flag
///
/// Clones observe the same flag, so one clone can live in a signal handler
/// while another is checked by the imaging loop.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    flag: Arc<AtomicBool>,
}

impl AbortHandle {
    /// Create a handle that has not been triggered
    pub fn new() -> Self {
        Self::default()
    }

    /// Request an abort
    pub fn abort(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Check whether an abort was requested
    pub fn is_aborted(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
