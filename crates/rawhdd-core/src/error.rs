//! Error types for the rawhdd core library

use thiserror::Error;

/// Main error type for imaging operations
#[derive(Error, Debug)]
pub enum Error {
    /// The controller geometry query failed outright
    #[error("Unable to read drive geometry: {0}")]
    GeometryUnavailable(String),

    /// A geometry field is still zero after overrides were applied
    #[error("Can't continue without geometry information (CHS: {cylinders},{heads},{sectors})")]
    IncompleteGeometry {
        /// Cylinder count
        cylinders: u32,
        /// Head count
        heads: u32,
        /// Sectors per track
        sectors: u32,
    },

    /// The destination could not take the bytes handed to it
    #[error("Write failed at cylinder {cylinder}, head {head}: {source}")]
    WriteFailed {
        /// Cylinder being written
        cylinder: u32,
        /// Head being written
        head: u32,
        /// The underlying error
        #[source]
        source: std::io::Error,
    },

    /// A sector read failed after exhausting every retry
    ///
    /// Never fatal; the engine records it in the activity log and moves on.
    #[error("Error reading CHS {cylinder},{head},{sector} after {attempts} attempts")]
    ReadFailed {
        /// Cylinder
        cylinder: u32,
        /// Head
        head: u32,
        /// Sector (1-based)
        sector: u32,
        /// Number of read attempts made
        attempts: u32,
    },

    /// The operator interrupted the session
    #[error("Aborted by user")]
    AbortedByUser,

    /// IO error opening or closing session files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias using the rawhdd error type
pub type Result<T> = std::result::Result<T, Error>;
