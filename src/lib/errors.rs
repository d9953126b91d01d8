//! Custom error types for matefix operations.

use std::io;

use matefix_raw_bam::RecordError;
use thiserror::Error;

/// Result type alias for matefix operations
pub type Result<T> = std::result::Result<T, MatefixError>;

/// Error type for matefix operations
#[derive(Error, Debug)]
pub enum MatefixError {
    /// A `--sanitize` keyword that names no fix category
    #[error("Unrecognised sanitize keyword: '{keyword}'")]
    InvalidSanitizeKeyword {
        /// The offending keyword
        keyword: String,
    },

    /// The input header declares coordinate sort order
    #[error("Coordinate-sorted input is not supported; sort by name or use unsorted input")]
    CoordinateSorted,

    /// Decoding the next record failed (not a clean end of stream)
    #[error("Couldn't read from input file")]
    Read(#[source] io::Error),

    /// Encoding a record failed
    #[error("Couldn't write to output file")]
    Write(#[source] io::Error),

    /// A record could not be edited in place
    #[error("Failed to update record '{name}'")]
    Record {
        /// Read name of the record being edited
        name: String,
        /// What went wrong
        #[source]
        source: RecordError,
    },

    /// The template buffer could not grow
    #[error("Failed to grow the template buffer: {0}")]
    Allocation(#[from] std::collections::TryReserveError),

    /// File format error
    #[error("Invalid {file_type} file '{path}': {reason}")]
    InvalidFileFormat {
        /// Type of file (e.g., "BAM")
        file_type: String,
        /// Path to the file
        path: String,
        /// Explanation of the problem
        reason: String,
    },
}

impl MatefixError {
    /// Wrap a [`RecordError`] with the name of the record it happened on.
    #[must_use]
    pub fn record(name: &[u8], source: RecordError) -> Self {
        Self::Record { name: String::from_utf8_lossy(name).into_owned(), source }
    }

    /// The `index`-th decoded record is shorter than its own length fields claim.
    #[must_use]
    pub fn truncated_record(index: u64, len: usize) -> Self {
        Self::Read(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("record {index} is truncated ({len} bytes)"),
        ))
    }
}
