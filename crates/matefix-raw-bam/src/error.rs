use std::collections::TryReserveError;

use thiserror::Error;

/// Failures while editing a [`crate::RawRecord`] in place.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The backing buffer could not grow.
    #[error("Failed to grow record buffer: {0}")]
    Allocation(#[from] TryReserveError),

    /// An auxiliary tag entry has an unknown type or runs past the end of the record.
    #[error("Corrupt auxiliary data at byte {offset} of the tag section")]
    CorruptAuxData { offset: usize },

    /// A CIGAR longer than the 16-bit op count allows.
    #[error("CIGAR has {count} operations; BAM records hold at most 65535")]
    TooManyCigarOps { count: usize },
}
