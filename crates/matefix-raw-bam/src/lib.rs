//! Owned raw BAM records with in-place field, CIGAR and auxiliary tag editing.
//!
//! Records are kept as the on-disk bytes so they can be decoded and re-encoded
//! without a parse step, and so that edits touch only the bytes that change.

#![deny(unsafe_code)]

pub mod cigar;
pub mod error;
pub mod fields;
pub mod record;
pub mod tags;

#[cfg(any(test, feature = "test-utils"))]
pub mod testutil;

// Flat re-exports: callers use matefix_raw_bam::RawRecord, matefix_raw_bam::flags etc.
pub use cigar::*;
pub use error::*;
pub use fields::*;
pub use record::*;
pub use tags::*;

#[cfg(any(test, feature = "test-utils"))]
pub use testutil::*;
