//! CLI command implementations for matefix.
//!
//! - [`fixmate`] - fill in mate information for name-grouped BAMs
//! - [`sanitize`] - per-record sanitizing for BAMs in any order

#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::struct_excessive_bools,
    clippy::uninlined_format_args
)]

pub mod command;
pub mod common;
pub mod fixmate;
pub mod sanitize;
