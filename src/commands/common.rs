//! Common CLI options shared across commands.
//!
//! These are composed into command structs with `#[command(flatten)]`.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use noodles::sam::Header;

use matefix_lib::bam_io::{DEFAULT_COMPRESSION_LEVEL, is_stdin_path};
use matefix_lib::validation::validate_file_exists;

use crate::version::VERSION;

/// Input/output options for commands that read a BAM and write a BAM.
#[derive(Debug, Clone, Args)]
pub struct BamIoOptions {
    /// Input BAM file, or `-` for stdin
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,

    /// Output BAM file, or `-` for stdout
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,
}

impl BamIoOptions {
    /// Validates that the input file exists (skipped for stdin).
    ///
    /// # Errors
    ///
    /// Returns an error if the input file does not exist.
    pub fn validate(&self) -> Result<()> {
        if !is_stdin_path(&self.input) {
            validate_file_exists(&self.input, "Input BAM")?;
        }
        Ok(())
    }
}

/// BGZF threading options.
#[derive(Debug, Clone, Args)]
pub struct ThreadingOptions {
    /// Number of BGZF compression/decompression threads (1 = no worker threads)
    #[arg(short = 't', long = "threads", default_value_t = 1)]
    pub threads: usize,
}

impl ThreadingOptions {
    #[must_use]
    pub fn log_message(&self) -> String {
        if self.threads > 1 {
            format!("Using {} BGZF threads", self.threads)
        } else {
            "Single-threaded mode".to_string()
        }
    }
}

/// Options for output compression.
#[derive(Debug, Clone, Args)]
pub struct CompressionOptions {
    /// Compression level for the output BAM (0-9)
    #[arg(long = "compression-level", default_value_t = DEFAULT_COMPRESSION_LEVEL)]
    pub compression_level: u32,

    /// Write uncompressed BAM output, the same as `--compression-level 0`
    #[arg(short = 'u', long = "uncompressed", conflicts_with = "compression_level")]
    pub uncompressed: bool,
}

impl CompressionOptions {
    /// The level to compress output at.
    #[must_use]
    pub fn level(&self) -> u32 {
        if self.uncompressed { 0 } else { self.compression_level }
    }
}

/// Options controlling the output header.
#[derive(Debug, Clone, Default, Args)]
pub struct HeaderOptions {
    /// Do not add a @PG line to the output header
    #[arg(long = "no-pg")]
    pub no_pg: bool,
}

impl HeaderOptions {
    /// Apply the header options to `header`, adding a chained `@PG` record unless disabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the `@PG` record cannot be added.
    pub fn apply(&self, header: Header, command_line: &str) -> Result<Header> {
        if self.no_pg {
            return Ok(header);
        }
        matefix_lib::header::add_pg_record(header, VERSION.as_str(), command_line)
    }
}
