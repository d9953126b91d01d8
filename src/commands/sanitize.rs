//! Repair records whose alignment disagrees with the reference, one record at a time.

use anyhow::Result;
use clap::Parser;
use log::info;

use matefix_lib::bam_io::{create_raw_bam_reader, create_raw_bam_writer};
use matefix_lib::errors::MatefixError;
use matefix_lib::logging::OperationTimer;
use matefix_lib::progress::DEFAULT_PROGRESS_INTERVAL;
use matefix_lib::sanitize::{SanitizeFlags, sanitize_records};

use crate::commands::command::Command;
use crate::commands::common::{BamIoOptions, CompressionOptions, HeaderOptions, ThreadingOptions};

/// Sanitize every record of a BAM.
#[derive(Debug, Parser)]
#[command(
    name = "sanitize",
    about = "\x1b[38;5;166m[UTILITIES]\x1b[0m      \x1b[36mTrim, unmap and clean records that disagree with the reference\x1b[0m",
    long_about = r#"
Sanitize each record of a BAM independently, without mate fixing.

Records are not grouped, so input in any sort order is accepted. The --fix keywords are the
same as for `matefix fixmate --sanitize`. Note that `pos` can move unplaced records to
position -1, which may disturb coordinate sort order; `on` leaves positions alone.

Example usage:
  matefix sanitize -i aligned.bam -o clean.bam
  matefix sanitize -i aligned.bam -o clean.bam --fix cigar,aux
"#
)]
pub struct Sanitize {
    #[command(flatten)]
    pub io: BamIoOptions,

    /// Fixes to apply
    #[arg(short = 'z', long = "fix", default_value = "all")]
    pub fix: SanitizeFlags,

    #[command(flatten)]
    pub header: HeaderOptions,

    #[command(flatten)]
    pub threading: ThreadingOptions,

    #[command(flatten)]
    pub compression: CompressionOptions,
}

impl Command for Sanitize {
    fn execute(&self, command_line: &str) -> Result<()> {
        self.io.validate()?;

        info!("Input: {}", self.io.input.display());
        info!("Output: {}", self.io.output.display());
        info!("Fixes: {}", self.fix);

        let (reader, header) = create_raw_bam_reader(&self.io.input, self.threading.threads)?;
        let header = self.header.apply(header, command_line)?;
        let mut writer = create_raw_bam_writer(
            &self.io.output,
            &header,
            self.threading.threads,
            self.compression.level(),
        )?;

        let timer = OperationTimer::new("Sanitizing records");
        let written =
            sanitize_records(reader, &header, &mut writer, self.fix, DEFAULT_PROGRESS_INTERVAL)?;
        writer.finish().map_err(MatefixError::Write)?;

        timer.log_completion(written);
        Ok(())
    }
}
