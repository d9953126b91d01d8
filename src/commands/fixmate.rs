//! Fill in mate coordinates, insert sizes and mate flags in a name-grouped BAM.

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use matefix_lib::bam_io::{create_raw_bam_reader, create_raw_bam_writer};
use matefix_lib::errors::MatefixError;
use matefix_lib::fixmate::{FixmateOptions, fix_mates};
use matefix_lib::header::check_sort_order;
use matefix_lib::logging::{OperationTimer, log_fixmate_summary};
use matefix_lib::progress::DEFAULT_PROGRESS_INTERVAL;
use matefix_lib::sanitize::SanitizeFlags;

use crate::commands::command::Command;
use crate::commands::common::{BamIoOptions, CompressionOptions, HeaderOptions, ThreadingOptions};

/// Fix mate information in a name-grouped BAM.
#[derive(Debug, Parser)]
#[command(
    name = "fixmate",
    about = "\x1b[38;5;72m[PAIRING]\x1b[0m        \x1b[36mFill in mate coordinates, ISIZE and mate related flags\x1b[0m",
    long_about = r#"
Fill in mate coordinates, insert sizes and mate related flags from a name-grouped BAM.

Records sharing a read name must be adjacent, as produced by an aligner or by sorting
by query name. Coordinate-sorted input is refused.

For each template, the first primary alignment is paired with the other primary. Each
mate receives the other's reference, position and strand; MQ and MC tags are rewritten;
TLEN is set from the 5' ends of the two reads. A template with a single primary is
marked unpaired. Secondary and supplementary alignments are written unchanged.

Records are sanitized as they are read (see --sanitize). Keywords, comma separated:
  pos    clear the position of records with no reference
  mqual  zero the mapping quality of unmapped records
  unmap  mark records unmapped when their coordinates cannot be right
  cigar  trim CIGARs that run off the reference; drop CIGARs of unmapped records
  aux    drop NM, MD, CG and SM from unmapped records
  on     mqual,unmap,cigar,aux
  all    every fix (the default)
  none   no fixes

Example usage:
  matefix fixmate -i name_grouped.bam -o fixed.bam
  matefix fixmate -i - -o fixed.bam -r -c -m --sanitize on
"#
)]
pub struct Fixmate {
    #[command(flatten)]
    pub io: BamIoOptions,

    /// Remove unmapped and secondary reads
    #[arg(short = 'r', long = "remove-reads")]
    pub remove_reads: bool,

    /// Do not clear the proper-pair flag on pairs that are not in FR orientation
    #[arg(short = 'p', long = "no-proper-pair-check")]
    pub no_proper_pair_check: bool,

    /// Add a template cigar (ct) tag to the leftmost read of each pair
    #[arg(short = 'c', long = "template-cigar")]
    pub template_cigar: bool,

    /// Add a mate score (ms) tag, for use by duplicate marking
    #[arg(short = 'm', long = "mate-score")]
    pub mate_score: bool,

    /// Sanitize fixes to apply to every record
    #[arg(short = 'z', long = "sanitize", default_value = "all")]
    pub sanitize: SanitizeFlags,

    #[command(flatten)]
    pub header: HeaderOptions,

    #[command(flatten)]
    pub threading: ThreadingOptions,

    #[command(flatten)]
    pub compression: CompressionOptions,
}

impl Fixmate {
    fn options(&self) -> FixmateOptions {
        FixmateOptions {
            sanitize: self.sanitize,
            remove_reads: self.remove_reads,
            proper_pair_check: !self.no_proper_pair_check,
            add_template_cigar: self.template_cigar,
            add_mate_score: self.mate_score,
        }
    }
}

impl Command for Fixmate {
    fn execute(&self, command_line: &str) -> Result<()> {
        self.io.validate()?;
        let options = self.options();

        info!("Input: {}", self.io.input.display());
        info!("Output: {}", self.io.output.display());
        info!("Sanitize: {}", options.sanitize);
        if options.remove_reads {
            info!("Removing unmapped and secondary reads");
        }
        info!("{}", self.threading.log_message());

        let (reader, header) = create_raw_bam_reader(&self.io.input, self.threading.threads)?;
        check_sort_order(&header)
            .with_context(|| format!("Cannot fix mates in {}", self.io.input.display()))?;

        let header = self.header.apply(header, command_line)?;
        let mut writer = create_raw_bam_writer(
            &self.io.output,
            &header,
            self.threading.threads,
            self.compression.level(),
        )?;

        let timer = OperationTimer::new("Fixing mate information");
        let metrics = fix_mates(reader, &header, &mut writer, &options, DEFAULT_PROGRESS_INTERVAL)?;
        writer.finish().map_err(MatefixError::Write)?;

        log_fixmate_summary(&metrics);
        timer.log_completion(metrics.records_read);
        Ok(())
    }
}
