//! Template-at-a-time mate fixing.
//!
//! [`fix_mates`] drains a [`RecordSource`] one name-grouped template at a time,
//! repairs the mate information of the template's primary alignments, and
//! writes every record to a [`RecordSink`] in input order.

use log::warn;
use matefix_raw_bam::{RawRecord, flags};

use crate::errors::{MatefixError, Result};
use crate::mate::{
    add_mate_scores, add_template_cigar, plausibly_properly_paired, set_insert_sizes, sync_mates,
};
use crate::progress::ProgressTracker;
use crate::sanitize::SanitizeFlags;
use crate::stream::{RecordSink, RecordSource, ReferenceLengths};
use crate::template_reader::TemplateReader;

/// Flags that only make sense on a read whose mate is present and placed.
const PAIRING_FLAGS: u16 = flags::PAIRED | flags::MATE_REVERSE | flags::PROPER_PAIR;

/// Switches for the optional parts of mate fixing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixmateOptions {
    /// Per-record sanitize categories applied at read time.
    pub sanitize: SanitizeFlags,
    /// Drop secondary and unmapped records, and unpair the mates of unmapped reads.
    pub remove_reads: bool,
    /// Clear PROPER_PAIR on pairs that are not in FR orientation.
    pub proper_pair_check: bool,
    /// Write a `ct` tag describing the pair layout.
    pub add_template_cigar: bool,
    /// Write an `ms` tag with the mate's base-quality score.
    pub add_mate_score: bool,
}

impl Default for FixmateOptions {
    fn default() -> Self {
        Self {
            sanitize: SanitizeFlags::default(),
            remove_reads: false,
            proper_pair_check: true,
            add_template_cigar: false,
            add_mate_score: false,
        }
    }
}

/// Counts gathered over a run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FixmateMetrics {
    pub templates: u64,
    pub records_read: u64,
    pub records_written: u64,
    /// Records skipped by `remove_reads`.
    pub records_removed: u64,
    /// Templates with two or more primaries.
    pub paired_templates: u64,
    /// Templates with exactly one primary.
    pub unpaired_templates: u64,
    /// Templates with no primary, written through as-is.
    pub templates_without_primary: u64,
    /// Templates with more than two primaries. Only the first and last are left in sync.
    pub multi_primary_templates: u64,
}

/// Fix every template in `source`, writing the results to `sink`.
///
/// Records are sanitized with `options.sanitize` against `refs` as they are read.
/// Progress is logged every `progress_interval` records.
///
/// # Errors
///
/// Returns [`MatefixError::Read`] or [`MatefixError::Write`] on I/O failure, and a
/// record or allocation error if a record cannot be resized. Records written before
/// the failure stay written.
pub fn fix_mates<S, L, W>(
    source: S,
    refs: L,
    mut sink: W,
    options: &FixmateOptions,
    progress_interval: u64,
) -> Result<FixmateMetrics>
where
    S: RecordSource,
    L: ReferenceLengths,
    W: RecordSink,
{
    let mut reader = TemplateReader::new(source, refs, options.sanitize);
    let progress = ProgressTracker::new("Processed records").with_interval(progress_interval);
    let mut metrics = FixmateMetrics::default();

    while let Some(template) = reader.next_template()? {
        metrics.templates += 1;
        match fix_template(template, options) {
            0 => metrics.templates_without_primary += 1,
            1 => metrics.unpaired_templates += 1,
            n => {
                metrics.paired_templates += 1;
                if n > 2 {
                    metrics.multi_primary_templates += 1;
                }
            }
        }

        for record in template.iter_mut() {
            if options.remove_reads && record.has_any_flag(flags::SECONDARY | flags::UNMAPPED) {
                metrics.records_removed += 1;
                continue;
            }
            record.update_bin();
            sink.write_record(record).map_err(MatefixError::Write)?;
            metrics.records_written += 1;
        }
        progress.record(template.len() as u64);
    }
    progress.log_final();

    metrics.records_read = reader.records_read();
    if metrics.multi_primary_templates > 0 {
        warn!(
            "{} templates had more than two primary alignments; only the first and last primary of each were synchronized",
            metrics.multi_primary_templates
        );
    }
    Ok(metrics)
}

/// Repair mate information among the primary records of one template.
///
/// The first primary is paired in turn with each later primary. A lone primary is
/// marked unpaired. Secondary and supplementary records are left alone.
///
/// Returns the number of primary records.
pub fn fix_template(template: &mut [RawRecord], options: &FixmateOptions) -> usize {
    let Some(first) = template.iter().position(is_primary) else {
        return 0;
    };

    let mut primaries = 1;
    for next in first + 1..template.len() {
        if !is_primary(&template[next]) {
            continue;
        }
        primaries += 1;
        let (pre, cur) = pair_mut(template, first, next);
        fix_pair(pre, cur, options);
    }

    if primaries == 1 {
        mark_unpaired(&mut template[first]);
    }
    primaries
}

fn is_primary(record: &RawRecord) -> bool {
    !record.is_secondary_or_supplementary()
}

/// Mutable references to two distinct slots, `i < j`.
fn pair_mut(records: &mut [RawRecord], i: usize, j: usize) -> (&mut RawRecord, &mut RawRecord) {
    debug_assert!(i < j);
    let (head, tail) = records.split_at_mut(j);
    (&mut head[i], &mut tail[0])
}

fn fix_pair(pre: &mut RawRecord, cur: &mut RawRecord, options: &FixmateOptions) {
    pre.set_flag_bits(flags::PAIRED);
    cur.set_flag_bits(flags::PAIRED);

    sync_mates(pre, cur);
    set_insert_sizes(cur, pre);

    if options.add_template_cigar {
        add_template_cigar(pre, cur);
    }
    if options.proper_pair_check && !plausibly_properly_paired(pre, cur) {
        pre.clear_flag_bits(flags::PROPER_PAIR);
        cur.clear_flag_bits(flags::PROPER_PAIR);
    }
    if options.add_mate_score {
        add_mate_scores(pre, cur);
    }
    if options.remove_reads {
        if pre.is_unmapped() {
            cur.clear_flag_bits(PAIRING_FLAGS);
        }
        if cur.is_unmapped() {
            pre.clear_flag_bits(PAIRING_FLAGS);
        }
    }
}

fn mark_unpaired(record: &mut RawRecord) {
    record.set_mate_ref_id(-1);
    record.set_mate_pos(-1);
    record.set_template_length(0);
    record.clear_flag_bits(PAIRING_FLAGS);
}
