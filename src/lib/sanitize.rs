//! Per-record reconciliation of position, CIGAR, mapping quality and tags.
//!
//! Aligners and upstream tools occasionally emit records that disagree with
//! themselves or with the reference: an alignment hanging off the end of a
//! contig, a position on an unplaced read, a CIGAR or `NM` left on an
//! unmapped read. [`sanitize`] repairs these according to a set of
//! [`SanitizeFlags`] so that later mate synchronisation sees consistent input.

use std::fmt;
use std::ops::BitOr;
use std::str::FromStr;

use matefix_raw_bam::{CigarTrim, RawRecord, RecordError, flags, trim_cigar_ops};

use crate::errors::MatefixError;
use crate::progress::ProgressTracker;
use crate::stream::{RecordSink, RecordSource, ReferenceLengths};

/// Tags that describe an alignment and are dropped once a record is unmapped.
pub const ALIGNMENT_TAGS: [[u8; 2]; 4] = [*b"NM", *b"MD", *b"CG", *b"SM"];

/// Which categories of fix [`sanitize`] may apply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SanitizeFlags(u8);

impl SanitizeFlags {
    /// Apply nothing.
    pub const NONE: Self = Self(0);
    /// Clear the position of records with no reference.
    pub const POS: Self = Self(1);
    /// Zero the mapping quality of unmapped records.
    pub const MQUAL: Self = Self(1 << 1);
    /// Mark records unmapped when their coordinates cannot be right.
    pub const UNMAP: Self = Self(1 << 2);
    /// Trim CIGARs to the reference and drop them from unmapped records.
    pub const CIGAR: Self = Self(1 << 3);
    /// Drop alignment-describing tags from unmapped records.
    pub const AUX: Self = Self(1 << 4);
    /// Every fix except [`Self::POS`], which can disturb coordinate sort order.
    pub const ON: Self = Self(Self::MQUAL.0 | Self::UNMAP.0 | Self::CIGAR.0 | Self::AUX.0);
    /// Every fix.
    pub const ALL: Self = Self(Self::ON.0 | Self::POS.0);

    const NAMED: [(&'static str, Self); 5] = [
        ("pos", Self::POS),
        ("mqual", Self::MQUAL),
        ("unmap", Self::UNMAP),
        ("cigar", Self::CIGAR),
        ("aux", Self::AUX),
    ];

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl Default for SanitizeFlags {
    fn default() -> Self {
        Self::ALL
    }
}

impl BitOr for SanitizeFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Parses a comma-separated keyword list.
///
/// `all` (or `*`), `on` and `none`/`off` replace whatever came before with their
/// set; `pos`, `mqual`, `unmap`, `cigar` and `aux` add a single category. Empty
/// entries between keywords are skipped, but the list may not end with a comma.
impl FromStr for SanitizeFlags {
    type Err = MatefixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parsed = Self::NONE;
        if s.is_empty() {
            return Ok(parsed);
        }
        let mut keywords = s.split(',').map(str::trim).peekable();
        while let Some(keyword) = keywords.next() {
            if keyword.is_empty() && keywords.peek().is_some() {
                continue;
            }
            parsed = match keyword {
                "all" | "*" => Self::ALL,
                "none" | "off" => Self::NONE,
                "on" => Self::ON,
                other => match Self::NAMED.iter().find(|(name, _)| *name == other) {
                    Some(&(_, category)) => parsed | category,
                    None => {
                        return Err(MatefixError::InvalidSanitizeKeyword {
                            keyword: other.to_string(),
                        });
                    }
                },
            };
        }
        Ok(parsed)
    }
}

impl fmt::Display for SanitizeFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let names: Vec<&str> =
            Self::NAMED.iter().filter(|(_, c)| self.contains(*c)).map(|(name, _)| *name).collect();
        f.write_str(&names.join(","))
    }
}

/// Repair `record` in place using the enabled categories in `fix`.
///
/// Runs in three stages:
/// 1. a record with no reference loses its position;
/// 2. a mapped record is unmapped if it starts outside its reference, or has
///    its CIGAR trimmed if it runs off the end;
/// 3. an unmapped record loses its CIGAR, mapping quality and [`ALIGNMENT_TAGS`].
///
/// # Errors
///
/// Returns a [`RecordError`] if the CIGAR cannot be resized or the tag section is corrupt.
pub fn sanitize<L>(record: &mut RawRecord, refs: &L, fix: SanitizeFlags) -> Result<(), RecordError>
where
    L: ReferenceLengths + ?Sized,
{
    if fix.contains(SanitizeFlags::POS) && record.ref_id() < 0 {
        record.set_pos(-1);
        if fix.contains(SanitizeFlags::UNMAP) {
            record.set_flag_bits(flags::UNMAPPED);
        }
    }

    if fix.contains(SanitizeFlags::CIGAR) && !record.is_unmapped() {
        if record.pos() < 0 && fix.contains(SanitizeFlags::UNMAP) {
            record.set_flag_bits(flags::UNMAPPED);
        } else {
            let ref_len = refs.reference_length(record.ref_id());
            if i64::from(record.pos()) >= ref_len && fix.contains(SanitizeFlags::UNMAP) {
                record.set_flag_bits(flags::UNMAPPED);
                if fix.contains(SanitizeFlags::POS) {
                    record.set_ref_id(-1);
                    record.set_pos(-1);
                }
            } else if record.alignment_end() > ref_len {
                trim_to_reference(record, ref_len)?;
            }
        }
    }

    if record.is_unmapped() {
        if fix.contains(SanitizeFlags::CIGAR) {
            record.clear_cigar();
        }
        if fix.contains(SanitizeFlags::MQUAL) {
            record.set_mapq(0);
        }
        if fix.contains(SanitizeFlags::AUX) {
            record.retain_tags(|key| !ALIGNMENT_TAGS.contains(key))?;
        }
    }

    Ok(())
}

/// Trim the alignment so it consumes no reference at or beyond `end`.
///
/// If the alignment only starts past `end` the record is marked unmapped and
/// loses its proper-pair flag; its CIGAR is left for the caller to discard.
///
/// # Errors
///
/// Returns a [`RecordError`] if the CIGAR region cannot be resized.
pub fn trim_to_reference(record: &mut RawRecord, end: i64) -> Result<(), RecordError> {
    match trim_cigar_ops(&record.cigar_ops(), i64::from(record.pos()), end) {
        CigarTrim::Untouched => {}
        CigarTrim::Trimmed(ops) => record.replace_cigar_ops(&ops)?,
        CigarTrim::OffReference => {
            record.set_flag_bits(flags::UNMAPPED);
            record.clear_flag_bits(flags::PROPER_PAIR);
        }
    }
    Ok(())
}

/// Sanitize each record of `source` on its own and write it to `sink`.
///
/// Unlike mate fixing this needs no name grouping, so any sort order is fine.
/// Returns the number of records written.
///
/// # Errors
///
/// Returns [`MatefixError::Read`] or [`MatefixError::Write`] on I/O failure, or a
/// record error if a record cannot be repaired.
pub fn sanitize_records<S, L, W>(
    mut source: S,
    refs: &L,
    mut sink: W,
    fix: SanitizeFlags,
    progress_interval: u64,
) -> crate::errors::Result<u64>
where
    S: RecordSource,
    L: ReferenceLengths + ?Sized,
    W: RecordSink,
{
    let progress = ProgressTracker::new("Sanitized records").with_interval(progress_interval);
    let mut record = RawRecord::new();
    while source.read_record(&mut record).map_err(MatefixError::Read)? {
        if !record.is_well_formed() {
            return Err(MatefixError::truncated_record(progress.count() + 1, record.len()));
        }
        sanitize(&mut record, refs, fix).map_err(|e| MatefixError::record(record.name(), e))?;
        record.update_bin();
        sink.write_record(&record).map_err(MatefixError::Write)?;
        progress.record(1);
    }
    progress.log_final();
    Ok(progress.count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use matefix_raw_bam::{RecordBuilder, format_cigar};
    use rstest::rstest;

    const REFS: [i64; 2] = [70, 10_000];

    fn sanitized(builder: &RecordBuilder, fix: SanitizeFlags) -> RawRecord {
        let mut record = builder.build();
        sanitize(&mut record, &REFS[..], fix).unwrap();
        record
    }

    #[rstest]
    #[case::empty("", SanitizeFlags::NONE)]
    #[case::all("all", SanitizeFlags::ALL)]
    #[case::star("*", SanitizeFlags::ALL)]
    #[case::on("on", SanitizeFlags::ON)]
    #[case::off("off", SanitizeFlags::NONE)]
    #[case::single("cigar", SanitizeFlags::CIGAR)]
    #[case::list("pos,aux", SanitizeFlags::POS | SanitizeFlags::AUX)]
    #[case::spaces("mqual, unmap", SanitizeFlags::MQUAL | SanitizeFlags::UNMAP)]
    #[case::reset_then_add("all,none,aux", SanitizeFlags::AUX)]
    #[case::on_plus_pos("on,pos", SanitizeFlags::ALL)]
    #[case::pos_then_on("pos,on", SanitizeFlags::ON)]
    #[case::aux_then_all("aux,all", SanitizeFlags::ALL)]
    #[case::doubled_comma("pos,,aux", SanitizeFlags::POS | SanitizeFlags::AUX)]
    #[case::leading_comma(",pos", SanitizeFlags::POS)]
    fn test_parse_sanitize_flags(#[case] text: &str, #[case] expected: SanitizeFlags) {
        assert_eq!(text.parse::<SanitizeFlags>().unwrap(), expected);
    }

    #[rstest]
    #[case::unknown("cigars")]
    #[case::trailing_comma("pos,")]
    #[case::only_commas(",,")]
    #[case::wrong_case("ALL")]
    fn test_parse_sanitize_flags_rejects(#[case] text: &str) {
        let err = text.parse::<SanitizeFlags>().unwrap_err();
        assert!(matches!(err, MatefixError::InvalidSanitizeKeyword { .. }));
    }

    #[test]
    fn test_display() {
        assert_eq!(SanitizeFlags::ALL.to_string(), "pos,mqual,unmap,cigar,aux");
        assert_eq!(SanitizeFlags::NONE.to_string(), "none");
        assert_eq!((SanitizeFlags::CIGAR | SanitizeFlags::POS).to_string(), "pos,cigar");
    }

    #[test]
    fn test_valid_record_is_untouched() {
        let builder = RecordBuilder::new("q")
            .mapped(1, 500, "5S90M5S")
            .mapq(60)
            .flags(flags::PAIRED | flags::PROPER_PAIR)
            .string_tag(b"MD", "90")
            .int_tag(b"NM", 0);
        let original = builder.build();
        let record = sanitized(&builder, SanitizeFlags::ALL);
        assert_eq!(record, original);
    }

    #[test]
    fn test_alignment_past_reference_end_is_trimmed() {
        let builder = RecordBuilder::new("q").mapped(0, 0, "100M").mapq(60).int_tag(b"NM", 0);
        let record = sanitized(&builder, SanitizeFlags::ALL);
        assert_eq!(format_cigar(&record.cigar_ops()), "70M30S");
        assert!(!record.is_unmapped());
        assert_eq!(record.mapq(), 60);
        assert_eq!(record.int_tag(b"NM"), Some(0));
        assert_eq!(record.l_seq(), 100);
    }

    #[test]
    fn test_start_past_reference_end_without_unmap_fix() {
        let builder = RecordBuilder::new("q")
            .mapped(0, 80, "10M")
            .mapq(30)
            .flags(flags::PAIRED | flags::PROPER_PAIR);
        let record = sanitized(&builder, SanitizeFlags::CIGAR);
        assert!(record.is_unmapped());
        assert!(!record.has_any_flag(flags::PROPER_PAIR));
        assert_eq!(record.n_cigar_op(), 0);
        // position and mapq are kept when their categories are off
        assert_eq!((record.ref_id(), record.pos(), record.mapq()), (0, 80, 30));
    }

    #[test]
    fn test_start_past_reference_end_is_unmapped_and_unplaced() {
        let builder = RecordBuilder::new("q")
            .mapped(0, 70, "10M")
            .mapq(30)
            .string_tag(b"RG", "A")
            .string_tag(b"MD", "10")
            .int_tag(b"NM", 0);
        let record = sanitized(&builder, SanitizeFlags::ALL);
        assert!(record.is_unmapped());
        assert_eq!((record.ref_id(), record.pos()), (-1, -1));
        assert_eq!(record.n_cigar_op(), 0);
        assert_eq!(record.mapq(), 0);
        assert_eq!(record.aux_data(), b"RGZA\0");
    }

    #[test]
    fn test_unplaced_record_loses_position() {
        let builder = RecordBuilder::new("q").pos(1234).cigar("10M");
        let record = sanitized(&builder, SanitizeFlags::POS | SanitizeFlags::UNMAP);
        assert_eq!(record.pos(), -1);
        assert!(record.is_unmapped());
        // CIGAR category is off, so the CIGAR stays
        assert_eq!(record.n_cigar_op(), 1);
    }

    #[test]
    fn test_negative_position_is_unmapped() {
        let builder = RecordBuilder::new("q").mapped(1, -1, "10M").mapq(12);
        let record = sanitized(&builder, SanitizeFlags::ON);
        assert!(record.is_unmapped());
        assert_eq!(record.n_cigar_op(), 0);
        assert_eq!(record.mapq(), 0);
    }

    #[test]
    fn test_unmapped_record_drops_alignment_tags_only() {
        let builder = RecordBuilder::new("q")
            .ref_id(1)
            .pos(100)
            .flags(flags::UNMAPPED)
            .int_tag(b"NM", 2)
            .string_tag(b"RG", "grp")
            .string_tag(b"MD", "5A4")
            .aux(b"CGB\x49\x01\x00\x00\x00\xa0\x00\x00\x00")
            .int_tag(b"AS", 17)
            .int_tag(b"SM", 37)
            .string_tag(b"BC", "ACGT");
        let before = builder.build().len();
        let record = sanitized(&builder, SanitizeFlags::AUX);

        let mut expected = Vec::new();
        expected.extend_from_slice(b"RGZgrp\0");
        expected.extend_from_slice(b"ASi\x11\x00\x00\x00");
        expected.extend_from_slice(b"BCZACGT\0");
        assert_eq!(record.aux_data(), &expected[..]);
        // NM(7) + MD(7) + CG(12) + SM(7)
        assert_eq!(record.len(), before - 33);
    }

    #[test]
    fn test_unmapped_record_keeps_tags_without_aux_fix() {
        let builder = RecordBuilder::new("q").flags(flags::UNMAPPED).int_tag(b"NM", 2).mapq(9);
        let fix = SanitizeFlags::POS | SanitizeFlags::MQUAL | SanitizeFlags::UNMAP | SanitizeFlags::CIGAR;
        let record = sanitized(&builder, fix);
        assert_eq!(record.int_tag(b"NM"), Some(2));
        assert_eq!(record.mapq(), 0);
    }

    #[test]
    fn test_no_fixes_leaves_inconsistent_record() {
        let builder = RecordBuilder::new("q").mapped(0, 200, "10M").flags(flags::UNMAPPED).mapq(40);
        let original = builder.build();
        assert_eq!(sanitized(&builder, SanitizeFlags::NONE), original);
    }

    #[test]
    fn test_trim_to_reference_start_on_cutoff() {
        let mut record = RecordBuilder::new("q").mapped(0, 60, "20M").build();
        trim_to_reference(&mut record, 70).unwrap();
        assert_eq!(format_cigar(&record.cigar_ops()), "10M10S");

        let mut record = RecordBuilder::new("q").mapped(0, 70, "20M").build();
        trim_to_reference(&mut record, 70).unwrap();
        assert_eq!(format_cigar(&record.cigar_ops()), "20S");
        assert!(!record.is_unmapped());
    }

    #[test]
    fn test_sanitize_reports_corrupt_tags() {
        let mut record = RecordBuilder::new("q").flags(flags::UNMAPPED).aux(b"XXq\x00").build();
        let err = sanitize(&mut record, &REFS[..], SanitizeFlags::AUX).unwrap_err();
        assert!(matches!(err, RecordError::CorruptAuxData { .. }));
    }

    #[test]
    fn test_sanitize_records_repairs_and_rebins_each_record() {
        let records = std::collections::VecDeque::from(vec![
            RecordBuilder::new("a").mapped(0, 0, "100M").build(),
            RecordBuilder::new("b").mapped(0, 80, "10M").mapq(5).build(),
            RecordBuilder::new("a").mapped(1, 10, "10M").build(),
        ]);
        let mut out: Vec<RawRecord> = Vec::new();

        let written = sanitize_records(records, &REFS[..], &mut out, SanitizeFlags::ALL, 2).unwrap();

        assert_eq!(written, 3);
        assert_eq!(format_cigar(&out[0].cigar_ops()), "70M30S");
        assert!(out[1].is_unmapped());
        assert_eq!(out[1].bin(), matefix_raw_bam::UNMAPPED_BIN);
        assert_eq!(out[2].bin(), matefix_raw_bam::reg2bin(10, 20));
    }
}
