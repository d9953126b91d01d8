//! Cross-record updates between the two primary alignments of a read pair.
//!
//! Every function takes the pair as two separate records and is symmetric
//! unless noted: each direction copies information *from* one mate *to* the
//! other.

use matefix_raw_bam::{RawRecord, flags, format_cigar};

/// Mate mapping quality tag.
pub const MQ: [u8; 2] = *b"MQ";
/// Mate CIGAR tag.
pub const MC: [u8; 2] = *b"MC";
/// Template CIGAR tag.
pub const CT: [u8; 2] = *b"ct";
/// Mate score tag, used by duplicate marking to rank pairs.
pub const MS: [u8; 2] = *b"ms";

/// Base qualities below this do not count towards the mate score.
pub const MATE_SCORE_MIN_QUALITY: u8 = 15;

/// Bring each mate's view of the other up to date.
///
/// In order:
/// - an unmapped mate is placed at its mapped mate's coordinate;
/// - each record's mate reference, mate position, mate-reverse and
///   mate-unmapped fields are copied from the other;
/// - `MQ` and `MC` are rewritten from the other mate.
pub fn sync_mates(a: &mut RawRecord, b: &mut RawRecord) {
    place_unmapped_with_mate(a, b);
    place_unmapped_with_mate(b, a);
    copy_mate_fields(a, b);
    copy_mate_fields(b, a);
    mirror_mapq_and_cigar(a, b);
    mirror_mapq_and_cigar(b, a);
}

fn place_unmapped_with_mate(src: &RawRecord, dest: &mut RawRecord) {
    if dest.is_unmapped() && !src.is_unmapped() {
        dest.set_ref_id(src.ref_id());
        dest.set_pos(src.pos());
    }
}

/// Mate-unmapped is only ever set here, never cleared.
fn copy_mate_fields(src: &RawRecord, dest: &mut RawRecord) {
    dest.set_mate_ref_id(src.ref_id());
    dest.set_mate_pos(src.pos());
    if src.is_reverse() {
        dest.set_flag_bits(flags::MATE_REVERSE);
    } else {
        dest.clear_flag_bits(flags::MATE_REVERSE);
    }
    if src.is_unmapped() {
        dest.set_flag_bits(flags::MATE_UNMAPPED);
    }
}

fn mirror_mapq_and_cigar(src: &RawRecord, dest: &mut RawRecord) {
    if !src.is_unmapped() {
        dest.replace_i32_tag(&MQ, i32::from(src.mapq()));
    }
    if !src.is_unmapped() || !dest.is_unmapped() {
        dest.replace_string_tag(&MC, format_cigar(&src.cigar_ops()).as_bytes());
    }
}

/// Set TLEN on both records from their 5' coordinates.
///
/// Both are set to zero unless the records share a reference and neither is
/// flagged unmapped or mate-unmapped.
pub fn set_insert_sizes(a: &mut RawRecord, b: &mut RawRecord) {
    let unpaired = flags::UNMAPPED | flags::MATE_UNMAPPED;
    if a.ref_id() == b.ref_id() && !a.has_any_flag(unpaired) && !b.has_any_flag(unpaired) {
        let a5 = a.five_prime_position();
        let b5 = b.five_prime_position();
        a.set_template_length(clamp_i32(b5 - a5));
        b.set_template_length(clamp_i32(a5 - b5));
    } else {
        a.set_template_length(0);
        b.set_template_length(0);
    }
}

fn clamp_i32(v: i64) -> i32 {
    i32::try_from(v).unwrap_or(if v < 0 { i32::MIN } else { i32::MAX })
}

/// Describe the pair's layout in a `ct` tag on the leftmost record.
///
/// The value reads `<seg><strand><cigar><gap>T<seg><strand><cigar>`, e.g.
/// `1F50M150T2R50M`, where `gap` is the distance from the end of the left
/// alignment to the start of the right one and may be negative. Any existing
/// `ct` is removed from both records; nothing is written unless both records
/// are mapped to the same reference with known positions.
pub fn add_template_cigar(a: &mut RawRecord, b: &mut RawRecord) {
    if a.ref_id() != b.ref_id() || a.ref_id() < 0 || a.pos() < 0 || b.pos() < 0 {
        return;
    }
    if a.is_unmapped() || b.is_unmapped() {
        return;
    }

    let (left, right) = if a.pos() > b.pos() { (b, a) } else { (a, b) };
    let gap = i64::from(right.pos()) - left.alignment_end();
    let value = format!("{}{}T{}", describe_segment(left), gap, describe_segment(right));

    left.remove_tag(&CT);
    right.remove_tag(&CT);
    left.replace_string_tag(&CT, value.as_bytes());
}

fn describe_segment(record: &RawRecord) -> String {
    let segment = if record.is_first_segment() { '1' } else { '2' };
    let strand = if record.is_reverse() { 'R' } else { 'F' };
    format!("{segment}{strand}{}", format_cigar(&record.cigar_ops()))
}

/// Whether the pair could be a proper pair: both mapped to the same reference
/// and pointing towards each other (forward-strand read leftmost by 5' coordinate).
#[must_use]
pub fn plausibly_properly_paired(a: &RawRecord, b: &RawRecord) -> bool {
    if a.is_unmapped() || b.is_unmapped() || a.ref_id() != b.ref_id() {
        return false;
    }
    let (first, second) =
        if a.five_prime_position() > b.five_prime_position() { (b, a) } else { (a, b) };
    !first.is_reverse() && second.is_reverse()
}

/// Sum of the record's base qualities that are at least [`MATE_SCORE_MIN_QUALITY`].
#[must_use]
pub fn mate_score(record: &RawRecord) -> i32 {
    let total: u64 = record
        .quality_scores()
        .iter()
        .filter(|&&q| q >= MATE_SCORE_MIN_QUALITY)
        .map(|&q| u64::from(q))
        .sum();
    i32::try_from(total).unwrap_or(i32::MAX)
}

/// Store each record's mate score in the other's `ms` tag.
pub fn add_mate_scores(a: &mut RawRecord, b: &mut RawRecord) {
    let a_score = mate_score(a);
    let b_score = mate_score(b);
    a.replace_i32_tag(&MS, b_score);
    b.replace_i32_tag(&MS, a_score);
}
