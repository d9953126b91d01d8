//! CIGAR operations packed as BAM `u32`s (`len << 4 | kind`).

use std::fmt::Write;

use crate::fields::{cigar_offset, n_cigar_op};

/// CIGAR operation kinds as stored in the low 4 bits of a packed op.
pub mod kind {
    pub const MATCH: u32 = 0;
    pub const INSERTION: u32 = 1;
    pub const DELETION: u32 = 2;
    pub const SKIP: u32 = 3;
    pub const SOFT_CLIP: u32 = 4;
    pub const HARD_CLIP: u32 = 5;
    pub const PAD: u32 = 6;
    pub const SEQ_MATCH: u32 = 7;
    pub const SEQ_MISMATCH: u32 = 8;
}

/// Operation characters indexed by kind; unused kinds render as `?`.
const CIGAR_CHARS: &[u8; 16] = b"MIDNSHP=XB??????";

/// Pack a length and kind into a BAM CIGAR op.
#[inline]
#[must_use]
pub fn cigar_op(op_kind: u32, len: u32) -> u32 {
    (len << 4) | op_kind
}

/// Kind of a packed op.
#[inline]
#[must_use]
pub fn op_kind(op: u32) -> u32 {
    op & 0xF
}

/// Length of a packed op.
#[inline]
#[must_use]
pub fn op_len(op: u32) -> u32 {
    op >> 4
}

/// Whether an op kind advances along the reference (M, D, N, =, X).
#[inline]
#[must_use]
pub fn consumes_reference(op_kind: u32) -> bool {
    matches!(op_kind, 0 | 2 | 3 | 7 | 8)
}

/// Extract CIGAR operations from BAM record.
#[inline]
#[must_use]
pub fn get_cigar_ops(bam: &[u8]) -> Vec<u32> {
    let n_cigar_op = n_cigar_op(bam) as usize;
    if n_cigar_op == 0 {
        return Vec::new();
    }

    let cigar_start = cigar_offset(bam);
    let cigar_end = cigar_start + n_cigar_op * 4;
    if cigar_end > bam.len() {
        return Vec::new();
    }

    // Read bytewise: 32 + l_read_name is not guaranteed to be 4-byte aligned.
    bam[cigar_start..cigar_end].chunks_exact(4).map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]])).collect()
}

/// Sum of reference-consuming op lengths (M/D/N/=/X).
#[inline]
#[must_use]
pub fn reference_length_from_cigar(cigar_ops: &[u32]) -> i64 {
    cigar_ops.iter().filter(|&&op| consumes_reference(op_kind(op))).map(|&op| i64::from(op_len(op))).sum()
}

/// Compute the query-consuming length of CIGAR operations (M/I/S/=/X).
#[inline]
#[must_use]
pub fn query_length_from_cigar(cigar_ops: &[u32]) -> usize {
    cigar_ops.iter().filter(|&&op| matches!(op_kind(op), 0 | 1 | 4 | 7 | 8)).map(|&op| op_len(op) as usize).sum()
}

/// Render ops in SAM text form, `*` when there are none.
#[must_use]
pub fn format_cigar(cigar_ops: &[u32]) -> String {
    if cigar_ops.is_empty() {
        return "*".to_string();
    }
    let mut s = String::with_capacity(cigar_ops.len() * 4);
    for &op in cigar_ops {
        let c = CIGAR_CHARS[op_kind(op) as usize] as char;
        let _ = write!(s, "{}{c}", op_len(op));
    }
    s
}

/// Result of trimming an alignment so it ends at a reference coordinate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CigarTrim {
    /// The alignment already ends at or before the cutoff.
    Untouched,
    /// The replacement op list. At most one op longer than the input.
    Trimmed(Vec<u32>),
    /// The overflowing op starts past the cutoff; the read has left the reference.
    OffReference,
}

/// Trim `cigar_ops` (aligned at `pos`) so that no reference base at or beyond `end` is consumed.
///
/// The op that crosses `end` is split into a retained part and a soft clip, or
/// becomes a soft clip entirely when it starts exactly at `end`. Later ops are
/// folded into that soft clip, except hard clips which are kept after it.
#[must_use]
pub fn trim_cigar_ops(cigar_ops: &[u32], pos: i64, end: i64) -> CigarTrim {
    let mut cursor = pos;
    let mut crossing = None;
    for (i, &op) in cigar_ops.iter().enumerate() {
        if !consumes_reference(op_kind(op)) {
            continue;
        }
        let len = i64::from(op_len(op));
        if cursor + len > end {
            crossing = Some((i, cursor));
            break;
        }
        cursor += len;
    }

    let Some((index, op_start)) = crossing else {
        return CigarTrim::Untouched;
    };
    if op_start > end {
        return CigarTrim::OffReference;
    }

    let op = cigar_ops[index];
    let mut trimmed = Vec::with_capacity(cigar_ops.len() + 1);
    trimmed.extend_from_slice(&cigar_ops[..index]);

    // op_start <= end < op_start + len, so both parts fit in the original u32 length
    let retained = u32::try_from(end - op_start).unwrap_or(0);
    if retained > 0 {
        trimmed.push(cigar_op(op_kind(op), retained));
    }
    let mut clip = op_len(op) - retained;
    let clip_index = trimmed.len();
    trimmed.push(0);

    for &rest in &cigar_ops[index + 1..] {
        if op_kind(rest) == kind::HARD_CLIP {
            trimmed.push(rest);
        } else {
            clip += op_len(rest);
        }
    }
    trimmed[clip_index] = cigar_op(kind::SOFT_CLIP, clip);

    CigarTrim::Trimmed(trimmed)
}
