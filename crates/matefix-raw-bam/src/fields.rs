//! Direct field access on BAM binary records.
//!
//! Every function here works on the bytes of one record *without* its
//! leading `block_size`, which is how records are held in memory by
//! [`crate::RawRecord`].
//!
//! # BAM Record Binary Layout
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//! 0-3     4     refID (i32) - reference sequence ID
//! 4-7     4     pos (i32) - 0-based leftmost position
//! 8       1     l_read_name (u8) - length of read name + NUL
//! 9       1     mapq (u8) - mapping quality
//! 10-11   2     bin (u16) - BAM bin
//! 12-13   2     n_cigar_op (u16) - number of CIGAR operations
//! 14-15   2     flag (u16) - bitwise flags
//! 16-19   4     l_seq (u32) - length of sequence
//! 20-23   4     next_refID (i32) - mate reference sequence ID
//! 24-27   4     next_pos (i32) - mate 0-based position
//! 28-31   4     tlen (i32) - template length
//! 32+     var   read_name (l_read_name bytes, null-terminated)
//! var     var   cigar (n_cigar_op * u32)
//! var     var   seq ((l_seq + 1) / 2 bytes, 4-bit packed)
//! var     var   qual (l_seq bytes)
//! var     var   auxiliary tags until the end of the record
//! ```

/// Length of the fixed portion of a BAM record.
pub const MIN_BAM_HEADER_LEN: usize = 32;

/// Bin assigned to records with no coordinate (`reg2bin(-1, 0)`).
pub const UNMAPPED_BIN: u16 = 4680;

/// BAM flag bits.
pub mod flags {
    /// Read is paired in sequencing.
    pub const PAIRED: u16 = 0x1;
    /// Read is mapped in a proper pair.
    pub const PROPER_PAIR: u16 = 0x2;
    /// Read is unmapped.
    pub const UNMAPPED: u16 = 0x4;
    /// Mate is unmapped.
    pub const MATE_UNMAPPED: u16 = 0x8;
    /// Read is reverse complemented.
    pub const REVERSE: u16 = 0x10;
    /// Mate is reverse complemented.
    pub const MATE_REVERSE: u16 = 0x20;
    /// First segment in template (R1).
    pub const FIRST_SEGMENT: u16 = 0x40;
    /// Last segment in template (R2).
    pub const LAST_SEGMENT: u16 = 0x80;
    /// Secondary alignment.
    pub const SECONDARY: u16 = 0x100;
    /// Not passing quality controls.
    pub const QC_FAIL: u16 = 0x200;
    /// PCR or optical duplicate.
    pub const DUPLICATE: u16 = 0x400;
    /// Supplementary alignment.
    pub const SUPPLEMENTARY: u16 = 0x800;
}

/// Fixed-size tag value sizes indexed by type byte.
/// 0 = variable/unknown (needs special handling).
pub(crate) const TAG_FIXED_SIZES: [u8; 256] = {
    let mut table = [0u8; 256];
    table[b'A' as usize] = 1;
    table[b'c' as usize] = 1;
    table[b'C' as usize] = 1;
    table[b's' as usize] = 2;
    table[b'S' as usize] = 2;
    table[b'i' as usize] = 4;
    table[b'I' as usize] = 4;
    table[b'f' as usize] = 4;
    table
};

/// Size in bytes of a tag value of type `val_type` whose payload starts at `data[0]`.
///
/// Returns `None` for unknown types, unterminated strings, or truncated array headers.
#[inline]
#[must_use]
pub fn tag_value_size(val_type: u8, data: &[u8]) -> Option<usize> {
    let fixed = TAG_FIXED_SIZES[val_type as usize];
    if fixed > 0 {
        return Some(fixed as usize);
    }
    match val_type {
        b'Z' | b'H' => Some(data.iter().position(|&b| b == 0)? + 1),
        b'B' => {
            if data.len() < 5 {
                return None;
            }
            let elem_type = data[0];
            let count = u32::from_le_bytes([data[1], data[2], data[3], data[4]]) as usize;
            let elem_size = TAG_FIXED_SIZES[elem_type as usize] as usize;
            if elem_size == 0 {
                return None;
            }
            Some(5 + count * elem_size)
        }
        _ => None,
    }
}

// ============================================================================
// Read Primitives
// ============================================================================
//
// All read primitives below assume `bam.len() >= 32`.

/// Extract flags (u16) from a BAM record.
#[inline]
#[must_use]
pub fn flags(bam: &[u8]) -> u16 {
    u16::from_le_bytes([bam[14], bam[15]])
}

/// Extract mapping quality from a BAM record.
#[inline]
#[must_use]
pub fn mapq(bam: &[u8]) -> u8 {
    bam[9]
}

/// Extract the BAM bin from a BAM record.
#[inline]
#[must_use]
pub fn bin(bam: &[u8]) -> u16 {
    u16::from_le_bytes([bam[10], bam[11]])
}

/// Extract reference sequence ID from a BAM record.
#[inline]
#[must_use]
pub fn ref_id(bam: &[u8]) -> i32 {
    i32::from_le_bytes([bam[0], bam[1], bam[2], bam[3]])
}

/// Extract 0-based leftmost position from a BAM record.
#[inline]
#[must_use]
pub fn pos(bam: &[u8]) -> i32 {
    i32::from_le_bytes([bam[4], bam[5], bam[6], bam[7]])
}

/// Extract `l_read_name` (length of read name + NUL) from a BAM record.
#[inline]
#[must_use]
pub fn l_read_name(bam: &[u8]) -> u8 {
    bam[8]
}

/// Extract number of CIGAR operations from a BAM record.
#[inline]
#[must_use]
pub fn n_cigar_op(bam: &[u8]) -> u16 {
    u16::from_le_bytes([bam[12], bam[13]])
}

/// Extract sequence length from a BAM record.
#[inline]
#[must_use]
pub fn l_seq(bam: &[u8]) -> u32 {
    u32::from_le_bytes([bam[16], bam[17], bam[18], bam[19]])
}

/// Extract mate reference sequence ID from a BAM record.
#[inline]
#[must_use]
pub fn mate_ref_id(bam: &[u8]) -> i32 {
    i32::from_le_bytes([bam[20], bam[21], bam[22], bam[23]])
}

/// Extract mate 0-based position from a BAM record.
#[inline]
#[must_use]
pub fn mate_pos(bam: &[u8]) -> i32 {
    i32::from_le_bytes([bam[24], bam[25], bam[26], bam[27]])
}

/// Extract template length (tlen) from a BAM record.
#[inline]
#[must_use]
pub fn template_length(bam: &[u8]) -> i32 {
    i32::from_le_bytes([bam[28], bam[29], bam[30], bam[31]])
}

/// Extract read name (without null terminator) from a BAM record.
#[inline]
#[must_use]
pub fn read_name(bam: &[u8]) -> &[u8] {
    let l = bam[8] as usize;
    if l > 1 { &bam[32..32 + l - 1] } else { &[] }
}

// ============================================================================
// Write Primitives
// ============================================================================

/// Set flags (u16) in a BAM record.
#[inline]
pub fn set_flags(bam: &mut [u8], new_flags: u16) {
    bam[14..16].copy_from_slice(&new_flags.to_le_bytes());
}

/// Set mapping quality in a BAM record.
#[inline]
pub fn set_mapq(bam: &mut [u8], mapq: u8) {
    bam[9] = mapq;
}

/// Set the BAM bin in a BAM record.
#[inline]
pub fn set_bin(bam: &mut [u8], bin: u16) {
    bam[10..12].copy_from_slice(&bin.to_le_bytes());
}

/// Set reference sequence ID in a BAM record.
#[inline]
pub fn set_ref_id(bam: &mut [u8], ref_id: i32) {
    bam[0..4].copy_from_slice(&ref_id.to_le_bytes());
}

/// Set 0-based position in a BAM record.
#[inline]
pub fn set_pos(bam: &mut [u8], pos: i32) {
    bam[4..8].copy_from_slice(&pos.to_le_bytes());
}

/// Set number of CIGAR operations. Does not move any bytes.
#[inline]
pub fn set_n_cigar_op(bam: &mut [u8], n: u16) {
    bam[12..14].copy_from_slice(&n.to_le_bytes());
}

/// Set mate reference sequence ID in a BAM record.
#[inline]
pub fn set_mate_ref_id(bam: &mut [u8], ref_id: i32) {
    bam[20..24].copy_from_slice(&ref_id.to_le_bytes());
}

/// Set mate 0-based position in a BAM record.
#[inline]
pub fn set_mate_pos(bam: &mut [u8], pos: i32) {
    bam[24..28].copy_from_slice(&pos.to_le_bytes());
}

/// Set template length (tlen) in a BAM record.
#[inline]
pub fn set_template_length(bam: &mut [u8], tlen: i32) {
    bam[28..32].copy_from_slice(&tlen.to_le_bytes());
}

// ============================================================================
// Region Offsets
// ============================================================================

/// Offset of the first CIGAR operation.
#[inline]
#[must_use]
pub fn cigar_offset(bam: &[u8]) -> usize {
    MIN_BAM_HEADER_LEN + l_read_name(bam) as usize
}

/// Offset of the packed sequence.
#[inline]
#[must_use]
pub fn seq_offset(bam: &[u8]) -> usize {
    cigar_offset(bam) + n_cigar_op(bam) as usize * 4
}

/// Offset of the quality scores.
#[inline]
#[must_use]
pub fn qual_offset(bam: &[u8]) -> usize {
    seq_offset(bam) + (l_seq(bam) as usize).div_ceil(2)
}

/// Calculate the offset to auxiliary data in a BAM record.
///
/// `aux_offset = 32 + l_read_name + n_cigar_op*4 + (l_seq+1)/2 + l_seq`
#[inline]
#[must_use]
pub fn aux_data_offset(l_read_name: usize, n_cigar_op: usize, l_seq: usize) -> usize {
    MIN_BAM_HEADER_LEN + l_read_name + n_cigar_op * 4 + l_seq.div_ceil(2) + l_seq
}

/// Calculate the offset to auxiliary data for a complete BAM record.
///
/// Returns `None` if the record is shorter than the fixed header.
#[inline]
#[must_use]
pub fn aux_data_offset_from_record(bam: &[u8]) -> Option<usize> {
    if bam.len() < MIN_BAM_HEADER_LEN {
        return None;
    }
    Some(aux_data_offset(l_read_name(bam) as usize, n_cigar_op(bam) as usize, l_seq(bam) as usize))
}

/// Get auxiliary data as a byte slice from a complete BAM record.
///
/// Returns an empty slice for truncated records or records with no aux data.
#[inline]
#[must_use]
pub fn aux_data_slice(bam: &[u8]) -> &[u8] {
    match aux_data_offset_from_record(bam) {
        Some(offset) if offset <= bam.len() => &bam[offset..],
        _ => &[],
    }
}

/// Compute the BAM bin for the 0-based half-open interval `[beg, end)`.
///
/// This is the UCSC binning scheme used by the BAI index (`reg2bin` in the SAM format documentation).
#[must_use]
pub fn reg2bin(beg: i64, end: i64) -> u16 {
    let end = end - 1;
    let bin = if beg >> 14 == end >> 14 {
        ((1 << 15) - 1) / 7 + (beg >> 14)
    } else if beg >> 17 == end >> 17 {
        ((1 << 12) - 1) / 7 + (beg >> 17)
    } else if beg >> 20 == end >> 20 {
        ((1 << 9) - 1) / 7 + (beg >> 20)
    } else if beg >> 23 == end >> 23 {
        ((1 << 6) - 1) / 7 + (beg >> 23)
    } else if beg >> 26 == end >> 26 {
        ((1 << 3) - 1) / 7 + (beg >> 26)
    } else {
        0
    };
    u16::try_from(bin).unwrap_or(0)
}
