//! An owned BAM record that can be edited in place.
//!
//! The record is kept as the exact bytes found on disk after `block_size`,
//! so decoding and encoding are plain copies. The read name, CIGAR, sequence,
//! quality and auxiliary regions are located from the fixed header on every
//! access, which keeps offsets correct after any region changes size.

use crate::cigar::{get_cigar_ops, reference_length_from_cigar};
use crate::error::RecordError;
use crate::fields::{
    self, MIN_BAM_HEADER_LEN, UNMAPPED_BIN, aux_data_slice, cigar_offset, flags, qual_offset,
    reg2bin,
};
use crate::tags;

/// One BAM record without its `block_size` prefix.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawRecord(Vec<u8>);

impl RawRecord {
    /// An empty slot to decode into.
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Mutable access to the underlying buffer, for decoders filling the slot.
    pub fn as_mut_vec(&mut self) -> &mut Vec<u8> {
        &mut self.0
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the buffer is long enough to hold the fixed header and every region it declares.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.0.len() >= MIN_BAM_HEADER_LEN
            && fields::aux_data_offset_from_record(&self.0).is_some_and(|aux| aux <= self.0.len())
    }

    // ------------------------------------------------------------------------
    // Fixed fields
    // ------------------------------------------------------------------------

    #[must_use]
    pub fn ref_id(&self) -> i32 {
        fields::ref_id(&self.0)
    }

    pub fn set_ref_id(&mut self, ref_id: i32) {
        fields::set_ref_id(&mut self.0, ref_id);
    }

    #[must_use]
    pub fn pos(&self) -> i32 {
        fields::pos(&self.0)
    }

    pub fn set_pos(&mut self, pos: i32) {
        fields::set_pos(&mut self.0, pos);
    }

    #[must_use]
    pub fn mapq(&self) -> u8 {
        fields::mapq(&self.0)
    }

    pub fn set_mapq(&mut self, mapq: u8) {
        fields::set_mapq(&mut self.0, mapq);
    }

    #[must_use]
    pub fn flags(&self) -> u16 {
        fields::flags(&self.0)
    }

    pub fn set_flags(&mut self, flags: u16) {
        fields::set_flags(&mut self.0, flags);
    }

    /// Set every bit in `bits`.
    pub fn set_flag_bits(&mut self, bits: u16) {
        self.set_flags(self.flags() | bits);
    }

    /// Clear every bit in `bits`.
    pub fn clear_flag_bits(&mut self, bits: u16) {
        self.set_flags(self.flags() & !bits);
    }

    /// Whether any bit in `bits` is set.
    #[must_use]
    pub fn has_any_flag(&self, bits: u16) -> bool {
        self.flags() & bits != 0
    }

    #[must_use]
    pub fn is_unmapped(&self) -> bool {
        self.has_any_flag(flags::UNMAPPED)
    }

    #[must_use]
    pub fn is_reverse(&self) -> bool {
        self.has_any_flag(flags::REVERSE)
    }

    #[must_use]
    pub fn is_first_segment(&self) -> bool {
        self.has_any_flag(flags::FIRST_SEGMENT)
    }

    #[must_use]
    pub fn is_secondary_or_supplementary(&self) -> bool {
        self.has_any_flag(flags::SECONDARY | flags::SUPPLEMENTARY)
    }

    #[must_use]
    pub fn mate_ref_id(&self) -> i32 {
        fields::mate_ref_id(&self.0)
    }

    pub fn set_mate_ref_id(&mut self, ref_id: i32) {
        fields::set_mate_ref_id(&mut self.0, ref_id);
    }

    #[must_use]
    pub fn mate_pos(&self) -> i32 {
        fields::mate_pos(&self.0)
    }

    pub fn set_mate_pos(&mut self, pos: i32) {
        fields::set_mate_pos(&mut self.0, pos);
    }

    #[must_use]
    pub fn template_length(&self) -> i32 {
        fields::template_length(&self.0)
    }

    pub fn set_template_length(&mut self, tlen: i32) {
        fields::set_template_length(&mut self.0, tlen);
    }

    #[must_use]
    pub fn bin(&self) -> u16 {
        fields::bin(&self.0)
    }

    /// Recompute the BAM bin from the current position and alignment end.
    pub fn update_bin(&mut self) {
        let pos = i64::from(self.pos());
        let bin = if pos < 0 { UNMAPPED_BIN } else { reg2bin(pos, self.alignment_end()) };
        fields::set_bin(&mut self.0, bin);
    }

    // ------------------------------------------------------------------------
    // Variable regions
    // ------------------------------------------------------------------------

    /// Read name without the NUL terminator.
    #[must_use]
    pub fn name(&self) -> &[u8] {
        fields::read_name(&self.0)
    }

    #[must_use]
    pub fn n_cigar_op(&self) -> usize {
        fields::n_cigar_op(&self.0) as usize
    }

    #[must_use]
    pub fn cigar_ops(&self) -> Vec<u32> {
        get_cigar_ops(&self.0)
    }

    #[must_use]
    pub fn l_seq(&self) -> usize {
        fields::l_seq(&self.0) as usize
    }

    /// Raw Phred quality values, one per base.
    #[must_use]
    pub fn quality_scores(&self) -> &[u8] {
        let start = qual_offset(&self.0);
        let end = start + self.l_seq();
        self.0.get(start..end).unwrap_or(&[])
    }

    #[must_use]
    pub fn aux_data(&self) -> &[u8] {
        aux_data_slice(&self.0)
    }

    /// Number of reference bases covered by the CIGAR.
    #[must_use]
    pub fn reference_length(&self) -> i64 {
        reference_length_from_cigar(&self.cigar_ops())
    }

    /// Exclusive 0-based end of the alignment.
    ///
    /// Unmapped records, and records whose CIGAR covers no reference, are
    /// treated as covering the single base at `pos`.
    #[must_use]
    pub fn alignment_end(&self) -> i64 {
        let rlen = if self.is_unmapped() { 0 } else { self.reference_length() };
        i64::from(self.pos()) + rlen.max(1)
    }

    /// Reference coordinate of the 5' end: the end for reverse-strand reads, else the start.
    #[must_use]
    pub fn five_prime_position(&self) -> i64 {
        if self.is_reverse() { self.alignment_end() } else { i64::from(self.pos()) }
    }

    /// Replace the CIGAR, shifting sequence, quality and tags by the size difference.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::TooManyCigarOps`] if `ops` does not fit the 16-bit count, or
    /// [`RecordError::Allocation`] if the buffer cannot grow.
    pub fn replace_cigar_ops(&mut self, ops: &[u32]) -> Result<(), RecordError> {
        let n_ops = u16::try_from(ops.len()).map_err(|_| RecordError::TooManyCigarOps { count: ops.len() })?;
        let start = cigar_offset(&self.0);
        let old_end = start + self.n_cigar_op() * 4;
        let new_end = start + ops.len() * 4;
        let len = self.0.len();

        if new_end > old_end {
            let grow = new_end - old_end;
            self.0.try_reserve(grow)?;
            self.0.resize(len + grow, 0);
            self.0.copy_within(old_end..len, new_end);
        } else if new_end < old_end {
            self.0.copy_within(old_end..len, new_end);
            self.0.truncate(len - (old_end - new_end));
        }

        for (chunk, op) in self.0[start..new_end].chunks_exact_mut(4).zip(ops) {
            chunk.copy_from_slice(&op.to_le_bytes());
        }
        fields::set_n_cigar_op(&mut self.0, n_ops);
        Ok(())
    }

    /// Remove the CIGAR entirely.
    pub fn clear_cigar(&mut self) {
        let start = cigar_offset(&self.0);
        let end = start + self.n_cigar_op() * 4;
        if end > start {
            self.0.drain(start..end.min(self.0.len()));
            fields::set_n_cigar_op(&mut self.0, 0);
        }
    }

    // ------------------------------------------------------------------------
    // Auxiliary tags
    // ------------------------------------------------------------------------

    #[must_use]
    pub fn string_tag(&self, tag: &[u8; 2]) -> Option<&[u8]> {
        tags::find_string_tag(self.aux_data(), tag)
    }

    #[must_use]
    pub fn int_tag(&self, tag: &[u8; 2]) -> Option<i64> {
        tags::find_int_tag(self.aux_data(), tag)
    }

    #[must_use]
    pub fn has_tag(&self, tag: &[u8; 2]) -> bool {
        tags::find_tag_bounds(self.aux_data(), tag).is_some()
    }

    /// Remove every entry for `tag`.
    pub fn remove_tag(&mut self, tag: &[u8; 2]) {
        while tags::remove_tag(&mut self.0, tag) {}
    }

    /// Delete any existing `tag`, then append it as a `Z` string.
    pub fn replace_string_tag(&mut self, tag: &[u8; 2], value: &[u8]) {
        self.remove_tag(tag);
        tags::append_string_tag(&mut self.0, tag, value);
    }

    /// Delete any existing `tag`, then append it as an `i` integer.
    pub fn replace_i32_tag(&mut self, tag: &[u8; 2], value: i32) {
        self.remove_tag(tag);
        tags::append_i32_tag(&mut self.0, tag, value);
    }

    /// Keep only tag entries whose key satisfies `keep`. Returns the number of bytes removed.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::CorruptAuxData`] if the tag section cannot be walked.
    pub fn retain_tags<F>(&mut self, keep: F) -> Result<usize, RecordError>
    where
        F: FnMut(&[u8; 2]) -> bool,
    {
        tags::retain_tags(&mut self.0, keep)
    }
}

impl From<Vec<u8>> for RawRecord {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for RawRecord {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
