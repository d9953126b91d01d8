//! Builders for raw BAM records in tests.

use crate::cigar::{cigar_op, query_length_from_cigar};
use crate::record::RawRecord;
use crate::tags::{append_i32_tag, append_string_tag};

/// Build raw BAM bytes (no `block_size` prefix) with zeroed mapq, bin, tlen, sequence and qualities.
///
/// # Panics
///
/// Panics if the name is longer than 254 bytes or there are more than 65535 CIGAR ops.
#[must_use]
#[allow(clippy::too_many_arguments)]
pub fn make_bam_bytes(
    tid: i32,
    pos: i32,
    flag: u16,
    name: &[u8],
    cigar_ops: &[u32],
    seq_len: usize,
    mate_tid: i32,
    mate_pos: i32,
    aux_data: &[u8],
) -> Vec<u8> {
    let l_read_name = u8::try_from(name.len() + 1).unwrap();
    let n_cigar_op = u16::try_from(cigar_ops.len()).unwrap();
    let seq_bytes = seq_len.div_ceil(2);
    let total =
        32 + l_read_name as usize + cigar_ops.len() * 4 + seq_bytes + seq_len + aux_data.len();
    let mut buf = Vec::with_capacity(total);

    buf.extend_from_slice(&tid.to_le_bytes());
    buf.extend_from_slice(&pos.to_le_bytes());
    buf.push(l_read_name);
    buf.push(0); // mapq
    buf.extend_from_slice(&0u16.to_le_bytes()); // bin
    buf.extend_from_slice(&n_cigar_op.to_le_bytes());
    buf.extend_from_slice(&flag.to_le_bytes());
    buf.extend_from_slice(&u32::try_from(seq_len).unwrap().to_le_bytes());
    buf.extend_from_slice(&mate_tid.to_le_bytes());
    buf.extend_from_slice(&mate_pos.to_le_bytes());
    buf.extend_from_slice(&0i32.to_le_bytes()); // tlen

    buf.extend_from_slice(name);
    buf.push(0);
    for op in cigar_ops {
        buf.extend_from_slice(&op.to_le_bytes());
    }
    buf.resize(buf.len() + seq_bytes + seq_len, 0);
    buf.extend_from_slice(aux_data);

    debug_assert_eq!(buf.len(), total);
    buf
}

/// Encode a single CIGAR op.  `op_type`: M=0, I=1, D=2, N=3, S=4, H=5, P=6, `=7`, X=8.
///
/// # Panics
///
/// Panics if `len` exceeds `u32::MAX`.
#[must_use]
pub fn encode_op(op_type: u32, len: usize) -> u32 {
    (u32::try_from(len).unwrap() << 4) | op_type
}

/// Parse SAM CIGAR text such as `"5S90M5H"` into packed ops. `"*"` gives no ops.
///
/// # Panics
///
/// Panics on malformed text.
#[must_use]
pub fn parse_cigar(text: &str) -> Vec<u32> {
    if text == "*" {
        return Vec::new();
    }
    let mut ops = Vec::new();
    let mut len = 0u32;
    for c in text.chars() {
        if let Some(d) = c.to_digit(10) {
            len = len * 10 + d;
            continue;
        }
        let kind = "MIDNSHP=X".find(c).unwrap_or_else(|| panic!("bad CIGAR op '{c}' in {text}"));
        ops.push(cigar_op(u32::try_from(kind).unwrap(), len));
        len = 0;
    }
    ops
}

/// Fluent builder for a [`RawRecord`].
///
/// Defaults to an unplaced, unmapped-looking layout (`ref_id = pos = -1`, no CIGAR)
/// with the flag word left at zero. The sequence length follows the CIGAR's query
/// length unless qualities are given explicitly.
#[derive(Clone, Debug)]
pub struct RecordBuilder {
    name: Vec<u8>,
    ref_id: i32,
    pos: i32,
    mapq: u8,
    flags: u16,
    cigar: Vec<u32>,
    quals: Option<Vec<u8>>,
    mate_ref_id: i32,
    mate_pos: i32,
    tlen: i32,
    aux: Vec<u8>,
}

impl RecordBuilder {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.as_bytes().to_vec(),
            ref_id: -1,
            pos: -1,
            mapq: 0,
            flags: 0,
            cigar: Vec::new(),
            quals: None,
            mate_ref_id: -1,
            mate_pos: -1,
            tlen: 0,
            aux: Vec::new(),
        }
    }

    /// Place the record at `ref_id:pos` with the given CIGAR text.
    #[must_use]
    pub fn mapped(mut self, ref_id: i32, pos: i32, cigar: &str) -> Self {
        self.ref_id = ref_id;
        self.pos = pos;
        self.cigar = parse_cigar(cigar);
        self
    }

    #[must_use]
    pub fn ref_id(mut self, ref_id: i32) -> Self {
        self.ref_id = ref_id;
        self
    }

    #[must_use]
    pub fn pos(mut self, pos: i32) -> Self {
        self.pos = pos;
        self
    }

    #[must_use]
    pub fn cigar(mut self, cigar: &str) -> Self {
        self.cigar = parse_cigar(cigar);
        self
    }

    #[must_use]
    pub fn mapq(mut self, mapq: u8) -> Self {
        self.mapq = mapq;
        self
    }

    #[must_use]
    pub fn flags(mut self, flags: u16) -> Self {
        self.flags = flags;
        self
    }

    #[must_use]
    pub fn quals(mut self, quals: &[u8]) -> Self {
        self.quals = Some(quals.to_vec());
        self
    }

    #[must_use]
    pub fn mate(mut self, ref_id: i32, pos: i32) -> Self {
        self.mate_ref_id = ref_id;
        self.mate_pos = pos;
        self
    }

    #[must_use]
    pub fn tlen(mut self, tlen: i32) -> Self {
        self.tlen = tlen;
        self
    }

    /// Append raw, already-encoded tag bytes.
    #[must_use]
    pub fn aux(mut self, bytes: &[u8]) -> Self {
        self.aux.extend_from_slice(bytes);
        self
    }

    #[must_use]
    pub fn string_tag(mut self, tag: &[u8; 2], value: &str) -> Self {
        append_string_tag(&mut self.aux, tag, value.as_bytes());
        self
    }

    #[must_use]
    pub fn int_tag(mut self, tag: &[u8; 2], value: i32) -> Self {
        append_i32_tag(&mut self.aux, tag, value);
        self
    }

    /// # Panics
    ///
    /// Panics on the same limits as [`make_bam_bytes`].
    #[must_use]
    pub fn build(&self) -> RawRecord {
        let seq_len = self.quals.as_ref().map_or_else(|| query_length_from_cigar(&self.cigar), Vec::len);
        let mut bytes = make_bam_bytes(
            self.ref_id,
            self.pos,
            self.flags,
            &self.name,
            &self.cigar,
            seq_len,
            self.mate_ref_id,
            self.mate_pos,
            &self.aux,
        );
        bytes[9] = self.mapq;
        bytes[28..32].copy_from_slice(&self.tlen.to_le_bytes());
        if let Some(quals) = &self.quals {
            let qual_start = 32 + self.name.len() + 1 + self.cigar.len() * 4 + seq_len.div_ceil(2);
            bytes[qual_start..qual_start + seq_len].copy_from_slice(quals);
        }
        RawRecord::from(bytes)
    }
}
