//! The seams between the record-fixing core and the outside world.
//!
//! The core never decodes or encodes BAM itself. It pulls records from a
//! [`RecordSource`], pushes them to a [`RecordSink`], and asks a
//! [`ReferenceLengths`] for reference bounds. [`crate::bam_io`] implements
//! these over BGZF files; in-memory implementations back the unit tests.

use std::collections::VecDeque;
use std::io;

use matefix_raw_bam::RawRecord;
use noodles::sam::Header;

/// Pulls records from an input stream.
pub trait RecordSource {
    /// Decode the next record into `record`, reusing its buffer.
    ///
    /// Returns `Ok(false)` at a clean end of stream.
    fn read_record(&mut self, record: &mut RawRecord) -> io::Result<bool>;
}

/// Emits records to an output stream, in call order.
pub trait RecordSink {
    fn write_record(&mut self, record: &RawRecord) -> io::Result<()>;
}

/// Reference sequence lengths keyed by reference id.
pub trait ReferenceLengths {
    /// Length of reference `ref_id`, or 0 if there is no such reference.
    fn reference_length(&self, ref_id: i32) -> i64;
}

impl<S: RecordSource + ?Sized> RecordSource for &mut S {
    fn read_record(&mut self, record: &mut RawRecord) -> io::Result<bool> {
        (**self).read_record(record)
    }
}

impl<W: RecordSink + ?Sized> RecordSink for &mut W {
    fn write_record(&mut self, record: &RawRecord) -> io::Result<()> {
        (**self).write_record(record)
    }
}

impl RecordSource for VecDeque<RawRecord> {
    fn read_record(&mut self, record: &mut RawRecord) -> io::Result<bool> {
        match self.pop_front() {
            Some(next) => {
                *record = next;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl RecordSink for Vec<RawRecord> {
    fn write_record(&mut self, record: &RawRecord) -> io::Result<()> {
        self.push(record.clone());
        Ok(())
    }
}

impl ReferenceLengths for [i64] {
    fn reference_length(&self, ref_id: i32) -> i64 {
        usize::try_from(ref_id).ok().and_then(|i| self.get(i)).copied().unwrap_or(0)
    }
}

impl ReferenceLengths for Vec<i64> {
    fn reference_length(&self, ref_id: i32) -> i64 {
        self.as_slice().reference_length(ref_id)
    }
}

impl ReferenceLengths for Header {
    fn reference_length(&self, ref_id: i32) -> i64 {
        usize::try_from(ref_id)
            .ok()
            .and_then(|i| self.reference_sequences().get_index(i))
            .and_then(|(_, rs)| i64::try_from(rs.length().get()).ok())
            .unwrap_or(0)
    }
}

impl<L: ReferenceLengths + ?Sized> ReferenceLengths for &L {
    fn reference_length(&self, ref_id: i32) -> i64 {
        (**self).reference_length(ref_id)
    }
}
