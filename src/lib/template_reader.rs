//! Groups consecutive same-name records into templates.
//!
//! Records are sanitized as they are decoded. The record that ends one
//! template is the first of the next, so it is kept in place and moved to the
//! front on the following call rather than being decoded again.

use matefix_raw_bam::RawRecord;

use crate::errors::{MatefixError, Result};
use crate::sanitize::{SanitizeFlags, sanitize};
use crate::stream::{RecordSource, ReferenceLengths};

/// Pulls name-grouped templates from a [`RecordSource`].
///
/// Record slots are reused across templates; the buffer only ever grows.
pub struct TemplateReader<S, L> {
    source: S,
    refs: L,
    fix: SanitizeFlags,
    records: Vec<RawRecord>,
    /// Slot holding the already-read first record of the next template.
    lookahead: Option<usize>,
    eof: bool,
    records_read: u64,
}

impl<S: RecordSource, L: ReferenceLengths> TemplateReader<S, L> {
    /// Create a reader that sanitizes every record with `fix` against `refs`.
    pub fn new(source: S, refs: L, fix: SanitizeFlags) -> Self {
        Self { source, refs, fix, records: Vec::new(), lookahead: None, eof: false, records_read: 0 }
    }

    /// Number of records decoded so far.
    #[must_use]
    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    /// Fetch the next template.
    ///
    /// Returns `Ok(None)` once the input is exhausted, and on every call after that.
    ///
    /// # Errors
    ///
    /// Returns [`MatefixError::Read`] if decoding fails, or a record or allocation
    /// error if sanitizing or growing the buffer fails.
    pub fn next_template(&mut self) -> Result<Option<&mut [RawRecord]>> {
        if self.eof {
            return Ok(None);
        }

        match self.lookahead.take() {
            Some(slot) => self.records.swap(0, slot),
            None => {
                if !self.read_into(0)? {
                    self.eof = true;
                    return Ok(None);
                }
            }
        }

        let mut len = 1;
        loop {
            if !self.read_into(len)? {
                self.eof = true;
                break;
            }
            if self.records[len].name() != self.records[0].name() {
                self.lookahead = Some(len);
                break;
            }
            len += 1;
        }

        Ok(Some(&mut self.records[..len]))
    }

    /// Decode and sanitize the next record into `slot`, growing the buffer if needed.
    fn read_into(&mut self, slot: usize) -> Result<bool> {
        if slot == self.records.len() {
            self.records.try_reserve(1)?;
            self.records.push(RawRecord::new());
        }
        let record = &mut self.records[slot];
        if !self.source.read_record(record).map_err(MatefixError::Read)? {
            return Ok(false);
        }
        self.records_read += 1;

        if !record.is_well_formed() {
            return Err(MatefixError::truncated_record(self.records_read, record.len()));
        }
        sanitize(record, &self.refs, self.fix).map_err(|e| MatefixError::record(record.name(), e))?;
        Ok(true)
    }
}
