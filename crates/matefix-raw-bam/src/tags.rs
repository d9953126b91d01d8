//! Auxiliary tag scanning and editing on raw BAM bytes.
//!
//! Lookups walk entries until the key is found and give up quietly on
//! malformed data. Passes that must visit every entry ([`retain_tags`])
//! report malformed data as [`RecordError::CorruptAuxData`].

use crate::error::RecordError;
use crate::fields::{aux_data_offset_from_record, tag_value_size};

/// Find the byte range `[start, end)` of an entire tag entry (tag+type+value) in aux data.
///
/// Returns offsets relative to the start of `aux_data`.
#[must_use]
pub fn find_tag_bounds(aux_data: &[u8], tag: &[u8; 2]) -> Option<(usize, usize)> {
    let mut p = 0;
    while p + 3 <= aux_data.len() {
        let t = &aux_data[p..p + 2];
        let val_type = aux_data[p + 2];

        if let Some(size) = tag_value_size(val_type, &aux_data[p + 3..]) {
            let entry_end = p + 3 + size;
            if t == tag {
                return Some((p, entry_end));
            }
            p = entry_end;
        } else {
            break;
        }
    }
    None
}

/// Find a string (Z-type) tag in auxiliary data, returning value bytes without null terminator.
#[must_use]
pub fn find_string_tag<'a>(aux_data: &'a [u8], tag: &[u8; 2]) -> Option<&'a [u8]> {
    let (start, end) = find_tag_bounds(aux_data, tag)?;
    if aux_data[start + 2] != b'Z' {
        return None;
    }
    Some(&aux_data[start + 3..end - 1])
}

/// Find an integer tag value in auxiliary data.
///
/// Supports signed/unsigned byte, short, and int types (c/C/s/S/i/I).
#[must_use]
pub fn find_int_tag(aux_data: &[u8], tag: &[u8; 2]) -> Option<i64> {
    let (start, end) = find_tag_bounds(aux_data, tag)?;
    if end > aux_data.len() {
        return None;
    }
    let v = &aux_data[start + 3..end];
    match aux_data[start + 2] {
        b'c' => Some(i64::from(v[0].cast_signed())),
        b'C' => Some(i64::from(v[0])),
        b's' => Some(i64::from(i16::from_le_bytes([v[0], v[1]]))),
        b'S' => Some(i64::from(u16::from_le_bytes([v[0], v[1]]))),
        b'i' => Some(i64::from(i32::from_le_bytes([v[0], v[1], v[2], v[3]]))),
        b'I' => Some(i64::from(u32::from_le_bytes([v[0], v[1], v[2], v[3]]))),
        _ => None,
    }
}

/// Append a string (Z-type) tag to a BAM record.
pub fn append_string_tag(record: &mut Vec<u8>, tag: &[u8; 2], value: &[u8]) {
    record.reserve(value.len() + 4);
    record.extend_from_slice(tag);
    record.push(b'Z');
    record.extend_from_slice(value);
    record.push(0);
}

/// Append a 32-bit signed (`i`-type) integer tag to a BAM record.
///
/// Always uses the 4-byte encoding so the entry width does not depend on the value.
pub fn append_i32_tag(record: &mut Vec<u8>, tag: &[u8; 2], value: i32) {
    record.extend_from_slice(tag);
    record.push(b'i');
    record.extend_from_slice(&value.to_le_bytes());
}

/// Remove the first entry for `tag` from a BAM record, if present.
///
/// Returns `true` if an entry was removed.
pub fn remove_tag(record: &mut Vec<u8>, tag: &[u8; 2]) -> bool {
    let Some(aux_start) = aux_data_offset_from_record(record) else {
        return false;
    };
    if aux_start >= record.len() {
        return false;
    }
    if let Some((start, end)) = find_tag_bounds(&record[aux_start..], tag) {
        record.drain(aux_start + start..(aux_start + end).min(record.len()));
        return true;
    }
    false
}

/// Keep only the tag entries whose key satisfies `keep`, compacting in a single pass.
///
/// Retained entries are copied down to a write cursor in their original order
/// and the record is truncated at the cursor. Returns the number of bytes removed.
///
/// # Errors
///
/// Returns [`RecordError::CorruptAuxData`] if an entry has an unknown type or
/// extends past the end of the record.
pub fn retain_tags<F>(record: &mut Vec<u8>, mut keep: F) -> Result<usize, RecordError>
where
    F: FnMut(&[u8; 2]) -> bool,
{
    let Some(aux_start) = aux_data_offset_from_record(record) else {
        return Ok(0);
    };
    let len = record.len();
    if aux_start >= len {
        return Ok(0);
    }

    let mut read = aux_start;
    let mut write = aux_start;
    while read < len {
        let corrupt = RecordError::CorruptAuxData { offset: read - aux_start };
        if read + 3 > len {
            return Err(corrupt);
        }
        let size = tag_value_size(record[read + 2], &record[read + 3..]).ok_or(corrupt)?;
        let end = read + 3 + size;
        if end > len {
            return Err(RecordError::CorruptAuxData { offset: read - aux_start });
        }

        let key = [record[read], record[read + 1]];
        if keep(&key) {
            if read != write {
                record.copy_within(read..end, write);
            }
            write += end - read;
        }
        read = end;
    }

    record.truncate(write);
    Ok(len - write)
}
