//! TLV field extraction for EMV record data.
//!
//! Recognizes the three cardholder tags the probe cares about: PAN (0x5A),
//! expiration date (0x5F 0x24) and cardholder name (0x5F 0x20). The scan is
//! a sliding window over the buffer, advancing one byte per iteration, so a
//! tag may start anywhere regardless of earlier non-matching positions.

use crate::core::utils::{format_ascii, format_hex};

const TAG_PAN: u8 = 0x5A;
const TAG_PREFIX: u8 = 0x5F;
const TAG_EXPIRY: u8 = 0x24;
const TAG_NAME: u8 = 0x20;

/// Accumulator for cardholder fields found during one record scan.
///
/// Each slot fills at most once per session, across however many record
/// buffers the scanner feeds in; later occurrences of the same tag are
/// ignored. Owned exclusively by one scan invocation.
#[derive(Debug, Default)]
pub struct EmvSessionFields {
    pan: Option<Vec<u8>>,
    expiry: Option<Vec<u8>>,
    holder_name: Option<Vec<u8>>,
}

impl EmvSessionFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once all three slots are filled
    pub fn is_complete(&self) -> bool {
        self.pan.is_some() && self.expiry.is_some() && self.holder_name.is_some()
    }

    /// PAN digits as an uppercase hex string
    pub fn pan_hex(&self) -> Option<String> {
        self.pan.as_deref().map(format_hex)
    }

    /// Expiration date as YYMM
    pub fn expiry_yymm(&self) -> Option<String> {
        self.expiry.as_deref().map(format_hex)
    }

    /// Cardholder name decoded as printable text
    pub fn holder_name_text(&self) -> Option<String> {
        self.holder_name.as_deref().map(format_ascii)
    }

    pub fn pan(&self) -> Option<&[u8]> {
        self.pan.as_deref()
    }

    pub fn expiry(&self) -> Option<&[u8]> {
        self.expiry.as_deref()
    }

    pub fn holder_name(&self) -> Option<&[u8]> {
        self.holder_name.as_deref()
    }
}

/// Scan one response buffer and fill any still-empty slots.
///
/// A tag whose declared length would overrun the buffer is treated as a
/// non-match at that position; the window keeps sliding. Stops as soon as
/// the accumulator is complete.
pub fn extract_fields(data: &[u8], fields: &mut EmvSessionFields) {
    let mut i = 0;
    while i < data.len() && !fields.is_complete() {
        if fields.pan.is_none() && data[i] == TAG_PAN {
            if let Some(value) = read_value(data, i + 1) {
                log::debug!("found PAN tag at offset {i}");
                fields.pan = Some(value);
            }
        } else if fields.expiry.is_none() && starts_two_byte_tag(data, i, TAG_EXPIRY) {
            if let Some(value) = read_value(data, i + 2) {
                log::debug!("found expiry tag at offset {i}");
                fields.expiry = Some(value);
            }
        } else if fields.holder_name.is_none() && starts_two_byte_tag(data, i, TAG_NAME) {
            if let Some(value) = read_value(data, i + 2) {
                log::debug!("found cardholder name tag at offset {i}");
                fields.holder_name = Some(value);
            }
        }
        i += 1;
    }
}

fn starts_two_byte_tag(data: &[u8], i: usize, second: u8) -> bool {
    data[i] == TAG_PREFIX && data.get(i + 1) == Some(&second)
}

/// Read a single-byte length at `len_pos` followed by that many value bytes.
/// Returns None when either the length byte or the value would fall past
/// the end of the buffer.
fn read_value(data: &[u8], len_pos: usize) -> Option<Vec<u8>> {
    let len = *data.get(len_pos)? as usize;
    let start = len_pos + 1;
    let end = start.checked_add(len)?;
    if end > data.len() {
        return None;
    }
    Some(data[start..end].to_vec())
}
