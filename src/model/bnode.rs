//! Reversible mapping of blank node labels onto the strict `[A-Za-z0-9]`
//! alphabet.
//!
//! An encoded label starts with `B`. ASCII letters and digits pass through,
//! `X` becomes `XX`, and every other UTF-8 byte becomes `X` followed by two
//! uppercase hex digits. Labels without the leading `B` are returned as-is by
//! [`decode_label`].

use crate::types::{PenumbraError, Result};

const LEADING: char = 'B';
const MARKER: u8 = b'X';

/// Returns true when `label` already fits the strict alphabet.
pub fn is_safe_label(label: &str) -> bool {
    !label.is_empty() && label.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// Encodes `label` into the strict alphabet.
pub fn encode_label(label: &str) -> String {
    // UUID labels (36 chars, 4 dashes) come out at 45 chars.
    let mut out = String::with_capacity(48);
    out.push(LEADING);
    for b in label.bytes() {
        if b == MARKER {
            out.push('X');
            out.push('X');
        } else if b.is_ascii_alphanumeric() {
            out.push(b as char);
        } else {
            out.push('X');
            out.push(hex_digit(b >> 4));
            out.push(hex_digit(b & 0x0f));
        }
    }
    out
}

/// Reverses [`encode_label`].
pub fn decode_label(label: &str) -> Result<String> {
    let Some(body) = label.strip_prefix(LEADING) else {
        return Ok(label.to_string());
    };
    let bytes = body.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b != MARKER {
            out.push(b);
            i += 1;
            continue;
        }
        match bytes.get(i + 1) {
            Some(&MARKER) => {
                out.push(MARKER);
                i += 2;
            }
            Some(&hi) => {
                let lo = *bytes
                    .get(i + 2)
                    .ok_or_else(|| malformed("truncated hex escape"))?;
                out.push((hex_value(hi)? << 4) | hex_value(lo)?);
                i += 3;
            }
            None => return Err(malformed("dangling escape marker")),
        }
    }
    String::from_utf8(out).map_err(|_| malformed("escaped bytes are not UTF-8"))
}

fn hex_digit(nibble: u8) -> char {
    char::from_digit(u32::from(nibble), 16)
        .unwrap_or('0')
        .to_ascii_uppercase()
}

fn hex_value(b: u8) -> Result<u8> {
    (b as char)
        .to_digit(16)
        .map(|v| v as u8)
        .ok_or_else(|| malformed("invalid hex digit in escape"))
}

fn malformed(msg: &str) -> PenumbraError {
    PenumbraError::MalformedTerm(format!("blank node label: {msg}"))
}
