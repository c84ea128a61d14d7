//! Code point specifiers.
//!
//! A specifier is the final segment of a `/unicode/...` path: an optional
//! `U+`/`u+`/`0x`/`0X` prefix followed by up to eight hex digits naming a
//! Unicode scalar value, e.g. `U+1F600`, `0x41` or `e9`.

use alloc::string::ToString;

use crate::common::{AnfsError, AnfsResult};

const MAX_HEX_DIGITS: usize = 8;

/// Longest glyph: four UTF-8 bytes plus the trailing newline.
pub const GLYPH_MAX_LEN: usize = 5;

/// Parse a specifier into the character it names.
pub fn parse_specifier(spec: &str) -> AnfsResult<char> {
    let invalid = || AnfsError::InvalidSpecifier(spec.to_string());

    let digits = ["U+", "u+", "0x", "0X"]
        .iter()
        .find_map(|prefix| spec.strip_prefix(prefix))
        .unwrap_or(spec);

    if digits.is_empty()
        || digits.len() > MAX_HEX_DIGITS
        || !digits.bytes().all(|b| b.is_ascii_hexdigit())
    {
        return Err(invalid());
    }

    let value = u32::from_str_radix(digits, 16).map_err(|_| invalid())?;
    char::from_u32(value).ok_or_else(invalid)
}

/// UTF-8 bytes of `c` followed by `\n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyph {
    buf: [u8; GLYPH_MAX_LEN],
    len: usize,
}

impl Glyph {
    pub fn new(c: char) -> Self {
        let mut buf = [0u8; GLYPH_MAX_LEN];
        let len = c.encode_utf8(&mut buf).len();
        buf[len] = b'\n';
        Self { buf, len: len + 1 }
    }

    pub fn from_specifier(spec: &str) -> AnfsResult<Self> {
        parse_specifier(spec).map(Self::new)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }
}
