//! Synthetic file content.

use alloc::string::String;

use spin::Lazy;

use crate::{codepoint::Glyph, path::VirtualPath};

const ALPHA_LINE: &str = "abcdefghijklmnopqrstuvwxyz\n";
const NUMERIC_LINE: &str = "0123456789\n";
const REPEAT: usize = 5;

static ALPHA_CONTENT: Lazy<String> = Lazy::new(|| ALPHA_LINE.repeat(REPEAT));
static NUMERIC_CONTENT: Lazy<String> = Lazy::new(|| NUMERIC_LINE.repeat(REPEAT));

pub fn alpha_content() -> &'static [u8] {
    ALPHA_CONTENT.as_bytes()
}

pub fn numeric_content() -> &'static [u8] {
    NUMERIC_CONTENT.as_bytes()
}

/// Logical byte string behind a file path.
#[derive(Debug, Clone, Copy)]
pub enum Content {
    Static(&'static [u8]),
    Glyph(Glyph),
}

impl Content {
    /// Content for a classified path, or `None` when nothing is served for it.
    pub fn of(path: &VirtualPath) -> Option<Self> {
        match path {
            VirtualPath::AlphaData => Some(Content::Static(alpha_content())),
            VirtualPath::NumericData => Some(Content::Static(numeric_content())),
            VirtualPath::EmptyData => Some(Content::Static(&[])),
            VirtualPath::UnicodeLeaf(glyph) => Some(Content::Glyph(*glyph)),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Content::Static(bytes) => bytes,
            Content::Glyph(glyph) => glyph.as_bytes(),
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Copy the bytes at `offset` into `buf`; returns the count copied.
    ///
    /// Reads at or past the end copy nothing.
    pub fn read_at(&self, offset: u64, buf: &mut [u8]) -> usize {
        let data = self.as_bytes();
        let start = match usize::try_from(offset) {
            Ok(start) if start < data.len() => start,
            _ => return 0,
        };
        let bytes_to_read = core::cmp::min(buf.len(), data.len() - start);
        buf[..bytes_to_read].copy_from_slice(&data[start..start + bytes_to_read]);
        bytes_to_read
    }
}
