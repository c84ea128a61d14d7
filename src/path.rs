//! Path classification.
//!
//! Every request starts by mapping its path to a [`VirtualPath`]. Metadata,
//! directory listing and content are all derived from that one value.

use alloc::string::String;

use log::debug;
use serde::Deserialize;

use crate::codepoint::Glyph;

pub const ALPHA: &str = "alpha";
pub const NUMERIC: &str = "numeric";
pub const UNICODE: &str = "unicode";
pub const DATA: &str = "data";

const UNICODE_PREFIX: &str = "/unicode/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopDir {
    Alpha,
    Numeric,
    Unicode,
}

impl TopDir {
    pub const ALL: [TopDir; 3] = [TopDir::Alpha, TopDir::Numeric, TopDir::Unicode];

    pub fn name(&self) -> &'static str {
        match self {
            TopDir::Alpha => ALPHA,
            TopDir::Numeric => NUMERIC,
            TopDir::Unicode => UNICODE,
        }
    }

    fn from_path(path: &str) -> Option<Self> {
        match path {
            "/alpha" => Some(TopDir::Alpha),
            "/numeric" => Some(TopDir::Numeric),
            "/unicode" => Some(TopDir::Unicode),
            _ => None,
        }
    }
}

/// How loosely paths outside the fixed tree are matched.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathPolicy {
    /// Only the exact tree is served: `/data` paths outside `/alpha` and
    /// `/numeric` and stray `unicode...` paths are not found.
    #[default]
    Strict,
    /// Substring matching on `/data` paths and a size-2 placeholder for
    /// anything starting with `unicode`.
    Legacy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VirtualPath {
    Root,
    TopDir(TopDir),
    AlphaData,
    NumericData,
    UnicodeLeaf(Glyph),
    /// Legacy only: a `unicode...` path that is not under `/unicode/`.
    UnicodeStub,
    /// Legacy only: a `.../data` path naming neither content block.
    EmptyData,
    Unknown,
}

impl VirtualPath {
    /// Classify `path`. The first matching rule wins.
    pub fn classify(path: &str, policy: PathPolicy) -> Self {
        if let Some(spec) = path.strip_prefix(UNICODE_PREFIX) {
            if !spec.is_empty() {
                return match Glyph::from_specifier(spec) {
                    Ok(glyph) => VirtualPath::UnicodeLeaf(glyph),
                    Err(e) => {
                        debug!("{}: {}", path, e);
                        VirtualPath::Unknown
                    }
                };
            }
        }

        if path == "/" {
            return VirtualPath::Root;
        }
        if let Some(dir) = TopDir::from_path(path) {
            return VirtualPath::TopDir(dir);
        }

        match policy {
            PathPolicy::Strict => match path {
                "/alpha/data" => VirtualPath::AlphaData,
                "/numeric/data" => VirtualPath::NumericData,
                _ => VirtualPath::Unknown,
            },
            PathPolicy::Legacy => {
                if path.starts_with(UNICODE) {
                    VirtualPath::UnicodeStub
                } else if path.ends_with("/data") {
                    if path.contains(ALPHA) {
                        VirtualPath::AlphaData
                    } else if path.contains(NUMERIC) {
                        VirtualPath::NumericData
                    } else {
                        VirtualPath::EmptyData
                    }
                } else {
                    VirtualPath::Unknown
                }
            }
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, VirtualPath::Root | VirtualPath::TopDir(_))
    }
}

/// Child path of `parent`.
pub fn join(parent: &str, name: &str) -> String {
    let mut path = String::with_capacity(parent.len() + name.len() + 1);
    path.push_str(parent.trim_end_matches('/'));
    path.push('/');
    path.push_str(name);
    path
}

/// Parent directory of `path`; the root is its own parent.
pub fn parent(path: &str) -> &str {
    match path.trim_end_matches('/').rfind('/') {
        Some(0) | None => "/",
        Some(idx) => &path[..idx],
    }
}
