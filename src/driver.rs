//! The filesystem callbacks: resolve, list_children, open and read.
//!
//! All four are pure functions of their arguments plus the host clock and
//! identity. Nothing is cached between requests.

use alloc::vec::Vec;

use log::debug;

use crate::{
    common::{
        AnfsAttr, AnfsDirEntry, AnfsError, AnfsFileType, AnfsHost, AnfsPermission, AnfsResult,
    },
    content::Content,
    path::{PathPolicy, TopDir, VirtualPath, DATA},
};

/// Size reported for [`VirtualPath::UnicodeStub`].
const UNICODE_STUB_SIZE: u64 = 2;

/// Handle returned by every open. Reads are path driven, so it carries nothing.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FileHandle;

impl FileHandle {
    pub const RAW: u64 = 0x2aaa_aaaa;

    pub fn raw(&self) -> u64 {
        Self::RAW
    }
}

pub struct AnfsDriver<H> {
    host: H,
    policy: PathPolicy,
}

impl<H: AnfsHost> AnfsDriver<H> {
    pub fn new(host: H, policy: PathPolicy) -> Self {
        Self { host, policy }
    }

    pub fn policy(&self) -> PathPolicy {
        self.policy
    }

    pub fn classify(&self, path: &str) -> VirtualPath {
        VirtualPath::classify(path, self.policy)
    }

    /// Synthesize the metadata of `path`.
    pub fn resolve(&self, path: &str) -> AnfsResult<AnfsAttr> {
        debug!("resolve {}", path);
        let vpath = self.classify(path);
        let (kind, size) = match vpath {
            VirtualPath::Root | VirtualPath::TopDir(_) => (AnfsFileType::Dir, 0),
            VirtualPath::UnicodeStub => (AnfsFileType::File, UNICODE_STUB_SIZE),
            VirtualPath::Unknown => return Err(AnfsError::NotFound),
            _ => {
                let content = Content::of(&vpath).ok_or(AnfsError::NotFound)?;
                (AnfsFileType::File, content.len() as u64)
            }
        };
        Ok(self.attr(kind, size))
    }

    fn attr(&self, kind: AnfsFileType, size: u64) -> AnfsAttr {
        let (mode, nlink) = match kind {
            AnfsFileType::Dir => (AnfsPermission::dir(), 2),
            AnfsFileType::File => (AnfsPermission::file(), 1),
        };
        let now = self.host.now();
        AnfsAttr {
            kind,
            size,
            mode,
            nlink,
            uid: self.host.uid(),
            gid: self.host.gid(),
            atime: now,
            mtime: now,
        }
    }

    /// Entries of a fixed directory, starting with `.` and `..`.
    ///
    /// `/unicode` lists nothing else: its leaves are reachable by name only.
    pub fn list_children(&self, path: &str) -> AnfsResult<Vec<AnfsDirEntry>> {
        debug!("list_children {}", path);
        let mut entries = Vec::with_capacity(5);
        entries.push(AnfsDirEntry::new(".", AnfsFileType::Dir));
        entries.push(AnfsDirEntry::new("..", AnfsFileType::Dir));

        match self.classify(path) {
            VirtualPath::Root => {
                for dir in TopDir::ALL {
                    entries.push(AnfsDirEntry::new(dir.name(), AnfsFileType::Dir));
                }
            }
            VirtualPath::TopDir(TopDir::Unicode) => {}
            VirtualPath::TopDir(_) => {
                entries.push(AnfsDirEntry::new(DATA, AnfsFileType::File));
            }
            _ => return Err(AnfsError::NotFound),
        }
        Ok(entries)
    }

    /// Issue a handle. The caller has already resolved `path`, and access
    /// checks belong to the transport.
    pub fn open(&self, path: &str, flags: i32) -> FileHandle {
        debug!("open {} flags={:#x}", path, flags);
        FileHandle
    }

    /// Fill `buf` from `offset` into the content of `path`.
    ///
    /// Returns 0 at or past the end, and [`AnfsError::ReadFailed`] for paths
    /// that have no content at all.
    pub fn read(
        &self,
        path: &str,
        _handle: FileHandle,
        offset: u64,
        buf: &mut [u8],
    ) -> AnfsResult<usize> {
        debug!("read {} offset={} len={}", path, offset, buf.len());
        let vpath = self.classify(path);
        if vpath.is_dir() {
            return Err(AnfsError::IsDir);
        }
        let content = Content::of(&vpath).ok_or(AnfsError::ReadFailed)?;
        Ok(content.read_at(offset, buf))
    }
}
