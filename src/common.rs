//! Types shared by the path classifier, the driver and the FUSE adapter.

use alloc::string::String;

use bitflags::bitflags;

bitflags! {
    pub struct AnfsPermission: u32 {
        const S_IFSOCK = 0o140000;
        const S_IFLNK = 0o120000;
        const S_IFREG = 0o100000;
        const S_IFBLK = 0o060000;
        const S_IFDIR = 0o040000;
        const S_IFCHR = 0o020000;
        const S_IFIFO = 0o010000;

        const S_ISUID = 0o004000;
        const S_ISGID = 0o002000;
        const S_ISVTX = 0o001000;

        const S_IRWXU = 0o700;
        const S_IRUSR = 0o400;
        const S_IWUSR = 0o200;
        const S_IXUSR = 0o100;
        const S_IRWXG = 0o070;
        const S_IRGRP = 0o040;
        const S_IWGRP = 0o020;
        const S_IXGRP = 0o010;
        const S_IRWXO = 0o007;
        const S_IROTH = 0o004;
        const S_IWOTH = 0o002;
        const S_IXOTH = 0o001;
    }
}

impl AnfsPermission {
    /// `drwxr-xr-x`
    pub fn dir() -> Self {
        Self::S_IFDIR | Self::from_bits_truncate(0o755)
    }

    /// `-rw-r--r--`
    pub fn file() -> Self {
        Self::S_IFREG | Self::from_bits_truncate(0o644)
    }

    /// Permission bits without the file type.
    pub fn perm_bits(&self) -> u16 {
        (self.bits() & 0o7777) as u16
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnfsFileType {
    File,
    Dir,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AnfsTimeSpec {
    pub sec: u64,
    pub nsec: u64,
}

impl AnfsTimeSpec {
    pub fn new(sec: u64, nsec: u64) -> Self {
        Self { sec, nsec }
    }
}

/// stat-equivalent record synthesized for a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnfsAttr {
    pub kind: AnfsFileType,
    pub size: u64,
    pub mode: AnfsPermission,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    pub atime: AnfsTimeSpec,
    pub mtime: AnfsTimeSpec,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnfsDirEntry {
    pub name: String,
    pub kind: AnfsFileType,
}

impl AnfsDirEntry {
    pub fn new(name: &str, kind: AnfsFileType) -> Self {
        Self {
            name: String::from(name),
            kind,
        }
    }
}

/// Clock and identity supplied by whatever process hosts the filesystem.
///
/// Values are queried on every request and never cached.
pub trait AnfsHost: Send + Sync {
    fn now(&self) -> AnfsTimeSpec;
    fn uid(&self) -> u32;
    fn gid(&self) -> u32;
}

#[derive(Debug, Clone, PartialEq, Eq, onlyerror::Error)]
pub enum AnfsError {
    #[error("no such file or directory")]
    NotFound,
    #[error("not a directory")]
    NotDir,
    #[error("is a directory")]
    IsDir,
    #[error("read-only filesystem")]
    ReadOnly,
    #[error("invalid code point specifier `{0}`")]
    InvalidSpecifier(String),
    #[error("path is not served by this filesystem")]
    ReadFailed,
    #[error("invalid offset")]
    InvalidOffset,
}

pub type AnfsResult<T> = Result<T, AnfsError>;
