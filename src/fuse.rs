//! `fuser` binding.
//!
//! Translates inode-addressed kernel requests into path-addressed driver
//! calls. Inode numbers come from [`InodeTable`].

use std::{
    ffi::OsStr,
    io,
    path::Path,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use fuser::{
    FileAttr, FileType, Filesystem, KernelConfig, MountOption, ReplyAttr, ReplyData,
    ReplyDirectory, ReplyEmpty, ReplyEntry, ReplyOpen, ReplyStatfs, Request,
};
use libc::c_int;
use log::{debug, info};

use crate::{
    common::{
        AnfsAttr, AnfsDirEntry, AnfsError, AnfsFileType, AnfsHost, AnfsResult, AnfsTimeSpec,
    },
    config::MountConfig,
    driver::{AnfsDriver, FileHandle},
    inode::{InodeTable, ROOT_INO},
    path,
};

const BLOCK_SIZE: u32 = 4096;
const NAME_MAX: u32 = 255;

/// Clock and credentials of the current process.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemHost;

impl AnfsHost for SystemHost {
    fn now(&self) -> AnfsTimeSpec {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| AnfsTimeSpec::new(d.as_secs(), d.subsec_nanos() as u64))
            .unwrap_or_default()
    }

    fn uid(&self) -> u32 {
        unsafe { libc::getuid() }
    }

    fn gid(&self) -> u32 {
        unsafe { libc::getgid() }
    }
}

impl AnfsError {
    pub fn errno(&self) -> c_int {
        match self {
            AnfsError::NotFound | AnfsError::InvalidSpecifier(_) => libc::ENOENT,
            AnfsError::NotDir => libc::ENOTDIR,
            AnfsError::IsDir => libc::EISDIR,
            AnfsError::ReadOnly => libc::EROFS,
            AnfsError::ReadFailed => libc::EIO,
            AnfsError::InvalidOffset => libc::EINVAL,
        }
    }
}

impl From<AnfsFileType> for FileType {
    fn from(kind: AnfsFileType) -> Self {
        match kind {
            AnfsFileType::File => FileType::RegularFile,
            AnfsFileType::Dir => FileType::Directory,
        }
    }
}

fn system_time(ts: AnfsTimeSpec) -> SystemTime {
    UNIX_EPOCH + Duration::new(ts.sec, ts.nsec as u32)
}

fn file_attr(ino: u64, attr: &AnfsAttr) -> FileAttr {
    let mtime = system_time(attr.mtime);
    FileAttr {
        ino,
        size: attr.size,
        blocks: attr.size.div_ceil(512),
        atime: system_time(attr.atime),
        mtime,
        ctime: mtime,
        crtime: mtime,
        kind: attr.kind.into(),
        perm: attr.mode.perm_bits(),
        nlink: attr.nlink,
        uid: attr.uid,
        gid: attr.gid,
        rdev: 0,
        blksize: BLOCK_SIZE,
        flags: 0,
    }
}

fn is_write_access(flags: i32) -> bool {
    flags & libc::O_ACCMODE != libc::O_RDONLY || flags & (libc::O_APPEND | libc::O_TRUNC) != 0
}


/// One `readdir` reply entry: inode, resume cookie, entry.
type DirSlot = (u64, i64, AnfsDirEntry);

pub struct AnfsFuse<H: AnfsHost = SystemHost> {
    driver: AnfsDriver<H>,
    inodes: InodeTable,
    ttl: Duration,
}

impl AnfsFuse<SystemHost> {
    pub fn new(config: &MountConfig) -> Self {
        Self::with_host(SystemHost, config)
    }
}

impl<H: AnfsHost> AnfsFuse<H> {
    pub fn with_host(host: H, config: &MountConfig) -> Self {
        Self {
            driver: AnfsDriver::new(host, config.policy),
            inodes: InodeTable::new(),
            ttl: Duration::from_millis(config.attr_ttl_ms),
        }
    }

    fn path_of(&self, ino: u64) -> AnfsResult<String> {
        self.inodes.path(ino).ok_or(AnfsError::NotFound)
    }

    fn attr_of(&self, ino: u64) -> AnfsResult<(String, AnfsAttr)> {
        let path = self.path_of(ino)?;
        let attr = self.driver.resolve(&path)?;
        Ok((path, attr))
    }

    /// Resolve `name` under `parent` and count a kernel lookup of it.
    fn lookup_child(&self, parent: u64, name: &OsStr) -> AnfsResult<(u64, AnfsAttr)> {
        let name = name.to_str().ok_or(AnfsError::NotFound)?;
        let child = path::join(&self.path_of(parent)?, name);
        let attr = self.driver.resolve(&child)?;
        Ok((self.inodes.remember(&child), attr))
    }

    fn check_dir(&self, ino: u64) -> AnfsResult<()> {
        match self.attr_of(ino)? {
            (_, attr) if attr.kind == AnfsFileType::Dir => Ok(()),
            _ => Err(AnfsError::NotDir),
        }
    }

    /// Entries of directory `ino` after the cookie `offset`.
    fn dir_entries(&self, ino: u64, offset: i64) -> AnfsResult<Vec<DirSlot>> {
        let dir = self.path_of(ino)?;
        let entries = self.driver.list_children(&dir)?;
        let slots = entries
            .into_iter()
            .enumerate()
            .skip(offset.max(0) as usize)
            .map(|(i, entry)| {
                let entry_ino = match entry.name.as_str() {
                    "." => ino,
                    ".." => self.inodes.lookup(path::parent(&dir)).unwrap_or(ROOT_INO),
                    name => self.inodes.ino_for(&path::join(&dir, name)),
                };
                (entry_ino, (i + 1) as i64, entry)
            })
            .collect();
        Ok(slots)
    }

    fn open_file(&self, ino: u64, flags: i32) -> AnfsResult<FileHandle> {
        let (path, _) = self.attr_of(ino)?;
        if is_write_access(flags) {
            return Err(AnfsError::ReadOnly);
        }
        Ok(self.driver.open(&path, flags))
    }

    fn read_file(&self, ino: u64, offset: i64, size: u32) -> AnfsResult<Vec<u8>> {
        let offset = u64::try_from(offset).map_err(|_| AnfsError::InvalidOffset)?;
        let path = self.path_of(ino)?;
        let mut buf = vec![0u8; size as usize];
        let n = self
            .driver
            .read(&path, FileHandle, offset, &mut buf)
            .map_err(|e| {
                debug!("read {} failed: {}", path, e);
                e
            })?;
        buf.truncate(n);
        Ok(buf)
    }
}

impl<H: AnfsHost + 'static> Filesystem for AnfsFuse<H> {
    fn init(&mut self, _req: &Request<'_>, _config: &mut KernelConfig) -> Result<(), c_int> {
        info!("alphanumfs mounted, policy {:?}", self.driver.policy());
        Ok(())
    }

    fn destroy(&mut self) {
        info!("alphanumfs unmounted, {} inodes live", self.inodes.len());
    }

    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        match self.lookup_child(parent, name) {
            Ok((ino, attr)) => reply.entry(&self.ttl, &file_attr(ino, &attr), 0),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn forget(&mut self, _req: &Request<'_>, ino: u64, nlookup: u64) {
        self.inodes.forget(ino, nlookup);
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        match self.attr_of(ino) {
            Ok((_, attr)) => reply.attr(&self.ttl, &file_attr(ino, &attr)),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn opendir(&mut self, _req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        match self.check_dir(ino) {
            Ok(()) => reply.opened(0, 0),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        match self.dir_entries(ino, offset) {
            Ok(slots) => {
                for (entry_ino, cookie, entry) in slots {
                    // true means the reply buffer is full
                    if reply.add(entry_ino, cookie, entry.kind.into(), &entry.name) {
                        break;
                    }
                }
                reply.ok();
            }
            Err(e) => reply.error(e.errno()),
        }
    }

    fn releasedir(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        _fh: u64,
        _flags: i32,
        reply: ReplyEmpty,
    ) {
        reply.ok();
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        match self.open_file(ino, flags) {
            Ok(handle) => reply.opened(handle.raw(), 0),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        match self.read_file(ino, offset, size) {
            Ok(data) => reply.data(&data),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        _fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        reply.ok();
    }

    fn statfs(&mut self, _req: &Request<'_>, _ino: u64, reply: ReplyStatfs) {
        reply.statfs(0, 0, 0, 0, 0, BLOCK_SIZE, NAME_MAX, BLOCK_SIZE);
    }

    fn access(&mut self, _req: &Request<'_>, ino: u64, mask: i32, reply: ReplyEmpty) {
        if let Err(e) = self.attr_of(ino) {
            reply.error(e.errno());
            return;
        }
        if mask & libc::W_OK != 0 {
            reply.error(AnfsError::ReadOnly.errno());
            return;
        }
        reply.ok();
    }
}

fn mount_options(config: &MountConfig) -> Vec<MountOption> {
    let mut options = vec![
        MountOption::FSName(config.fs_name.clone()),
        MountOption::RO,
    ];
    if config.allow_other {
        options.push(MountOption::AllowOther);
    }
    // fuser turns AutoUnmount alone into AllowOther, which fusermount
    // refuses for ordinary users without user_allow_other.
    if config.auto_unmount && config.allow_other {
        options.push(MountOption::AutoUnmount);
    }
    options
}

/// Mount at `mountpoint` and serve requests until unmounted.
pub fn mount<P: AsRef<Path>>(mountpoint: P, config: &MountConfig) -> io::Result<()> {
    let mountpoint = mountpoint.as_ref();
    info!("mounting {} at {}", config.fs_name, mountpoint.display());
    fuser::mount2(AnfsFuse::new(config), mountpoint, &mount_options(config))
}

/// Mount in a background thread; unmounts when the session is dropped.
pub fn spawn_mount<P: AsRef<Path>>(
    mountpoint: P,
    config: &MountConfig,
) -> io::Result<fuser::BackgroundSession> {
    fuser::spawn_mount2(AnfsFuse::new(config), mountpoint, &mount_options(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedHost;

    impl AnfsHost for FixedHost {
        fn now(&self) -> AnfsTimeSpec {
            AnfsTimeSpec::new(86_400, 0)
        }
        fn uid(&self) -> u32 {
            1000
        }
        fn gid(&self) -> u32 {
            1000
        }
    }

    fn fixture() -> AnfsFuse<FixedHost> {
        AnfsFuse::with_host(FixedHost, &MountConfig::default())
    }

    fn names(slots: &[DirSlot]) -> Vec<&str> {
        slots.iter().map(|(_, _, e)| e.name.as_str()).collect()
    }

    #[test]
    fn test_errno_mapping() {
        assert_eq!(AnfsError::NotFound.errno(), libc::ENOENT);
        assert_eq!(AnfsError::InvalidSpecifier("zz".into()).errno(), libc::ENOENT);
        assert_eq!(AnfsError::NotDir.errno(), libc::ENOTDIR);
        assert_eq!(AnfsError::ReadFailed.errno(), libc::EIO);
        assert_eq!(AnfsError::ReadOnly.errno(), libc::EROFS);
    }

    #[test]
    fn test_write_access_flags() {
        assert!(!is_write_access(libc::O_RDONLY));
        assert!(is_write_access(libc::O_WRONLY));
        assert!(is_write_access(libc::O_RDWR));
        assert!(is_write_access(libc::O_RDONLY | libc::O_TRUNC));
    }

    #[test]
    fn test_mount_options_are_read_only() {
        let options = mount_options(&MountConfig::default());
        assert_eq!(
            options,
            [MountOption::FSName("alphanumfs".to_string()), MountOption::RO]
        );

        let shared = MountConfig {
            allow_other: true,
            auto_unmount: true,
            ..MountConfig::default()
        };
        let options = mount_options(&shared);
        assert!(options.contains(&MountOption::AllowOther));
        assert!(options.contains(&MountOption::AutoUnmount));
    }

    #[test]
    fn test_auto_unmount_needs_allow_other() {
        let config = MountConfig {
            auto_unmount: true,
            ..MountConfig::default()
        };
        assert!(!mount_options(&config).contains(&MountOption::AutoUnmount));
    }

    #[test]
    fn test_file_attr_conversion() {
        let fs = fixture();
        let attr = fs.driver.resolve("/alpha/data").unwrap();
        let fattr = file_attr(5, &attr);
        assert_eq!(fattr.size, 135);
        assert_eq!(fattr.perm, 0o644);
        assert_eq!(fattr.kind, FileType::RegularFile);
        assert_eq!(fattr.nlink, 1);
        assert_eq!(fattr.mtime, UNIX_EPOCH + Duration::from_secs(86_400));
    }

    #[test]
    fn test_readdir_resumes_from_offset() {
        let fs = fixture();

        let all = fs.dir_entries(ROOT_INO, 0).unwrap();
        assert_eq!(names(&all), [".", "..", "alpha", "numeric", "unicode"]);
        let cookies: Vec<i64> = all.iter().map(|(_, c, _)| *c).collect();
        assert_eq!(cookies, [1, 2, 3, 4, 5]);
        let inos: Vec<u64> = all.iter().map(|(i, _, _)| *i).collect();
        assert_eq!(inos, [ROOT_INO, ROOT_INO, 2, 3, 4]);

        let rest = fs.dir_entries(ROOT_INO, 2).unwrap();
        assert_eq!(names(&rest), ["alpha", "numeric", "unicode"]);
        assert_eq!(rest[0].1, 3);

        assert!(fs.dir_entries(ROOT_INO, 5).unwrap().is_empty());
        assert_eq!(fs.dir_entries(ROOT_INO, -1).unwrap().len(), 5);
    }

    #[test]
    fn test_readdir_parent_inodes() {
        let fs = fixture();
        let alpha = fs.dir_entries(2, 0).unwrap();
        assert_eq!(names(&alpha), [".", "..", "data"]);
        assert_eq!((alpha[0].0, alpha[1].0, alpha[2].0), (2, ROOT_INO, 5));

        let unicode = fs.dir_entries(4, 0).unwrap();
        assert_eq!((unicode[0].0, unicode[1].0), (4, ROOT_INO));

        let (leaf, _) = fs.lookup_child(4, OsStr::new("41")).unwrap();
        assert_eq!(
            fs.inodes.lookup(path::parent(&fs.path_of(leaf).unwrap())),
            Some(4)
        );
        assert_eq!(fs.dir_entries(leaf, 0), Err(AnfsError::NotFound));
        assert_eq!(fs.check_dir(leaf), Err(AnfsError::NotDir));
        assert_eq!(fs.check_dir(4), Ok(()));
    }

    #[test]
    fn test_lookup_registers_and_forget_evicts() {
        let fs = fixture();
        let (ino, attr) = fs.lookup_child(4, OsStr::new("U+0041")).unwrap();
        assert!(ino >= 7);
        assert_eq!(attr.size, 2);
        assert_eq!(fs.path_of(ino).as_deref(), Ok("/unicode/U+0041"));
        assert_eq!(fs.inodes.len(), 7);

        assert_eq!(
            fs.lookup_child(4, OsStr::new("zz")),
            Err(AnfsError::NotFound)
        );
        assert_eq!(fs.inodes.len(), 7);

        fs.inodes.forget(ino, 1);
        assert_eq!(fs.inodes.len(), 6);
        assert_eq!(fs.attr_of(ino), Err(AnfsError::NotFound));
    }

    #[test]
    fn test_open_rejects_writes() {
        let fs = fixture();
        assert_eq!(fs.open_file(5, libc::O_RDONLY), Ok(FileHandle));
        assert_eq!(fs.open_file(5, libc::O_WRONLY), Err(AnfsError::ReadOnly));
        assert_eq!(fs.open_file(6, libc::O_RDWR), Err(AnfsError::ReadOnly));
        assert_eq!(fs.open_file(99, libc::O_RDONLY), Err(AnfsError::NotFound));
    }

    #[test]
    fn test_read_through_inodes() {
        let fs = fixture();
        assert_eq!(fs.read_file(5, 0, 10).unwrap(), b"abcdefghij");
        assert_eq!(fs.read_file(6, 50, 100).unwrap(), b"6789\n");
        assert_eq!(fs.read_file(6, 200, 10).unwrap(), b"");
        assert_eq!(fs.read_file(5, -1, 10), Err(AnfsError::InvalidOffset));
        assert_eq!(fs.read_file(2, 0, 10), Err(AnfsError::IsDir));

        let (leaf, _) = fs.lookup_child(4, OsStr::new("20AC")).unwrap();
        assert_eq!(fs.read_file(leaf, 0, 64).unwrap(), "€\n".as_bytes());
    }
}
