#![cfg_attr(not(any(test, feature = "fuse")), no_std)]
extern crate alloc;

mod common;

pub mod codepoint;
pub mod config;
pub mod content;
pub mod driver;
pub mod inode;
pub mod path;

#[cfg(feature = "fuse")]
pub mod fuse;


pub use common::{
    AnfsAttr, AnfsDirEntry, AnfsError, AnfsFileType, AnfsHost, AnfsPermission, AnfsResult,
    AnfsTimeSpec,
};
pub use config::MountConfig;
pub use driver::{AnfsDriver, FileHandle};
pub use path::{PathPolicy, VirtualPath};
