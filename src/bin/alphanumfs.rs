use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
};

use alphanumfs::{fuse, MountConfig};
use clap::Parser;
use log::error;

#[derive(Parser, Debug)]
#[command(
    name = "alphanumfs",
    version,
    about = "Mount a read-only filesystem of synthetic alphabet, digit and unicode files"
)]
struct Args {
    /// Directory to mount on; created if it does not exist
    mountpoint: PathBuf,

    /// JSON mount configuration
    config: Option<PathBuf>,
}

fn load_config(path: Option<&Path>) -> Result<MountConfig, String> {
    let Some(path) = path else {
        return Ok(MountConfig::default());
    };
    let json = fs::read_to_string(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    MountConfig::from_json(&json).map_err(|e| format!("{}: {}", path.display(), e))
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let mountpoint = args.mountpoint;
    if !mountpoint.is_dir() {
        if let Err(e) = fs::create_dir_all(&mountpoint) {
            eprintln!("cannot create {}: {}", mountpoint.display(), e);
            return ExitCode::FAILURE;
        }
    }
    let mountpoint = fs::canonicalize(&mountpoint).unwrap_or(mountpoint);
    println!("Mount point: {}", mountpoint.display());

    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("bad config {}", e);
            return ExitCode::FAILURE;
        }
    };

    match fuse::mount(&mountpoint, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("mount failed: {}", e);
            eprintln!("mount failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
