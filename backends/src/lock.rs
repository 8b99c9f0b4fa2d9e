use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tarvault_core::{Error, Result};
use tracing::debug;

pub const LOCK_FILE_NAME: &str = ".tarvault.lock";

/// Exclusive advisory lock on `<backup_dir>/.tarvault.lock`, held for the
/// lifetime of the value. A second run against the same directory fails
/// with `Error::LockConflict` instead of waiting.
#[derive(Debug)]
pub struct RunLock {
    #[cfg(unix)]
    _lock: nix::fcntl::Flock<File>,
    #[cfg(not(unix))]
    _file: File,
    path: PathBuf,
}

impl RunLock {
    pub fn acquire(dir: &Path) -> Result<Self> {
        let path = dir.join(LOCK_FILE_NAME);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)?;

        #[cfg(unix)]
        let lock = {
            use nix::errno::Errno;
            use nix::fcntl::{Flock, FlockArg};

            Flock::lock(file, FlockArg::LockExclusiveNonblock).map_err(|(_, errno)| {
                if errno == Errno::EWOULDBLOCK {
                    Error::LockConflict(format!(
                        "another tarvault run holds {}",
                        path.display()
                    ))
                } else {
                    Error::Io(std::io::Error::from(errno))
                }
            })?
        };

        debug!("Acquired run lock {}", path.display());
        Ok(Self {
            #[cfg(unix)]
            _lock: lock,
            #[cfg(not(unix))]
            _file: file,
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
