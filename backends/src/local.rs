use async_trait::async_trait;
use std::path::Path;
use tarvault_core::{Error, FilesystemProbe, Result};
use tokio::fs;

/// Directory checks and free-space queries against the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFilesystem;

impl LocalFilesystem {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FilesystemProbe for LocalFilesystem {
    async fn is_dir(&self, path: &Path) -> bool {
        fs::metadata(path).await.map(|m| m.is_dir()).unwrap_or(false)
    }

    async fn available_space(&self, path: &Path) -> Result<u64> {
        let owned = path.to_path_buf();
        tokio::task::spawn_blocking(move || free_bytes(&owned))
            .await
            .map_err(|e| Error::FilesystemQueryFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
    }
}

#[cfg(unix)]
fn free_bytes(path: &Path) -> Result<u64> {
    let stat = nix::sys::statvfs::statvfs(path).map_err(|errno| Error::FilesystemQueryFailed {
        path: path.to_path_buf(),
        reason: errno.to_string(),
    })?;

    // blocks_available excludes the root-reserved blocks counted in blocks_free
    Ok((stat.blocks_available() as u64).saturating_mul(stat.fragment_size() as u64))
}

#[cfg(not(unix))]
fn free_bytes(path: &Path) -> Result<u64> {
    Err(Error::FilesystemQueryFailed {
        path: path.to_path_buf(),
        reason: "free space query is only supported on Unix".to_string(),
    })
}
