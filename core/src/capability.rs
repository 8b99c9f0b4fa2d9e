use crate::types::{ArchiveEntry, ContentKind};
use crate::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Creates, inspects and unpacks compressed tar containers.
#[async_trait]
pub trait Archiver: Send + Sync {
    /// Writes an archive of everything under `source` into `archive`,
    /// skipping any path listed in `excludes`. Member paths are relative to
    /// `source`.
    async fn create(&self, source: &Path, archive: &Path, excludes: &[PathBuf]) -> Result<()>;

    /// Looks at the leading bytes of `archive` to decide what it contains.
    async fn probe(&self, archive: &Path) -> Result<ContentKind>;

    /// Reads the full member index through to the end of the stream.
    async fn list(&self, archive: &Path) -> Result<Vec<ArchiveEntry>>;

    async fn extract(&self, archive: &Path, target: &Path) -> Result<()>;
}

/// Read-only view of the local filesystem the engines need.
#[async_trait]
pub trait FilesystemProbe: Send + Sync {
    async fn is_dir(&self, path: &Path) -> bool;

    /// Bytes available to an unprivileged writer on the filesystem holding `path`.
    async fn available_space(&self, path: &Path) -> Result<u64>;
}
