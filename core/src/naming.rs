use crate::types::ArchiveName;
use crate::{Error, Result};
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

pub fn new_name(prefix: &str, timestamp: NaiveDateTime) -> ArchiveName {
    ArchiveName::new(prefix, timestamp)
}

/// Every archive in one directory sharing a prefix, newest first.
///
/// Nothing is cached; each scan lists the directory again.
#[derive(Debug, Clone)]
pub struct BackupSet {
    dir: PathBuf,
    archives: Vec<ArchiveName>,
}

impl BackupSet {
    /// Lists regular files named `<prefix>-<YYYY-MM-DD_HHMMSS>.tar.gz` in `dir`.
    ///
    /// # Errors
    ///
    /// Returns `Error::DirectoryNotFound` if `dir` is not an existing directory.
    pub async fn scan<P: AsRef<Path>>(dir: P, prefix: &str) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();

        if !fs::metadata(&dir).await.map(|m| m.is_dir()).unwrap_or(false) {
            return Err(Error::DirectoryNotFound { path: dir });
        }

        let mut entries = fs::read_dir(&dir).await?;
        let mut archives = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(file_name) = entry.file_name().to_str() {
                if let Some(name) = ArchiveName::from_file_name(file_name, prefix) {
                    archives.push(name);
                }
            }
        }

        archives.sort_by(|a, b| b.cmp(a));
        debug!(dir = %dir.display(), prefix, count = archives.len(), "Scanned backup set");

        Ok(Self {
            dir,
            archives,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn archives(&self) -> &[ArchiveName] {
        &self.archives
    }

    pub fn len(&self) -> usize {
        self.archives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archives.is_empty()
    }

    pub fn latest(&self) -> Option<&ArchiveName> {
        self.archives.first()
    }

    pub fn path_of(&self, name: &ArchiveName) -> PathBuf {
        self.dir.join(name.as_str())
    }
}

/// Newest archive for `prefix` in `dir`.
pub async fn latest<P: AsRef<Path>>(dir: P, prefix: &str) -> Result<ArchiveName> {
    let set = BackupSet::scan(dir, prefix).await?;
    set.latest().cloned().ok_or_else(|| Error::NoBackupsFound {
        dir: set.dir.clone(),
        prefix: prefix.to_string(),
    })
}

/// Resolves `requested` (a file name inside `dir`) or, when absent, the
/// newest archive for `prefix`.
pub async fn select<P: AsRef<Path>>(
    dir: P,
    prefix: &str,
    requested: Option<&str>,
) -> Result<ArchiveName> {
    let dir = dir.as_ref();
    let Some(requested) = requested else {
        return latest(dir, prefix).await;
    };

    if !fs::metadata(dir).await.map(|m| m.is_dir()).unwrap_or(false) {
        return Err(Error::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }

    let path = dir.join(requested);
    let is_file = fs::metadata(&path).await.map(|m| m.is_file()).unwrap_or(false);
    match ArchiveName::from_archive_file(requested) {
        Some(name) if is_file && Path::new(requested).components().count() == 1 => Ok(name),
        _ => Err(Error::ArchiveNotFound { path }),
    }
}
