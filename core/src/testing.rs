use crate::capability::{Archiver, FilesystemProbe};
use crate::types::{ArchiveEntry, ContentKind, EntryKind};
use crate::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct MockArchiver {
    pub payload: Vec<u8>,
    pub kind: ContentKind,
    pub entries: Option<Vec<ArchiveEntry>>,
    pub fail_extract: bool,
    pub creates: AtomicUsize,
    pub extracts: AtomicUsize,
    pub excludes_seen: Mutex<Vec<PathBuf>>,
}

impl MockArchiver {
    pub fn new() -> Self {
        Self {
            payload: b"mock archive payload".to_vec(),
            kind: ContentKind::GzipTar,
            entries: Some(vec![
                entry("a.txt", 4000),
                entry("nested/b.txt", 3000),
                ArchiveEntry {
                    path: PathBuf::from("nested"),
                    size: 0,
                    kind: EntryKind::Directory,
                },
            ]),
            fail_extract: false,
            creates: AtomicUsize::new(0),
            extracts: AtomicUsize::new(0),
            excludes_seen: Mutex::new(Vec::new()),
        }
    }

    pub fn with_kind(mut self, kind: ContentKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn unreadable(mut self) -> Self {
        self.entries = None;
        self
    }

    pub fn failing_extract(mut self) -> Self {
        self.fail_extract = true;
        self
    }

    pub fn estimated_size(&self) -> u64 {
        self.entries
            .as_ref()
            .map(|entries| entries.iter().map(|e| e.size).sum())
            .unwrap_or(0)
    }

    pub fn create_count(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn extract_count(&self) -> usize {
        self.extracts.load(Ordering::SeqCst)
    }
}

pub fn entry(path: &str, size: u64) -> ArchiveEntry {
    ArchiveEntry {
        path: PathBuf::from(path),
        size,
        kind: EntryKind::File,
    }
}

#[async_trait]
impl Archiver for MockArchiver {
    async fn create(&self, _source: &Path, archive: &Path, excludes: &[PathBuf]) -> Result<()> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.excludes_seen
            .lock()
            .unwrap()
            .extend(excludes.iter().cloned());
        tokio::fs::write(archive, &self.payload).await?;
        Ok(())
    }

    async fn probe(&self, _archive: &Path) -> Result<ContentKind> {
        Ok(self.kind)
    }

    async fn list(&self, archive: &Path) -> Result<Vec<ArchiveEntry>> {
        self.entries.clone().ok_or_else(|| Error::ArchiveUnreadable {
            path: archive.to_path_buf(),
            reason: "unexpected end of stream".to_string(),
        })
    }

    async fn extract(&self, archive: &Path, target: &Path) -> Result<()> {
        self.extracts.fetch_add(1, Ordering::SeqCst);
        if self.fail_extract {
            return Err(Error::ExtractionFailed {
                archive: archive.to_path_buf(),
                target: target.to_path_buf(),
                reason: "disk I/O error".to_string(),
            });
        }
        tokio::fs::write(target.join("restored.marker"), b"ok").await?;
        Ok(())
    }
}

pub struct MockFilesystem {
    available: Option<u64>,
    dirs: Vec<PathBuf>,
}

impl MockFilesystem {
    pub fn new(available: u64) -> Self {
        Self {
            available: Some(available),
            dirs: Vec::new(),
        }
    }

    pub fn failing() -> Self {
        Self {
            available: None,
            dirs: Vec::new(),
        }
    }

    /// Treat `path` as an existing directory even though it is not on disk.
    pub fn with_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.dirs.push(path.into());
        self
    }
}

#[async_trait]
impl FilesystemProbe for MockFilesystem {
    async fn is_dir(&self, path: &Path) -> bool {
        self.dirs.iter().any(|d| d == path) || path.is_dir()
    }

    async fn available_space(&self, path: &Path) -> Result<u64> {
        self.available.ok_or_else(|| Error::FilesystemQueryFailed {
            path: path.to_path_buf(),
            reason: "statvfs: permission denied".to_string(),
        })
    }
}
