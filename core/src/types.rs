use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

pub const ARCHIVE_EXTENSION: &str = ".tar.gz";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H%M%S";
const TIMESTAMP_WIDTH: usize = "YYYY-MM-DD_HHMMSS".len();
pub const DEFAULT_PREFIX: &str = "backup";

/// File name of a single backup archive: `<prefix>-<YYYY-MM-DD_HHMMSS>.tar.gz`.
///
/// The timestamp is zero-padded and fixed-width, so ordering names
/// lexicographically orders them chronologically within one prefix.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArchiveName(String);

impl ArchiveName {
    pub fn new(prefix: &str, timestamp: NaiveDateTime) -> Self {
        Self(format!(
            "{}-{}{}",
            prefix,
            timestamp.format(TIMESTAMP_FORMAT),
            ARCHIVE_EXTENSION
        ))
    }

    /// Wraps a file name found on disk. Returns `None` unless it is exactly
    /// `<prefix>-<YYYY-MM-DD_HHMMSS>.tar.gz`, so `db2-...` or `db-x-...`
    /// never join the `db` set.
    pub fn from_file_name(name: &str, prefix: &str) -> Option<Self> {
        let stamp = name
            .strip_prefix(prefix)?
            .strip_prefix('-')?
            .strip_suffix(ARCHIVE_EXTENSION)?;
        if stamp.len() != TIMESTAMP_WIDTH {
            return None;
        }
        NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()?;
        Some(Self(name.to_string()))
    }

    /// Wraps any `*.tar.gz` file name, for archives the user names
    /// explicitly.
    pub fn from_archive_file(name: &str) -> Option<Self> {
        name.ends_with(ARCHIVE_EXTENSION).then(|| Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Creation time encoded in the name, when the name follows the
    /// `<prefix>-<timestamp>.tar.gz` pattern.
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        let stem = self.0.strip_suffix(ARCHIVE_EXTENSION)?;
        let split = stem.len().checked_sub(TIMESTAMP_WIDTH)?;
        let stamp = stem.get(split..)?;
        if !stem.get(..split)?.ends_with('-') {
            return None;
        }
        NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()
    }
}

impl fmt::Display for ArchiveName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ArchiveName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationResult {
    Valid,
    NotFound,
    NotAnArchive,
    Corrupt,
}

impl VerificationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, VerificationResult::Valid)
    }
}

impl fmt::Display for VerificationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            VerificationResult::Valid => "valid",
            VerificationResult::NotFound => "file not found",
            VerificationResult::NotAnArchive => "not a tar archive",
            VerificationResult::Corrupt => "archive is corrupt",
        };
        f.write_str(text)
    }
}

/// Free space versus what a restore needs, both in exact bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SpaceReport {
    pub available_bytes: u64,
    pub required_bytes: u64,
}

impl SpaceReport {
    pub fn is_sufficient(&self) -> bool {
        crate::space::sufficient_space(self.required_bytes, self.available_bytes)
    }
}

/// What a content probe recognised at the start of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// Uncompressed tar stream.
    Tar,
    /// Gzip stream whose first block is a tar header or end-of-archive block.
    GzipTar,
    /// Gzip stream whose payload could not be decoded far enough to inspect.
    GzipOpaque,
    /// Gzip stream carrying something other than tar.
    Gzip,
    Unknown,
}

impl ContentKind {
    pub fn is_tar_family(&self) -> bool {
        matches!(
            self,
            ContentKind::Tar | ContentKind::GzipTar | ContentKind::GzipOpaque
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    Other,
}

/// One member of an archive's index.
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveEntry {
    pub path: PathBuf,
    pub size: u64,
    pub kind: EntryKind,
}

impl ArchiveEntry {
    pub fn is_file(&self) -> bool {
        matches!(self.kind, EntryKind::File)
    }
}

/// Resolved settings for one backup run.
#[derive(Debug, Clone)]
pub struct BackupPlan {
    pub source_dir: PathBuf,
    pub backup_dir: PathBuf,
    pub prefix: String,
    /// Number of newest archives to keep; 0 disables pruning.
    pub keep_count: usize,
    pub verify: bool,
}

/// Resolved settings for one restore run.
#[derive(Debug, Clone)]
pub struct RestorePlan {
    pub backup_dir: PathBuf,
    pub target_dir: PathBuf,
    pub prefix: String,
    /// Restore this archive instead of the latest one.
    pub archive: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PruneReport {
    pub kept: Vec<ArchiveName>,
    pub deleted: Vec<ArchiveName>,
    pub failed: Vec<PruneFailure>,
}

impl PruneReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PruneFailure {
    pub archive: ArchiveName,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BackupReport {
    pub archive: ArchiveName,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub verification: Option<VerificationResult>,
    pub pruned: Option<PruneReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RestoreReport {
    pub archive: ArchiveName,
    pub target: PathBuf,
    pub space: SpaceReport,
}
