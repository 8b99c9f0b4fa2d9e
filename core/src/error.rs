use crate::types::VerificationResult;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Source directory does not exist: {}", path.display())]
    SourceMissing { path: PathBuf },

    #[error("Path is not an existing directory: {}", path.display())]
    PathNotFound { path: PathBuf },

    #[error("Backup directory does not exist: {}", path.display())]
    DirectoryNotFound { path: PathBuf },

    #[error("No backups matching prefix '{prefix}' found in {}", dir.display())]
    NoBackupsFound { dir: PathBuf, prefix: String },

    #[error("Archive not found: {}", path.display())]
    ArchiveNotFound { path: PathBuf },

    #[error("Archive already exists: {}", path.display())]
    ArchiveExists { path: PathBuf },

    #[error("Failed to query free space on {}: {reason}", path.display())]
    FilesystemQueryFailed { path: PathBuf, reason: String },

    #[error("Failed to create archive {}: {reason}", path.display())]
    ArchiveCreation { path: PathBuf, reason: String },

    #[error("Archive verification failed for {}: {result}", path.display())]
    VerificationFailed {
        path: PathBuf,
        result: VerificationResult,
    },

    #[error("Archive cannot be read: {}: {reason}", path.display())]
    ArchiveUnreadable { path: PathBuf, reason: String },

    #[error("Insufficient space in {}: {required} bytes required, {available} bytes available", path.display())]
    InsufficientSpace {
        path: PathBuf,
        required: u64,
        available: u64,
    },

    #[error("Extraction of {} into {} failed: {reason}", archive.display(), target.display())]
    ExtractionFailed {
        archive: PathBuf,
        target: PathBuf,
        reason: String,
    },

    #[error("Lock conflict: {0}")]
    LockConflict(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
