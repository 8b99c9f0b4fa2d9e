use crate::capability::Archiver;
use crate::types::VerificationResult;
use crate::Result;
use std::path::Path;
use tokio::fs;
use tracing::{debug, warn};

/// Structural check of an archive on disk.
///
/// Stops at the first failing step: the file must exist, its leading bytes
/// must look like a tar-family container, and the whole member index must
/// read back without decompression or checksum errors. Member payloads are
/// not extracted.
///
/// Only I/O failures unrelated to the archive's contents (for example, a
/// failing `stat`) surface as `Err`.
pub async fn verify<A: Archiver + ?Sized>(archiver: &A, path: &Path) -> Result<VerificationResult> {
    match fs::metadata(path).await {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => return Ok(VerificationResult::NotFound),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(VerificationResult::NotFound);
        }
        Err(e) => return Err(e.into()),
    }

    let kind = match archiver.probe(path).await {
        Ok(kind) => kind,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Content probe failed");
            return Ok(VerificationResult::NotAnArchive);
        }
    };
    debug!(path = %path.display(), ?kind, "Probed archive content");

    if !kind.is_tar_family() {
        return Ok(VerificationResult::NotAnArchive);
    }

    match archiver.list(path).await {
        Ok(entries) => {
            debug!(path = %path.display(), members = entries.len(), "Archive index readable");
            Ok(VerificationResult::Valid)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Archive index unreadable");
            Ok(VerificationResult::Corrupt)
        }
    }
}
