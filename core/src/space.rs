use crate::capability::FilesystemProbe;
use crate::types::SpaceReport;
use crate::{Error, Result};
use std::path::Path;
use tracing::debug;

/// Free bytes on the filesystem holding `path`, which must be an existing
/// directory.
pub async fn available_bytes<F: FilesystemProbe + ?Sized>(probe: &F, path: &Path) -> Result<u64> {
    if !probe.is_dir(path).await {
        return Err(Error::PathNotFound {
            path: path.to_path_buf(),
        });
    }

    let available = probe.available_space(path).await.map_err(|e| match e {
        Error::FilesystemQueryFailed { .. } => e,
        other => Error::FilesystemQueryFailed {
            path: path.to_path_buf(),
            reason: other.to_string(),
        },
    })?;

    debug!(path = %path.display(), available, "Queried free space");
    Ok(available)
}

/// Equal is enough.
pub fn sufficient_space(required: u64, available: u64) -> bool {
    available >= required
}

/// Queries `path` and pairs the result with `required`.
pub async fn check<F: FilesystemProbe + ?Sized>(
    probe: &F,
    path: &Path,
    required: u64,
) -> Result<SpaceReport> {
    let available_bytes = available_bytes(probe, path).await?;
    Ok(SpaceReport {
        available_bytes,
        required_bytes: required,
    })
}
