use crate::naming::BackupSet;
use crate::types::{PruneFailure, PruneReport};
use crate::Result;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

/// Keeps the `keep` newest archives for `prefix` in `dir` and deletes the
/// rest, oldest first.
///
/// A file that cannot be deleted is recorded in [`PruneReport::failed`] and
/// the remaining deletions still run. Callers treat `keep == 0` as "pruning
/// disabled" and never call this with it; if they do, every archive goes.
pub async fn prune<P: AsRef<Path>>(dir: P, prefix: &str, keep: usize) -> Result<PruneReport> {
    let set = BackupSet::scan(dir, prefix).await?;
    Ok(prune_set(&set, keep, |path| async move { fs::remove_file(path).await }).await)
}

async fn prune_set<F, Fut>(set: &BackupSet, keep: usize, mut remove: F) -> PruneReport
where
    F: FnMut(PathBuf) -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    let mut report = PruneReport::default();

    if set.len() <= keep {
        report.kept = set.archives().to_vec();
        return report;
    }

    let (kept, expired) = set.archives().split_at(keep);
    report.kept = kept.to_vec();

    for archive in expired.iter().rev() {
        match remove(set.path_of(archive)).await {
            Ok(()) => {
                info!("Removed old backup: {}", archive);
                report.deleted.push(archive.clone());
            }
            Err(e) => {
                warn!("Failed to remove old backup {}: {}", archive, e);
                report.failed.push(PruneFailure {
                    archive: archive.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    report
}
