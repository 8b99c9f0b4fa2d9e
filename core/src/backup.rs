use crate::capability::{Archiver, FilesystemProbe};
use crate::naming::new_name;
use crate::size::humanize;
use crate::types::{BackupPlan, BackupReport};
use crate::{Error, Result, retention, verify};
use chrono::{Local, NaiveDateTime};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, error, info, warn};

const STAGING_PREFIX: &str = ".tarvault-staging-";

/// Where a backup run currently stands. A run that returns `Err` failed in
/// the stage it last reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupStage {
    Idle,
    SourceValidated,
    Archived,
    Verified,
    Pruned,
    Done,
}

impl fmt::Display for BackupStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackupStage::Idle => "idle",
            BackupStage::SourceValidated => "source-validated",
            BackupStage::Archived => "archived",
            BackupStage::Verified => "verified",
            BackupStage::Pruned => "pruned",
            BackupStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Creates one archive, then optionally verifies it and prunes older ones.
///
/// Pruning only ever happens after the new archive exists and, if requested,
/// verified as `Valid`.
pub struct BackupEngine<A, F> {
    archiver: A,
    probe: F,
}

impl<A: Archiver, F: FilesystemProbe> BackupEngine<A, F> {
    pub fn new(archiver: A, probe: F) -> Self {
        Self { archiver, probe }
    }

    pub fn archiver(&self) -> &A {
        &self.archiver
    }

    /// Runs a backup named after the current local time.
    pub async fn run(&self, plan: &BackupPlan) -> Result<BackupReport> {
        self.run_at(plan, Local::now().naive_local()).await
    }

    /// Runs a backup whose archive name carries `timestamp`.
    pub async fn run_at(&self, plan: &BackupPlan, timestamp: NaiveDateTime) -> Result<BackupReport> {
        info!(
            "Starting backup of {} into {}",
            plan.source_dir.display(),
            plan.backup_dir.display()
        );

        let mut stage = BackupStage::Idle;
        let result = self.execute(plan, timestamp, &mut stage).await;

        match &result {
            Ok(report) => info!(
                "Backup completed: {} ({})",
                report.archive,
                humanize(report.size_bytes)
            ),
            Err(e) => error!(stage = %stage, "Backup failed: {}", e),
        }
        result
    }

    async fn execute(
        &self,
        plan: &BackupPlan,
        timestamp: NaiveDateTime,
        stage: &mut BackupStage,
    ) -> Result<BackupReport> {
        if !self.probe.is_dir(&plan.source_dir).await {
            return Err(Error::SourceMissing {
                path: plan.source_dir.clone(),
            });
        }
        advance(stage, BackupStage::SourceValidated);

        fs::create_dir_all(&plan.backup_dir).await?;

        let archive = new_name(&plan.prefix, timestamp);
        let path = plan.backup_dir.join(archive.as_str());
        if fs::try_exists(&path).await? {
            return Err(Error::ArchiveExists { path });
        }

        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .suffix(".partial")
            .tempfile_in(&plan.backup_dir)?
            .into_temp_path();
        let excludes = self.excludes(&plan.backup_dir, &staging).await?;
        debug!(?excludes, "Excluding paths from archive");

        self.archiver
            .create(&plan.source_dir, &staging, &excludes)
            .await?;
        advance(stage, BackupStage::Archived);

        // Verified before it gets its final name, so a bad archive never
        // joins the backup set. Dropping `staging` removes it.
        let verification = if plan.verify {
            let result = verify::verify(&self.archiver, &staging).await?;
            if !result.is_valid() {
                return Err(Error::VerificationFailed { path, result });
            }
            info!("Archive verified: {}", archive);
            advance(stage, BackupStage::Verified);
            Some(result)
        } else {
            None
        };

        staging.persist_noclobber(&path).map_err(|e| {
            if e.error.kind() == io::ErrorKind::AlreadyExists {
                Error::ArchiveExists { path: path.clone() }
            } else {
                Error::Io(e.error)
            }
        })?;

        let size_bytes = fs::metadata(&path).await?.len();
        info!("Archive created: {} ({} bytes, {})", archive, size_bytes, humanize(size_bytes));

        let pruned = if plan.keep_count > 0 {
            let report = retention::prune(&plan.backup_dir, &plan.prefix, plan.keep_count).await?;
            if report.is_clean() {
                info!(
                    "Retention applied: kept {}, removed {}",
                    report.kept.len(),
                    report.deleted.len()
                );
            } else {
                warn!(
                    "Retention applied with errors: kept {}, removed {}, failed {}",
                    report.kept.len(),
                    report.deleted.len(),
                    report.failed.len()
                );
            }
            advance(stage, BackupStage::Pruned);
            Some(report)
        } else {
            None
        };

        advance(stage, BackupStage::Done);
        Ok(BackupReport {
            archive,
            path,
            size_bytes,
            verification,
            pruned,
        })
    }

    /// The backup directory and the staging file, as absolute paths, so an
    /// overlapping source never archives its own output.
    async fn excludes(&self, backup_dir: &Path, staging: &Path) -> Result<Vec<PathBuf>> {
        let backup_dir = fs::canonicalize(backup_dir).await?;
        let mut excludes = vec![backup_dir.clone()];
        if let Some(name) = staging.file_name() {
            excludes.push(backup_dir.join(name));
        }
        Ok(excludes)
    }
}

fn advance(stage: &mut BackupStage, next: BackupStage) {
    debug!(from = %stage, to = %next, "Backup stage");
    *stage = next;
}
