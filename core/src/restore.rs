use crate::capability::{Archiver, FilesystemProbe};
use crate::size::humanize;
use crate::types::{ArchiveEntry, RestorePlan, RestoreReport};
use crate::{Error, Result, naming, space};
use std::fmt;
use std::path::Path;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreStage {
    Idle,
    Selected,
    SizeEstimated,
    SpaceChecked,
    Extracted,
    Done,
}

impl fmt::Display for RestoreStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RestoreStage::Idle => "idle",
            RestoreStage::Selected => "selected",
            RestoreStage::SizeEstimated => "size-estimated",
            RestoreStage::SpaceChecked => "space-checked",
            RestoreStage::Extracted => "extracted",
            RestoreStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Selects an archive, makes sure the target has room for it, and unpacks it.
///
/// Nothing is written to the target directory unless the space check passed.
/// The archive itself is only ever read.
pub struct RestoreEngine<A, F> {
    archiver: A,
    probe: F,
}

impl<A: Archiver, F: FilesystemProbe> RestoreEngine<A, F> {
    pub fn new(archiver: A, probe: F) -> Self {
        Self { archiver, probe }
    }

    pub fn archiver(&self) -> &A {
        &self.archiver
    }

    pub async fn run(&self, plan: &RestorePlan) -> Result<RestoreReport> {
        info!(
            "Starting restore from {} into {}",
            plan.backup_dir.display(),
            plan.target_dir.display()
        );

        let mut stage = RestoreStage::Idle;
        let result = self.execute(plan, &mut stage).await;

        match &result {
            Ok(report) => info!(
                "Restore completed: {} into {}",
                report.archive,
                report.target.display()
            ),
            Err(e) => error!(stage = %stage, "Restore failed: {}", e),
        }
        result
    }

    async fn execute(&self, plan: &RestorePlan, stage: &mut RestoreStage) -> Result<RestoreReport> {
        let archive = naming::select(&plan.backup_dir, &plan.prefix, plan.archive.as_deref()).await?;
        let path = plan.backup_dir.join(archive.as_str());
        info!("Selected archive: {}", archive);
        advance(stage, RestoreStage::Selected);

        let required = self.estimate(&path).await?;
        info!("Estimated extracted size: {} bytes ({})", required, humanize(required));
        advance(stage, RestoreStage::SizeEstimated);

        let report = space::check(&self.probe, &plan.target_dir, required).await?;
        info!(
            "Space in {}: {} available, {} required",
            plan.target_dir.display(),
            humanize(report.available_bytes),
            humanize(report.required_bytes)
        );
        if !report.is_sufficient() {
            return Err(Error::InsufficientSpace {
                path: plan.target_dir.clone(),
                required: report.required_bytes,
                available: report.available_bytes,
            });
        }
        advance(stage, RestoreStage::SpaceChecked);

        self.archiver
            .extract(&path, &plan.target_dir)
            .await
            .map_err(|e| match e {
                Error::ExtractionFailed { .. } => e,
                other => Error::ExtractionFailed {
                    archive: path.clone(),
                    target: plan.target_dir.clone(),
                    reason: other.to_string(),
                },
            })?;
        advance(stage, RestoreStage::Extracted);

        advance(stage, RestoreStage::Done);
        Ok(RestoreReport {
            archive,
            target: plan.target_dir.clone(),
            space: report,
        })
    }

    /// Sum of member sizes from the archive index. Ignores block rounding.
    async fn estimate(&self, path: &Path) -> Result<u64> {
        let entries = self.archiver.list(path).await.map_err(|e| match e {
            Error::ArchiveUnreadable { .. } => e,
            other => Error::ArchiveUnreadable {
                path: path.to_path_buf(),
                reason: other.to_string(),
            },
        })?;
        Ok(extracted_size(&entries))
    }
}

pub fn extracted_size(entries: &[ArchiveEntry]) -> u64 {
    entries.iter().map(|e| e.size).sum()
}

fn advance(stage: &mut RestoreStage, next: RestoreStage) {
    debug!(from = %stage, to = %next, "Restore stage");
    *stage = next;
}
