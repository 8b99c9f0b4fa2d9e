use crate::config::Settings;
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tarvault_backends::{LocalFilesystem, RunLock, TarGzArchiver};
use tarvault_core::{BackupEngine, PruneReport, humanize};
use tokio::fs;
use tracing::info;

#[derive(Args)]
pub struct BackupCommand {
    #[arg(long, env = "TARVAULT_SOURCE", help = "Directory to back up")]
    source: Option<PathBuf>,

    #[arg(long, env = "TARVAULT_KEEP", help = "Keep only the newest N archives (0 disables pruning)")]
    keep: Option<usize>,

    #[arg(long, help = "Verify the new archive before pruning")]
    verify: bool,
}

impl BackupCommand {
    pub async fn run(&self, settings: Settings, quiet: bool) -> Result<()> {
        let settings = settings.with_overrides(Settings {
            source_dir: self.source.clone(),
            keep_count: self.keep,
            verify: self.verify.then_some(true),
            ..Settings::default()
        });
        let plan = settings.backup_plan()?;

        // The engine reports a missing source before touching the backup dir.
        let _lock = if plan.source_dir.is_dir() {
            fs::create_dir_all(&plan.backup_dir)
                .await
                .with_context(|| format!("Failed to create {}", plan.backup_dir.display()))?;
            Some(RunLock::acquire(&plan.backup_dir)?)
        } else {
            None
        };

        let pb = super::spinner(quiet, &format!("Archiving {}...", plan.source_dir.display()))?;
        let engine = BackupEngine::new(TarGzArchiver::default(), LocalFilesystem::new());
        let result = engine.run(&plan).await;
        pb.finish_and_clear();
        let report = result?;

        info!("Backup written to {}", report.path.display());

        println!("✅ Backup completed successfully!");
        println!("📦 Archive: {}", report.archive);
        println!("💾 Size: {}", humanize(report.size_bytes));
        if let Some(verification) = report.verification {
            println!("🔍 Verification: {}", verification);
        }
        if let Some(pruned) = &report.pruned {
            print_prune_summary(pruned);
        }

        Ok(())
    }
}

pub(crate) fn print_prune_summary(report: &PruneReport) {
    println!(
        "🧹 Pruned: {} deleted, {} kept",
        report.deleted.len(),
        report.kept.len()
    );
    for failure in &report.failed {
        println!("⚠️  Could not delete {}: {}", failure.archive, failure.reason);
    }
}
