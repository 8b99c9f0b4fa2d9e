use crate::config::Settings;
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use tarvault_backends::{LocalFilesystem, RunLock, TarGzArchiver};
use tarvault_core::{RestoreEngine, humanize};

#[derive(Args)]
pub struct RestoreCommand {
    #[arg(long, env = "TARVAULT_TARGET", help = "Existing directory to restore into")]
    target: Option<PathBuf>,

    #[arg(long, help = "Archive file name to restore [default: latest]")]
    archive: Option<String>,
}

impl RestoreCommand {
    pub async fn run(&self, settings: Settings, quiet: bool) -> Result<()> {
        let settings = settings.with_overrides(Settings {
            target_dir: self.target.clone(),
            ..Settings::default()
        });
        let plan = settings.restore_plan(self.archive.clone())?;

        // Keeps a concurrent prune from deleting the archive mid-extraction.
        let _lock = if plan.backup_dir.is_dir() {
            Some(RunLock::acquire(&plan.backup_dir)?)
        } else {
            None
        };

        let pb = super::spinner(quiet, &format!("Restoring into {}...", plan.target_dir.display()))?;
        let engine = RestoreEngine::new(TarGzArchiver::default(), LocalFilesystem::new());
        let result = engine.run(&plan).await;
        pb.finish_and_clear();
        let report = result?;

        println!("✅ Restore completed successfully!");
        println!("📦 Archive: {}", report.archive);
        println!("📂 Target: {}", report.target.display());
        println!(
            "💾 Space: {} required, {} available",
            humanize(report.space.required_bytes),
            humanize(report.space.available_bytes)
        );

        Ok(())
    }
}
