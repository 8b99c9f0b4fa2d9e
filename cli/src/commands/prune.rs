use crate::config::Settings;
use anyhow::{Result, anyhow};
use clap::Args;
use std::num::NonZeroUsize;
use tarvault_backends::RunLock;
use tarvault_core::retention;

#[derive(Args)]
pub struct PruneCommand {
    #[arg(long, env = "TARVAULT_KEEP", help = "Number of newest archives to keep (at least 1)")]
    keep: Option<NonZeroUsize>,
}

impl PruneCommand {
    pub async fn run(&self, settings: Settings) -> Result<()> {
        let keep = self
            .keep
            .map(NonZeroUsize::get)
            .or(settings.keep_count)
            .filter(|&keep| keep > 0)
            .ok_or_else(|| anyhow!("Prune needs a keep count of at least 1 (--keep or keep_count in config)"))?;

        let backup_dir = settings.backup_dir()?;
        let _lock = if backup_dir.is_dir() {
            Some(RunLock::acquire(&backup_dir)?)
        } else {
            None
        };

        let report = retention::prune(&backup_dir, &settings.prefix(), keep).await?;
        super::backup::print_prune_summary(&report);

        if !report.is_clean() {
            return Err(anyhow!(
                "{} archive(s) could not be deleted",
                report.failed.len()
            ));
        }
        Ok(())
    }
}
