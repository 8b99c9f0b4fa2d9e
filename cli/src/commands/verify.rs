use crate::config::Settings;
use anyhow::Result;
use clap::Args;
use tarvault_backends::TarGzArchiver;
use tarvault_core::{Error, naming, verify::verify};

#[derive(Args)]
pub struct VerifyCommand {
    #[arg(help = "Archive file name [default: latest]")]
    archive: Option<String>,
}

impl VerifyCommand {
    pub async fn run(&self, settings: Settings) -> Result<()> {
        let backup_dir = settings.backup_dir()?;
        let name = naming::select(&backup_dir, &settings.prefix(), self.archive.as_deref()).await?;
        let path = backup_dir.join(name.as_str());

        let result = verify(&TarGzArchiver::default(), &path).await?;
        if !result.is_valid() {
            return Err(Error::VerificationFailed { path, result }.into());
        }

        println!("✅ {}: {}", name, result);
        Ok(())
    }
}
