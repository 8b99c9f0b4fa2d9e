use crate::config::Settings;
use anyhow::Result;
use chrono::NaiveDateTime;
use clap::{Args, ValueEnum};
use serde::Serialize;
use tarvault_core::{ArchiveName, BackupSet, humanize};
use tokio::fs;

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Args)]
pub struct ListCommand {
    #[arg(long, value_enum, default_value = "table", help = "Output format")]
    format: OutputFormat,
}

#[derive(Serialize)]
struct ArchiveRow {
    name: ArchiveName,
    created: Option<NaiveDateTime>,
    size_bytes: u64,
    size: String,
}

impl ListCommand {
    pub async fn run(&self, settings: Settings) -> Result<()> {
        let set = BackupSet::scan(settings.backup_dir()?, &settings.prefix()).await?;

        let mut rows = Vec::with_capacity(set.len());
        for name in set.archives() {
            let size_bytes = fs::metadata(set.path_of(name)).await?.len();
            rows.push(ArchiveRow {
                created: name.timestamp(),
                size: humanize(size_bytes).to_string(),
                name: name.clone(),
                size_bytes,
            });
        }

        match self.format {
            OutputFormat::Table => {
                if rows.is_empty() {
                    println!("No backups found in {}", set.dir().display());
                    return Ok(());
                }

                println!("{:<48} {:<20} {:>12}", "Archive", "Created", "Size");
                println!("{:-<82}", "");
                for row in &rows {
                    let created = row
                        .created
                        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                        .unwrap_or_else(|| "-".to_string());
                    println!("{:<48} {:<20} {:>12}", row.name.as_str(), created, row.size);
                }
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            }
        }

        Ok(())
    }
}
