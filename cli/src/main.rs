mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{
    backup::BackupCommand, list::ListCommand, prune::PruneCommand, restore::RestoreCommand,
    verify::VerifyCommand,
};
use config::Settings;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, error};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "tarvault",
    version,
    about = "Timestamped tar.gz backups with retention and safe restore",
    long_about = "Tarvault archives a directory into timestamped .tar.gz files, verifies them, \
                  prunes old ones and restores the latest after checking free space"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true, env = "TARVAULT_CONFIG", help = "Config file (TOML)")]
    config: Option<PathBuf>,

    #[arg(long, global = true, env = "TARVAULT_BACKUP_DIR", help = "Directory holding the archives")]
    backup_dir: Option<PathBuf>,

    #[arg(long, global = true, env = "TARVAULT_PREFIX", help = "Archive name prefix [default: backup]")]
    prefix: Option<String>,

    #[arg(long, global = true, env = "TARVAULT_LOG_FILE", help = "Append logs to this file")]
    log_file: Option<PathBuf>,

    #[arg(short, long, global = true, conflicts_with = "quiet", help = "Enable verbose output")]
    verbose: bool,

    #[arg(short, long, global = true, help = "Enable quiet mode")]
    quiet: bool,
}

impl Cli {
    /// Global flags as the top settings layer.
    fn overrides(&self) -> Settings {
        Settings {
            backup_dir: self.backup_dir.clone(),
            prefix: self.prefix.clone(),
            log_file: self.log_file.clone(),
            ..Settings::default()
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Archive the source directory")]
    Backup(BackupCommand),

    #[command(about = "Restore an archive into the target directory")]
    Restore(RestoreCommand),

    #[command(about = "List archives, newest first")]
    List(ListCommand),

    #[command(about = "Check that an archive can be read end to end")]
    Verify(VerifyCommand),

    #[command(about = "Delete all but the newest N archives")]
    Prune(PruneCommand),
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref())
        .map(|file| file.with_overrides(cli.overrides()));
    let log_file = match &settings {
        Ok(settings) => settings.log_file.clone(),
        Err(_) => cli.log_file.clone(),
    };
    init_tracing(cli.verbose, cli.quiet, log_file.as_deref());

    let result = match settings {
        Ok(settings) => run(&cli, settings).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: &Cli, settings: Settings) -> Result<()> {
    debug!(?settings, "Resolved settings");

    match cli.command {
        Commands::Backup(ref cmd) => cmd.run(settings, cli.quiet).await,
        Commands::Restore(ref cmd) => cmd.run(settings, cli.quiet).await,
        Commands::List(ref cmd) => cmd.run(settings).await,
        Commands::Verify(ref cmd) => cmd.run(settings).await,
        Commands::Prune(ref cmd) => cmd.run(settings).await,
    }
}

fn init_tracing(verbose: bool, quiet: bool, log_file: Option<&Path>) {
    let level = if quiet {
        "warn"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "tarvault={level},tarvault_core={level},tarvault_backends={level}"
            ))
        })
    };

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(filter());

    let mut open_error = None;
    let file_layer = log_file.and_then(|path| {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_filter(filter()),
            ),
            Err(e) => {
                open_error = Some(format!("cannot open log file {}: {}", path.display(), e));
                None
            }
        }
    });

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();

    if let Some(message) = open_error {
        eprintln!("Warning: {}", message);
    }
}
