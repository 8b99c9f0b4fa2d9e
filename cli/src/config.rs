use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tarvault_core::{BackupPlan, DEFAULT_PREFIX, Error, RestorePlan};
use tracing::debug;

pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Settings from every layer. A `None` field means "not set at this layer";
/// `with_overrides` lets a higher layer replace whatever it sets.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub source_dir: Option<PathBuf>,
    pub backup_dir: Option<PathBuf>,
    pub target_dir: Option<PathBuf>,
    pub prefix: Option<String>,
    pub keep_count: Option<usize>,
    pub verify: Option<bool>,
    pub log_file: Option<PathBuf>,
}

impl Settings {
    /// Loads the config file named on the command line, or the one in the
    /// platform config directory if it exists. No file means defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => match default_path() {
                Some(path) if path.is_file() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let settings = Self::from_toml(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        debug!("Loaded config from {}", path.display());
        Ok(settings)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()).into())
    }

    pub fn with_overrides(self, over: Settings) -> Self {
        Self {
            source_dir: over.source_dir.or(self.source_dir),
            backup_dir: over.backup_dir.or(self.backup_dir),
            target_dir: over.target_dir.or(self.target_dir),
            prefix: over.prefix.or(self.prefix),
            keep_count: over.keep_count.or(self.keep_count),
            verify: over.verify.or(self.verify),
            log_file: over.log_file.or(self.log_file),
        }
    }

    pub fn backup_dir(&self) -> Result<PathBuf> {
        self.backup_dir
            .clone()
            .ok_or_else(|| anyhow!("Backup directory required (--backup-dir, TARVAULT_BACKUP_DIR or backup_dir in config)"))
    }

    pub fn prefix(&self) -> String {
        self.prefix.clone().unwrap_or_else(|| DEFAULT_PREFIX.to_string())
    }

    pub fn backup_plan(&self) -> Result<BackupPlan> {
        let source_dir = self
            .source_dir
            .clone()
            .ok_or_else(|| anyhow!("Source directory required (--source, TARVAULT_SOURCE or source_dir in config)"))?;

        Ok(BackupPlan {
            source_dir,
            backup_dir: self.backup_dir()?,
            prefix: self.prefix(),
            keep_count: self.keep_count.unwrap_or(0),
            verify: self.verify.unwrap_or(false),
        })
    }

    pub fn restore_plan(&self, archive: Option<String>) -> Result<RestorePlan> {
        let target_dir = self
            .target_dir
            .clone()
            .ok_or_else(|| anyhow!("Target directory required (--target, TARVAULT_TARGET or target_dir in config)"))?;

        Ok(RestorePlan {
            backup_dir: self.backup_dir()?,
            target_dir,
            prefix: self.prefix(),
            archive,
        })
    }
}

pub fn default_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "tarvault").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}
