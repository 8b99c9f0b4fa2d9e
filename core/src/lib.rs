pub mod backup;
pub mod capability;
pub mod error;
pub mod naming;
pub mod restore;
pub mod retention;
pub mod size;
pub mod space;
pub mod types;
pub mod verify;

#[cfg(test)]
mod testing;

pub use backup::{BackupEngine, BackupStage};
pub use capability::{Archiver, FilesystemProbe};
pub use error::{Error, Result};
pub use naming::BackupSet;
pub use restore::{RestoreEngine, RestoreStage};
pub use size::{HumanSize, Unit, humanize};
pub use types::*;
