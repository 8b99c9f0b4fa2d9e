pub mod local;
pub mod lock;
pub mod targz;

pub use local::LocalFilesystem;
pub use lock::RunLock;
pub use targz::TarGzArchiver;
