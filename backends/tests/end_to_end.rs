use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::io::Write;
use std::path::{Path, PathBuf};
use tarvault_backends::{LocalFilesystem, TarGzArchiver};
use tarvault_core::{
    Archiver, BackupEngine, BackupPlan, BackupSet, Error, FilesystemProbe, RestoreEngine,
    RestorePlan, Result, VerificationResult, restore::extracted_size, verify::verify,
};
use tempfile::TempDir;

/// Local directory checks, but a fixed amount of free space.
struct FixedSpace(u64);

#[async_trait]
impl FilesystemProbe for FixedSpace {
    async fn is_dir(&self, path: &Path) -> bool {
        LocalFilesystem.is_dir(path).await
    }

    async fn available_space(&self, _path: &Path) -> Result<u64> {
        Ok(self.0)
    }
}

/// Bytes that gzip cannot shrink much, so truncating an archive cuts into
/// real member data.
fn noise(len: usize, seed: u64) -> Vec<u8> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
    (0..len)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (state >> 33) as u8
        })
        .collect()
}

/// An end-of-archive block followed by data a tar reader would never see.
fn zero_block_then_text() -> Vec<u8> {
    let mut payload = vec![0u8; 512];
    payload.extend_from_slice(b"arbitrary text after the zero block");
    payload
}

struct Workspace {
    root: TempDir,
}

impl Workspace {
    /// Three regular files, 10 KB in total.
    fn new() -> Self {
        let root = TempDir::new().unwrap();
        let source = root.path().join("source");
        std::fs::create_dir_all(source.join("sub")).unwrap();
        std::fs::write(source.join("one.bin"), noise(4 * 1024, 1)).unwrap();
        std::fs::write(source.join("two.bin"), noise(4 * 1024, 2)).unwrap();
        std::fs::write(source.join("sub/three.bin"), noise(2 * 1024, 3)).unwrap();
        std::fs::create_dir(root.path().join("target")).unwrap();
        Self { root }
    }

    fn source(&self) -> PathBuf {
        self.root.path().join("source")
    }

    fn backups(&self) -> PathBuf {
        self.root.path().join("backups")
    }

    fn target(&self) -> PathBuf {
        self.root.path().join("target")
    }

    fn backup_plan(&self, keep_count: usize, verify: bool) -> BackupPlan {
        BackupPlan {
            source_dir: self.source(),
            backup_dir: self.backups(),
            prefix: "test".to_string(),
            keep_count,
            verify,
        }
    }

    fn restore_plan(&self) -> RestorePlan {
        RestorePlan {
            backup_dir: self.backups(),
            target_dir: self.target(),
            prefix: "test".to_string(),
            archive: None,
        }
    }
}

fn stamp(second: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 6, 30)
        .unwrap()
        .and_hms_opt(23, 59, second)
        .unwrap()
}

fn local_backup() -> BackupEngine<TarGzArchiver, LocalFilesystem> {
    BackupEngine::new(TarGzArchiver::default(), LocalFilesystem::new())
}

#[tokio::test]
async fn verified_backup_records_stored_size() {
    let ws = Workspace::new();
    let report = local_backup()
        .run_at(&ws.backup_plan(0, true), stamp(0))
        .await
        .unwrap();

    assert_eq!(report.verification, Some(VerificationResult::Valid));
    assert_eq!(report.size_bytes, std::fs::metadata(&report.path).unwrap().len());

    let entries = TarGzArchiver::default().list(&report.path).await.unwrap();
    let files: Vec<_> = entries.iter().filter(|e| e.is_file()).collect();
    assert_eq!(files.len(), 3);
    assert_eq!(files.iter().map(|e| e.size).sum::<u64>(), 10 * 1024);
}

#[tokio::test]
async fn three_runs_keep_two_newest() {
    let ws = Workspace::new();
    let engine = local_backup();
    let plan = ws.backup_plan(2, true);

    let mut names = Vec::new();
    for second in [10, 20, 30] {
        names.push(engine.run_at(&plan, stamp(second)).await.unwrap().archive);
    }

    let set = BackupSet::scan(ws.backups(), "test").await.unwrap();
    assert_eq!(set.archives(), &[names[2].clone(), names[1].clone()]);
    assert!(set.archives().iter().all(|kept| kept > &names[0]));
    assert!(!ws.backups().join(names[0].as_str()).exists());
}

#[tokio::test]
async fn backup_dir_inside_source_is_not_archived() {
    let ws = Workspace::new();
    let plan = BackupPlan {
        backup_dir: ws.source().join("backups"),
        ..ws.backup_plan(0, true)
    };

    let engine = local_backup();
    engine.run_at(&plan, stamp(1)).await.unwrap();
    let second = engine.run_at(&plan, stamp(2)).await.unwrap();

    let entries = TarGzArchiver::default().list(&second.path).await.unwrap();
    assert!(entries.iter().all(|e| !e.path.starts_with("backups")));
    assert_eq!(entries.iter().filter(|e| e.is_file()).count(), 3);
}

#[tokio::test]
async fn restore_round_trip() {
    let ws = Workspace::new();
    local_backup()
        .run_at(&ws.backup_plan(0, true), stamp(5))
        .await
        .unwrap();

    let engine = RestoreEngine::new(TarGzArchiver::default(), LocalFilesystem::new());
    let report = engine.run(&ws.restore_plan()).await.unwrap();

    assert_eq!(report.space.required_bytes, 10 * 1024);
    for file in ["one.bin", "two.bin", "sub/three.bin"] {
        assert_eq!(
            std::fs::read(ws.target().join(file)).unwrap(),
            std::fs::read(ws.source().join(file)).unwrap(),
            "{}",
            file
        );
    }
}

#[tokio::test]
async fn restore_with_exactly_enough_space() {
    let ws = Workspace::new();
    let backup = local_backup()
        .run_at(&ws.backup_plan(0, false), stamp(7))
        .await
        .unwrap();

    let archiver = TarGzArchiver::default();
    let estimate = extracted_size(&archiver.list(&backup.path).await.unwrap());

    let engine = RestoreEngine::new(archiver, FixedSpace(estimate));
    let report = engine.run(&ws.restore_plan()).await.unwrap();
    assert_eq!(report.space.available_bytes, report.space.required_bytes);
    assert!(ws.target().join("one.bin").exists());
}

#[tokio::test]
async fn restore_short_of_space_leaves_target_untouched() {
    let ws = Workspace::new();
    let backup = local_backup()
        .run_at(&ws.backup_plan(0, false), stamp(8))
        .await
        .unwrap();
    let archive_before = std::fs::read(&backup.path).unwrap();

    let archiver = TarGzArchiver::default();
    let estimate = extracted_size(&archiver.list(&backup.path).await.unwrap());

    let engine = RestoreEngine::new(archiver, FixedSpace(estimate - 1));
    let err = engine.run(&ws.restore_plan()).await.unwrap_err();

    assert!(matches!(err, Error::InsufficientSpace { .. }));
    assert_eq!(std::fs::read_dir(ws.target()).unwrap().count(), 0);
    assert_eq!(std::fs::read(&backup.path).unwrap(), archive_before);
}

#[tokio::test]
async fn gzip_without_tar_never_verifies() {
    let ws = Workspace::new();
    let archiver = TarGzArchiver::default();

    for (name, payload) in [
        ("short.tar.gz", b"not a tar stream".to_vec()),
        ("long.tar.gz", noise(8 * 1024, 9)),
        ("zero-block.tar.gz", zero_block_then_text()),
    ] {
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(&payload).unwrap();
        let path = ws.root.path().join(name);
        std::fs::write(&path, encoder.finish().unwrap()).unwrap();

        let result = verify(&archiver, &path).await.unwrap();
        assert!(
            matches!(
                result,
                VerificationResult::NotAnArchive | VerificationResult::Corrupt
            ),
            "{}: {}",
            name,
            result
        );
    }
}

#[tokio::test]
async fn damaged_archives_are_corrupt() {
    let ws = Workspace::new();
    let backup = local_backup()
        .run_at(&ws.backup_plan(0, true), stamp(9))
        .await
        .unwrap();
    let bytes = std::fs::read(&backup.path).unwrap();
    let archiver = TarGzArchiver::default();

    let truncated = ws.root.path().join("truncated.tar.gz");
    std::fs::write(&truncated, &bytes[..bytes.len() * 6 / 10]).unwrap();
    assert_eq!(
        verify(&archiver, &truncated).await.unwrap(),
        VerificationResult::Corrupt
    );

    let mut bad_crc = bytes.clone();
    let crc_offset = bad_crc.len() - 8;
    bad_crc[crc_offset] ^= 0xff;
    let bad_crc_path = ws.root.path().join("bad-crc.tar.gz");
    std::fs::write(&bad_crc_path, bad_crc).unwrap();
    assert_eq!(
        verify(&archiver, &bad_crc_path).await.unwrap(),
        VerificationResult::Corrupt
    );

    let missing = ws.root.path().join("missing.tar.gz");
    assert_eq!(
        verify(&archiver, &missing).await.unwrap(),
        VerificationResult::NotFound
    );
}

#[tokio::test]
async fn backup_of_missing_source_fails() {
    let ws = Workspace::new();
    let plan = BackupPlan {
        source_dir: ws.root.path().join("nowhere"),
        ..ws.backup_plan(2, true)
    };

    let err = local_backup().run_at(&plan, stamp(11)).await.unwrap_err();
    assert!(matches!(err, Error::SourceMissing { .. }));
    assert!(!ws.backups().exists());
}
