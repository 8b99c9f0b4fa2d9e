use async_trait::async_trait;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tar::{Archive, Builder};
use tarvault_core::{Archiver, ArchiveEntry, ContentKind, EntryKind, Error, Result};
use tracing::{debug, warn};
use walkdir::WalkDir;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const BLOCK_SIZE: usize = 512;
const USTAR_MAGIC_OFFSET: usize = 257;

/// Gzip-compressed tar archives on the local filesystem.
///
/// Reads also accept uncompressed tar so a hand-made `.tar` renamed into the
/// backup directory still verifies and restores.
#[derive(Debug, Clone)]
pub struct TarGzArchiver {
    compression: Compression,
}

impl Default for TarGzArchiver {
    fn default() -> Self {
        Self {
            compression: Compression::default(),
        }
    }
}

#[async_trait]
impl Archiver for TarGzArchiver {
    async fn create(&self, source: &Path, archive: &Path, excludes: &[PathBuf]) -> Result<()> {
        let path = archive.to_path_buf();
        let (source, archive, excludes) = (source.to_path_buf(), archive.to_path_buf(), excludes.to_vec());
        let compression = self.compression;

        run_blocking(move || create_archive(&source, &archive, &excludes, compression))
            .await
            .map_err(|e| Error::ArchiveCreation {
                path,
                reason: e.to_string(),
            })
    }

    async fn probe(&self, archive: &Path) -> Result<ContentKind> {
        let archive = archive.to_path_buf();
        Ok(run_blocking(move || probe_content(&archive)).await?)
    }

    async fn list(&self, archive: &Path) -> Result<Vec<ArchiveEntry>> {
        let path = archive.to_path_buf();
        let archive = archive.to_path_buf();

        run_blocking(move || list_entries(&archive))
            .await
            .map_err(|e| Error::ArchiveUnreadable {
                path,
                reason: e.to_string(),
            })
    }

    async fn extract(&self, archive: &Path, target: &Path) -> Result<()> {
        let (archive, target) = (archive.to_path_buf(), target.to_path_buf());
        let (archive_path, target_path) = (archive.clone(), target.clone());

        run_blocking(move || unpack(&archive, &target))
            .await
            .map_err(|e| Error::ExtractionFailed {
                archive: archive_path,
                target: target_path,
                reason: e.to_string(),
            })
    }
}

async fn run_blocking<T, F>(task: F) -> io::Result<T>
where
    F: FnOnce() -> io::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(io::Error::other)?
}

fn create_archive(
    source: &Path,
    archive: &Path,
    excludes: &[PathBuf],
    compression: Compression,
) -> io::Result<()> {
    let source = source.canonicalize()?;
    let file = File::create(archive)?;
    let mut builder = Builder::new(GzEncoder::new(BufWriter::new(file), compression));
    builder.follow_symlinks(false);

    let walker = WalkDir::new(&source)
        .follow_links(false)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !excludes.iter().any(|excluded| entry.path() == excluded));

    let mut members = 0usize;
    for entry in walker {
        let entry = entry.map_err(io::Error::other)?;
        let relative = entry
            .path()
            .strip_prefix(&source)
            .map_err(io::Error::other)?;
        let file_type = entry.file_type();

        if file_type.is_dir() {
            builder.append_dir(relative, entry.path())?;
        } else if file_type.is_file() || file_type.is_symlink() {
            builder.append_path_with_name(entry.path(), relative)?;
        } else {
            warn!("Skipping special file: {}", entry.path().display());
            continue;
        }
        members += 1;
    }

    let writer = builder.into_inner()?.finish()?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;

    debug!(archive = %archive.display(), members, "Wrote tar.gz archive");
    Ok(())
}

fn probe_content(path: &Path) -> io::Result<ContentKind> {
    let mut file = File::open(path)?;
    let mut head = [0u8; BLOCK_SIZE];
    let read = read_full(&mut file, &mut head)?;

    if read >= GZIP_MAGIC.len() && head[..GZIP_MAGIC.len()] == GZIP_MAGIC {
        file.seek(SeekFrom::Start(0))?;
        let mut block = [0u8; BLOCK_SIZE];
        let kind = match read_full(&mut GzDecoder::new(file), &mut block) {
            Ok(BLOCK_SIZE) if looks_like_tar_block(&block) => ContentKind::GzipTar,
            Ok(_) => ContentKind::Gzip,
            Err(_) => ContentKind::GzipOpaque,
        };
        return Ok(kind);
    }

    if read == BLOCK_SIZE && has_ustar_magic(&head) {
        return Ok(ContentKind::Tar);
    }
    Ok(ContentKind::Unknown)
}

/// A ustar/GNU header, or the zero block that ends an empty archive.
fn looks_like_tar_block(block: &[u8; BLOCK_SIZE]) -> bool {
    has_ustar_magic(block) || block.iter().all(|b| *b == 0)
}

fn has_ustar_magic(block: &[u8; BLOCK_SIZE]) -> bool {
    &block[USTAR_MAGIC_OFFSET..USTAR_MAGIC_OFFSET + 5] == b"ustar"
}

fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn open_stream(path: &Path) -> io::Result<Box<dyn Read>> {
    let mut file = File::open(path)?;
    let mut magic = [0u8; 2];
    let read = read_full(&mut file, &mut magic)?;
    file.seek(SeekFrom::Start(0))?;

    let reader = BufReader::new(file);
    if read == magic.len() && magic == GZIP_MAGIC {
        Ok(Box::new(GzDecoder::new(reader)))
    } else {
        Ok(Box::new(reader))
    }
}

fn list_entries(path: &Path) -> io::Result<Vec<ArchiveEntry>> {
    let mut archive = Archive::new(open_stream(path)?);
    let mut entries = Vec::new();

    for entry in archive.entries()? {
        let entry = entry?;
        let entry_type = entry.header().entry_type();
        let kind = if entry_type.is_file() {
            EntryKind::File
        } else if entry_type.is_dir() {
            EntryKind::Directory
        } else if entry_type.is_symlink() {
            EntryKind::Symlink
        } else {
            EntryKind::Other
        };

        entries.push(ArchiveEntry {
            path: entry.path()?.into_owned(),
            size: entry.size(),
            kind,
        });
    }

    // Only zero padding may follow the end-of-archive block. Reading to the
    // end also makes the decoder check the gzip trailer.
    ensure_zero_tail(&mut archive.into_inner())?;
    Ok(entries)
}

fn ensure_zero_tail<R: Read>(reader: &mut R) -> io::Result<()> {
    let mut buf = [0u8; 8 * BLOCK_SIZE];
    loop {
        let read = match reader.read(&mut buf) {
            Ok(0) => return Ok(()),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        if buf[..read].iter().any(|b| *b != 0) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "data after end-of-archive marker",
            ));
        }
    }
}

fn unpack(path: &Path, target: &Path) -> io::Result<()> {
    if !target.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("target directory does not exist: {}", target.display()),
        ));
    }

    let mut archive = Archive::new(open_stream(path)?);
    archive.set_preserve_permissions(true);
    archive.set_overwrite(true);
    archive.unpack(target)?;

    debug!(archive = %path.display(), target = %target.display(), "Unpacked archive");
    Ok(())
}
