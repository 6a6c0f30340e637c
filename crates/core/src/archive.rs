//! Script bundle extraction.
//!
//! Benchmark scripts are uploaded as zip or (gzipped) tar archives. They are
//! extracted into a scratch directory and then promoted to the working
//! directory the provisioner runs in. All functions here are blocking; async
//! callers should run them on the blocking pool.

use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tokio_util::sync::CancellationToken;

/// Entries containing this marker are resource forks added by macOS Finder.
const MACOS_METADATA_MARKER: &str = "__MACOSX";

/// Bytes inspected for format detection (one tar header block).
const HEADER_PROBE_LEN: usize = 512;

/// Offset and magic of the POSIX `ustar` signature inside a tar header.
const USTAR_MAGIC_OFFSET: usize = 257;
const USTAR_MAGIC: &[u8] = b"ustar";

/// Errors raised while extracting a script bundle.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Unsupported archive format: {0}")]
    UnsupportedFormat(String),

    #[error("Archive entry escapes the target directory: {0}")]
    UnsafePath(String),

    #[error("Extraction cancelled")]
    Cancelled,
}

/// Archive container formats understood by [`unpack`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    TarGz,
    Tar,
}

impl ArchiveFormat {
    /// Identify the format from leading bytes, falling back to the file name.
    pub fn detect(file_name: &str, header: &[u8]) -> Option<Self> {
        if header.starts_with(b"PK\x03\x04") || header.starts_with(b"PK\x05\x06") {
            return Some(Self::Zip);
        }
        if header.starts_with(&[0x1f, 0x8b]) {
            return Some(Self::TarGz);
        }
        if header
            .get(USTAR_MAGIC_OFFSET..USTAR_MAGIC_OFFSET + USTAR_MAGIC.len())
            .is_some_and(|magic| magic == USTAR_MAGIC)
        {
            return Some(Self::Tar);
        }

        let lower = file_name.to_ascii_lowercase();
        if lower.ends_with(".zip") {
            Some(Self::Zip)
        } else if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if lower.ends_with(".tar") {
            Some(Self::Tar)
        } else {
            None
        }
    }
}

/// Extract `source` into `target`.
///
/// Entries under a `__MACOSX` marker are skipped, directories are recreated
/// and file contents are copied verbatim. `cancel` is checked before every
/// entry; once triggered the extraction stops with [`ArchiveError::Cancelled`]
/// and leaves whatever was already written in place.
pub fn unpack(source: &Path, target: &Path, cancel: &CancellationToken) -> Result<(), ArchiveError> {
    let mut file = File::open(source)?;
    let mut header = [0u8; HEADER_PROBE_LEN];
    let probed = read_probe(&mut file, &mut header)?;
    file.seek(SeekFrom::Start(0))?;

    let file_name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let format = ArchiveFormat::detect(&file_name, &header[..probed])
        .ok_or_else(|| ArchiveError::UnsupportedFormat(file_name.clone()))?;

    tracing::debug!(source = %source.display(), ?format, "Extracting archive");

    fs::create_dir_all(target)?;
    match format {
        ArchiveFormat::Zip => unpack_zip(file, target, cancel),
        ArchiveFormat::TarGz => unpack_tar(GzDecoder::new(file), target, cancel),
        ArchiveFormat::Tar => unpack_tar(file, target, cancel),
    }
}

/// Extract `source` and promote the result to `work_dir`.
///
/// Both `temp_dir` and `work_dir` are cleared first. If the extracted tree
/// consists of exactly one directory, that directory becomes `work_dir`;
/// otherwise the whole extraction directory does. Returns `work_dir`.
pub fn materialize(
    source: &Path,
    temp_dir: &Path,
    work_dir: &Path,
    cancel: &CancellationToken,
) -> Result<PathBuf, ArchiveError> {
    remove_dir_if_exists(temp_dir)?;
    remove_dir_if_exists(work_dir)?;
    fs::create_dir_all(temp_dir)?;

    unpack(source, temp_dir, cancel)?;

    let entries = fs::read_dir(temp_dir)?.collect::<Result<Vec<_>, _>>()?;
    match entries.as_slice() {
        [single] if single.file_type()?.is_dir() => {
            fs::rename(single.path(), work_dir)?;
        }
        _ => {
            fs::rename(temp_dir, work_dir)?;
        }
    }
    remove_dir_if_exists(temp_dir)?;

    tracing::info!(wd = %work_dir.display(), "Script unpacked");
    Ok(work_dir.to_path_buf())
}

/// Remove a directory tree, treating "not found" as success.
pub fn remove_dir_if_exists(dir: &Path) -> io::Result<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

// ---------------------------------------------------------------------------
// Format-specific extraction
// ---------------------------------------------------------------------------

fn unpack_zip(file: File, target: &Path, cancel: &CancellationToken) -> Result<(), ArchiveError> {
    let mut archive = zip::ZipArchive::new(file)?;

    for index in 0..archive.len() {
        if cancel.is_cancelled() {
            return Err(ArchiveError::Cancelled);
        }

        let mut entry = archive.by_index(index)?;
        let raw_name = entry.name().to_string();
        if is_metadata_entry(&raw_name) {
            continue;
        }

        let relative = entry
            .enclosed_name()
            .ok_or_else(|| ArchiveError::UnsafePath(raw_name.clone()))?;
        let out_path = target.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
        } else {
            write_entry(&mut entry, &out_path)?;
        }
    }

    Ok(())
}

fn unpack_tar<R: Read>(
    reader: R,
    target: &Path,
    cancel: &CancellationToken,
) -> Result<(), ArchiveError> {
    let mut archive = tar::Archive::new(reader);

    for entry in archive.entries()? {
        if cancel.is_cancelled() {
            return Err(ArchiveError::Cancelled);
        }

        let mut entry = entry?;
        let path = entry.path()?.into_owned();
        let entry_name = path.to_string_lossy().into_owned();
        if is_metadata_entry(&entry_name) {
            continue;
        }

        let relative = enclosed_path(&path).ok_or_else(|| ArchiveError::UnsafePath(entry_name.clone()))?;
        if relative.as_os_str().is_empty() {
            continue;
        }
        let out_path = target.join(relative);

        let kind = entry.header().entry_type();
        if kind.is_dir() {
            fs::create_dir_all(&out_path)?;
        } else if kind.is_file() {
            write_entry(&mut entry, &out_path)?;
        } else {
            tracing::debug!(entry = %entry_name, "Skipping non-regular archive entry");
        }
    }

    Ok(())
}

/// Copy one entry's bytes to `out_path`, creating parent directories.
fn write_entry<R: Read>(reader: &mut R, out_path: &Path) -> io::Result<()> {
    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut out = File::create(out_path)?;
    io::copy(reader, &mut out)?;
    Ok(())
}

fn is_metadata_entry(name: &str) -> bool {
    name.contains(MACOS_METADATA_MARKER)
}

/// Normalise an archive path to a relative path that stays inside the
/// target, or `None` if it is absolute or climbs out with `..`.
fn enclosed_path(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(out)
}

/// Fill `buf` as far as the file allows and return the number of bytes read.
fn read_probe(file: &mut File, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
