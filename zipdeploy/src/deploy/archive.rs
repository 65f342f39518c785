//! Zip archive creation
//!
//! Entries are named relative to the source directory's parent, so
//! archiving `/work/api` yields `api/host.json`, `api/fn/index.js` and so on.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime as LocalDateTime, Local};
use tokio::task::spawn_blocking;
use tracing::debug;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::errors::DeployError;
use crate::utils::sha256_hex;

/// Description of a finished archive
#[derive(Debug, Clone)]
pub struct ArchiveSummary {
    pub path: PathBuf,
    pub entries: usize,
    pub size_bytes: u64,
    pub sha256: String,
}

/// Entries at or above this size need zip64 extra fields
const ZIP64_THRESHOLD: u64 = 0xFFFF_FFFF;

/// Zip every regular file under `source_dir` into `output`.
pub async fn build_zip(source_dir: &Path, output: &Path) -> Result<ArchiveSummary, DeployError> {
    let source_dir = source_dir.to_owned();
    let output = output.to_owned();
    spawn_blocking(move || build_zip_sync(&source_dir, &output)).await?
}

fn build_zip_sync(source_dir: &Path, output: &Path) -> Result<ArchiveSummary, DeployError> {
    let source_dir = fs::canonicalize(source_dir)?;
    if !fs::metadata(&source_dir)?.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is not a directory", source_dir.display()),
        )
        .into());
    }
    let base = source_dir.parent().unwrap_or(&source_dir).to_path_buf();

    let mut zip = ZipWriter::new(BufWriter::new(fs::File::create(output)?));
    let output_canonical = fs::canonicalize(output)?;
    let mut entries = 0;

    for entry in WalkDir::new(&source_dir).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        // Follows file symlinks; directory symlinks are not descended into
        if !entry.path().is_file() || entry.path() == output_canonical.as_path() {
            continue;
        }

        let name = entry_name(&base, entry.path())?;
        debug!("Adding {}", name);
        let mut file = fs::File::open(entry.path())?;
        zip.start_file(name, entry_options(&file.metadata()?))?;
        io::copy(&mut file, &mut zip)?;
        entries += 1;
    }

    zip.finish()?.flush()?;

    let bytes = fs::read(output)?;
    let summary = ArchiveSummary {
        path: output.to_path_buf(),
        entries,
        size_bytes: bytes.len() as u64,
        sha256: sha256_hex(&bytes),
    };
    debug!(
        entries = summary.entries,
        size_bytes = summary.size_bytes,
        "created zip archive"
    );
    Ok(summary)
}

/// Per-entry options carrying the file's mode and modification time
fn entry_options(metadata: &fs::Metadata) -> SimpleFileOptions {
    let mut options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(metadata.len() >= ZIP64_THRESHOLD);

    // Zip timestamps are local time from 1980 to 2107; anything else keeps the default
    if let Some(mtime) = metadata
        .modified()
        .ok()
        .map(|mtime| LocalDateTime::<Local>::from(mtime).naive_local())
        .and_then(|mtime| DateTime::try_from(mtime).ok())
    {
        options = options.last_modified_time(mtime);
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        options = options.unix_permissions(metadata.permissions().mode());
    }

    options
}

/// Archive entry name for `path`: relative to `base`, `/`-separated.
fn entry_name(base: &Path, path: &Path) -> Result<String, DeployError> {
    let relative = path.strip_prefix(base).map_err(|e| {
        io::Error::new(io::ErrorKind::InvalidData, e.to_string())
    })?;

    let parts: Vec<_> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect();

    Ok(parts.join("/"))
}
