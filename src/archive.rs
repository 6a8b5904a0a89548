//! Zip archive assembly
//!
//! Resolved tracks are packed into a single deflate-compressed zip held in memory.
//! The output is deterministic for the same input order: entry timestamps and
//! permissions are fixed, and duplicate display names get ` (1)`, ` (2)` suffixes.

use crate::error::BuildError;
use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use zip::CompressionMethod;
use zip::write::FileOptions;

/// Longest artifact name kept by [`sanitize_archive_name`]
const MAX_NAME_CHARS: usize = 100;

/// Maximum suffix tried when disambiguating duplicate entry names
const MAX_RENAME_ATTEMPTS: u32 = 9999;

/// One file to put into the archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// File on disk
    pub path: PathBuf,
    /// Name inside the archive
    pub name: String,
}

impl ArchiveEntry {
    /// Entry named after the file's own name
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "track".to_string());
        Self { path, name }
    }
}

/// Result of a successful build
#[derive(Debug, Clone)]
pub struct BuiltArchive {
    /// Zip bytes
    pub bytes: Vec<u8>,
    /// Names written, in archive order
    pub entries: Vec<String>,
    /// Inputs skipped because they no longer existed
    pub skipped: Vec<PathBuf>,
}

/// Build a zip from `entries` in order
///
/// Missing files are skipped. Fails with [`BuildError::Empty`] when nothing
/// could be written.
pub fn build_archive(entries: &[ArchiveEntry]) -> Result<BuiltArchive, BuildError> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default())
        .unix_permissions(0o644);

    let mut used = HashSet::new();
    let mut written = Vec::new();
    let mut skipped = Vec::new();

    for entry in entries {
        let mut file = match std::fs::File::open(&entry.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %entry.path.display(), "skipping missing file");
                skipped.push(entry.path.clone());
                continue;
            }
            Err(e) => {
                return Err(BuildError::ReadFailed {
                    path: entry.path.clone(),
                    reason: e.to_string(),
                });
            }
        };

        let name = unique_entry_name(&entry.name, &used);
        writer.start_file(name.clone(), options)?;
        std::io::copy(&mut file, &mut writer).map_err(|e| BuildError::ReadFailed {
            path: entry.path.clone(),
            reason: e.to_string(),
        })?;
        writer
            .flush()
            .map_err(|e| BuildError::Zip(format!("failed to flush entry {}: {}", name, e)))?;

        debug!(entry = %name, "added to archive");
        used.insert(name.clone());
        written.push(name);
    }

    if written.is_empty() {
        return Err(BuildError::Empty);
    }

    let bytes = writer.finish()?.into_inner();
    Ok(BuiltArchive {
        bytes,
        entries: written,
        skipped,
    })
}

/// Run [`build_archive`] on the blocking thread pool
pub async fn build_archive_blocking(entries: Vec<ArchiveEntry>) -> Result<BuiltArchive, BuildError> {
    tokio::task::spawn_blocking(move || build_archive(&entries))
        .await
        .map_err(|e| BuildError::Aborted(e.to_string()))?
}

/// Pick `name`, or `stem (n).ext` for the first free `n`
fn unique_entry_name(name: &str, used: &HashSet<String>) -> String {
    if !used.contains(name) {
        return name.to_string();
    }

    let path = Path::new(name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());
    let extension = path.extension().map(|e| e.to_string_lossy().into_owned());

    for i in 1..=MAX_RENAME_ATTEMPTS {
        let candidate = match &extension {
            Some(ext) => format!("{} ({}).{}", stem, i, ext),
            None => format!("{} ({})", stem, i),
        };
        if !used.contains(&candidate) {
            return candidate;
        }
    }

    // Every suffix is taken; fall back to something that cannot collide
    format!("{} ({})", name, used.len())
}

/// Turn a playlist name into a safe download file name (without extension)
///
/// Path separators, control characters and characters Windows rejects become
/// `_`; surrounding whitespace and dots are trimmed. Falls back to `playlist`.
pub fn sanitize_archive_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .take(MAX_NAME_CHARS)
        .collect();

    let trimmed = cleaned.trim().trim_matches('.').trim();
    if trimmed.is_empty() {
        "playlist".to_string()
    } else {
        trimmed.to_string()
    }
}
