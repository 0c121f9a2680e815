//! Guarded edits of user text files (shell profiles, npmrc)
//!
//! Every edit is a read-modify-write under an exclusive advisory lock on a
//! sibling `.lock` file, and the new content replaces the old one through an
//! atomic rename. Two concurrent runs therefore serialize on the lock and the
//! second one sees the first one's marker.

use fs4::fs_std::FileExt;
use regex::Regex;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub type PatchResult<T> = Result<T, PatchError>;

#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid line pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> PatchError + '_ {
    move |source| PatchError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Outcome of [`ensure_block`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    Applied,
    AlreadyPresent,
}

/// Append `block` to `path` unless the file already contains `marker`
///
/// Creates the file (and parent directories) when missing. A symlinked
/// profile is edited at its target and the link is left in place.
pub fn ensure_block(path: &Path, marker: &str, block: &str) -> PatchResult<PatchOutcome> {
    let path = &resolve_links(path)?;
    let _lock = lock_for(path)?;

    let current = read_or_empty(path)?;
    if current.contains(marker) {
        tracing::debug!(path = %path.display(), marker, "marker present, skipping");
        return Ok(PatchOutcome::AlreadyPresent);
    }

    let mut updated = current;
    if !updated.is_empty() && !updated.ends_with('\n') {
        updated.push('\n');
    }
    if !updated.is_empty() {
        updated.push('\n');
    }
    updated.push_str(block);
    if !block.ends_with('\n') {
        updated.push('\n');
    }

    write_atomic(path, &updated)?;
    tracing::debug!(path = %path.display(), marker, "appended block");
    Ok(PatchOutcome::Applied)
}

/// Compile line patterns, failing on the first invalid one
pub fn compile_patterns(patterns: &[String]) -> PatchResult<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p).map_err(|source| PatchError::Pattern {
                pattern: p.clone(),
                source,
            })
        })
        .collect()
}

/// Remove every line matching any of `patterns`; returns how many were removed
///
/// A missing file is left missing. The file is only rewritten when something
/// was removed.
pub fn strip_lines(path: &Path, patterns: &[Regex]) -> PatchResult<usize> {
    if !path.exists() {
        return Ok(0);
    }

    let path = &resolve_links(path)?;
    let _lock = lock_for(path)?;
    let current = read_or_empty(path)?;

    let mut removed = 0;
    let mut kept = String::with_capacity(current.len());
    for line in current.lines() {
        if patterns.iter().any(|re| re.is_match(line)) {
            removed += 1;
        } else {
            kept.push_str(line);
            kept.push('\n');
        }
    }

    if removed > 0 {
        write_atomic(path, &kept)?;
        tracing::debug!(path = %path.display(), removed, "stripped lines");
    }
    Ok(removed)
}

/// Whether `path` exists and contains `marker`
pub fn contains_marker(path: &Path, marker: &str) -> bool {
    fs::read_to_string(path)
        .map(|c| c.contains(marker))
        .unwrap_or(false)
}

/// Longest symlink chain followed before giving up (matches Linux ELOOP)
const MAX_LINK_DEPTH: usize = 40;

/// Follow symlinks to the file that actually holds the content
///
/// Unlike `fs::canonicalize` this also works for a dangling link, so a
/// dotfiles link whose target does not exist yet gets the target created.
fn resolve_links(path: &Path) -> PatchResult<PathBuf> {
    let mut current = path.to_path_buf();
    for _ in 0..MAX_LINK_DEPTH {
        match fs::symlink_metadata(&current) {
            Ok(meta) if meta.file_type().is_symlink() => {
                let target = fs::read_link(&current).map_err(io_error(&current))?;
                current = match current.parent() {
                    Some(parent) if target.is_relative() => parent.join(target),
                    _ => target,
                };
            }
            _ => return Ok(current),
        }
    }

    Err(PatchError::Io {
        path: path.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::Other, "too many levels of symbolic links"),
    })
}

fn read_or_empty(path: &Path) -> PatchResult<String> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(io_error(path)(e)),
    }
}

fn lock_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.reinstaller.lock", name.trim_start_matches('.')))
}

/// Exclusive lock held until the returned file is dropped
fn lock_for(path: &Path) -> PatchResult<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }

    let lock = lock_path(path);
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(&lock)
        .map_err(io_error(&lock))?;
    file.lock_exclusive().map_err(io_error(&lock))?;
    Ok(file)
}

fn write_atomic(path: &Path, content: &str) -> PatchResult<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));

    let mut temp_file = NamedTempFile::new_in(parent).map_err(io_error(parent))?;
    temp_file
        .write_all(content.as_bytes())
        .map_err(io_error(temp_file.path()))?;
    temp_file.flush().map_err(io_error(path))?;

    // NamedTempFile is created 0600; keep the original mode
    if let Ok(metadata) = fs::metadata(path) {
        fs::set_permissions(temp_file.path(), metadata.permissions()).map_err(io_error(path))?;
    }

    temp_file
        .persist(path)
        .map_err(|e| io_error(path)(e.error))?;
    Ok(())
}
