//! Filesystem utilities.
//!
//! Everything the build engine touches on disk goes through here: bounded
//! whole-file reads, change-only writes (which keep build-tree mtimes stable
//! across regenerations), cached directory creation, and the path shortening
//! used to map source paths into the build tree.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glob::glob;
use thiserror::Error;

use crate::cache::Cache;

/// Default cap for [`read_entire_file`]; callers can pass their own.
pub const DEFAULT_FILE_LIMIT: u64 = 16 * 1024 * 1024;

/// Typed filesystem failures that callers may want to match on.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("{path} exceeds the {limit} byte read limit")]
    FileTooBig { path: PathBuf, limit: u64 },
}

/// Read a file in full, growing the buffer as needed.
///
/// Fails with [`FsError::FileTooBig`] once more than `limit` bytes have been
/// read; the limit is a guard against pathological inputs, not a preallocated
/// buffer size.
pub fn read_entire_file(path: &Path, limit: u64) -> Result<Vec<u8>> {
    let file =
        File::open(path).with_context(|| format!("failed to open file: {}", path.display()))?;

    let mut reader = io::BufReader::new(file);
    let mut data = Vec::new();
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader
            .read(&mut chunk)
            .with_context(|| format!("failed to read file: {}", path.display()))?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&chunk[..n]);
        if data.len() as u64 > limit {
            return Err(FsError::FileTooBig {
                path: path.to_path_buf(),
                limit,
            }
            .into());
        }
    }
    Ok(data)
}

/// Write a file, creating missing parent directories first.
pub fn write_entire_file(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }
    fs::write(path, data).with_context(|| format!("failed to write file: {}", path.display()))
}

/// Write a file only when its content differs from `data`.
///
/// A missing file counts as different. Returns whether a write happened;
/// an untouched file keeps its mtime, so downstream rebuild checks stay
/// quiet across regenerations.
pub fn write_entire_file_if_changed(path: &Path, data: &[u8], limit: u64) -> Result<bool> {
    let existing = match File::open(path) {
        Ok(file) => {
            let mut reader = io::BufReader::new(file);
            let mut buf = Vec::new();
            reader
                .read_to_end(&mut buf)
                .with_context(|| format!("failed to read file: {}", path.display()))?;
            if buf.len() as u64 > limit {
                return Err(FsError::FileTooBig {
                    path: path.to_path_buf(),
                    limit,
                }
                .into());
            }
            Some(buf)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => {
            return Err(e).with_context(|| format!("failed to open file: {}", path.display()))
        }
    };

    if existing.as_deref() == Some(data) {
        tracing::debug!("{} is unchanged", path.display());
        return Ok(false);
    }
    write_entire_file(path, data)?;
    Ok(true)
}

/// Ensure a directory exists, short-circuited by the `dir_exists` cache.
///
/// An existing path is success. Creating a directory records it and every
/// ancestor in the cache.
pub fn ensure_dir(dir_exists: &mut Cache<PathBuf, ()>, path: &Path) -> Result<()> {
    if dir_exists.contains(path) {
        return Ok(());
    }
    fs::create_dir_all(path)
        .with_context(|| format!("failed to create directory: {}", path.display()))?;

    dir_exists.put(path.to_path_buf(), ());
    let mut ancestor = path.parent();
    while let Some(dir) = ancestor {
        if dir.as_os_str().is_empty() || dir_exists.contains(dir) {
            break;
        }
        dir_exists.put(dir.to_path_buf(), ());
        ancestor = dir.parent();
    }
    Ok(())
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(dir_exists: &mut Cache<PathBuf, ()>, path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_dir(dir_exists, parent),
        _ => Ok(()),
    }
}

/// Remove a directory and all its contents, if it exists.
pub fn remove_dir_all_if_exists(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)
            .with_context(|| format!("failed to remove directory: {}", path.display()))?;
    }
    Ok(())
}

/// Normalize a path for use inside the build tree: repeatedly strip a
/// leading `./` and a trailing `/` (the backslash forms on Windows), so
/// `./src/add.c` maps onto `<build_dir>/obj/src/add.c<ext>`.
pub fn shorten_path(path: &Path) -> PathBuf {
    let mut s = path.to_string_lossy().into_owned();
    loop {
        let before = s.len();
        for prefix in ["./", ".\\"] {
            if let Some(rest) = s.strip_prefix(prefix) {
                s = rest.to_string();
            }
        }
        for suffix in ["/", "\\"] {
            if let Some(rest) = s.strip_suffix(suffix) {
                s = rest.to_string();
            }
        }
        if s.len() == before {
            break;
        }
    }
    PathBuf::from(s)
}

/// Find files matching glob patterns relative to a base directory.
pub fn glob_files(base: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut results = Vec::new();

    for pattern in patterns {
        let full_pattern = base.join(pattern);
        let pattern_str = full_pattern.to_string_lossy();

        for entry in
            glob(&pattern_str).with_context(|| format!("invalid glob pattern: {}", pattern))?
        {
            match entry {
                Ok(path) => {
                    if path.is_file() {
                        results.push(path);
                    }
                }
                Err(e) => {
                    tracing::warn!("glob error: {}", e);
                }
            }
        }
    }

    results.sort();
    results.dedup();
    Ok(results)
}
