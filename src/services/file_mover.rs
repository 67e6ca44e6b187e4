//! Collision-safe relocation of finished downloads.
//!
//! A destination name is claimed with an exclusive create before anything is
//! moved, so two processes finalizing `report.pdf` into the same directory at
//! the same time end up with `report.pdf` and `report.1.pdf` instead of one
//! overwriting the other.

use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::types::errors::MoveError;

/// Upper bound on disambiguated names tried for one file.
pub const MAX_ATTEMPTS: u32 = 10_000;

/// Name to try on attempt `n`: the original for 0, otherwise `n` spliced in
/// before the last extension (`name.ext` → `name.n.ext`, `name` → `name.n`).
pub fn disambiguated_name(file_name: &str, n: u32) -> String {
    if n == 0 {
        return file_name.to_string();
    }
    let path = Path::new(file_name);
    match (path.file_stem(), path.extension()) {
        (Some(stem), Some(ext)) => {
            format!("{}.{}.{}", stem.to_string_lossy(), n, ext.to_string_lossy())
        }
        _ => format!("{file_name}.{n}"),
    }
}

/// Claims the first free name for `file_name` inside `dir`.
///
/// The returned path exists as an empty file owned by the caller.
pub fn reserve_destination(dir: &Path, file_name: &str) -> Result<PathBuf, MoveError> {
    for n in 0..MAX_ATTEMPTS {
        let candidate = dir.join(disambiguated_name(file_name, n));
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(_) => return Ok(candidate),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(err.into()),
        }
    }
    Err(MoveError::Exhausted {
        dir: dir.to_path_buf(),
        name: file_name.to_string(),
    })
}

/// Moves `source` into `dir` under a collision-free name and returns the new path.
///
/// `dir` is created if missing. Falls back to copy-and-delete when a rename is
/// not possible (for example across file systems).
///
/// # Errors
/// [`MoveError::MissingSource`] if `source` is not an existing file, otherwise
/// whatever I/O error stopped the move. No existing file is ever replaced.
pub fn move_into_dir(source: &Path, dir: &Path) -> Result<PathBuf, MoveError> {
    if !source.is_file() {
        return Err(MoveError::MissingSource(source.to_path_buf()));
    }
    let file_name = source
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| MoveError::NoFileName(source.to_path_buf()))?;

    fs::create_dir_all(dir)?;
    let destination = reserve_destination(dir, &file_name)?;

    if let Err(rename_err) = fs::rename(source, &destination) {
        debug!(
            source = %source.display(),
            error = %rename_err,
            "rename failed, copying instead"
        );
        if let Err(copy_err) = fs::copy(source, &destination) {
            let _ = fs::remove_file(&destination);
            return Err(copy_err.into());
        }
        if let Err(err) = fs::remove_file(source) {
            warn!(source = %source.display(), error = %err, "could not remove moved source file");
        }
    }

    Ok(destination)
}
