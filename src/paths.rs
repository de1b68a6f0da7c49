//! Path resolution for user-supplied file arguments.
//!
//! Only the current user's home shorthand is understood: `~` and `~/rest`.
//! Forms such as `~otheruser/schema.xsd` are passed through untouched, there
//! is no per-user home lookup.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// The current user's home directory could not be determined
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot determine the current user's home directory")]
pub struct HomeDirUnavailable;

/// Replace a leading `~` or `~/` with the current user's home directory.
///
/// Relative paths stay relative; resolving them against the working
/// directory is [`resolve`]'s job.
pub fn expand_home(path: &str) -> Result<PathBuf, HomeDirUnavailable> {
    expand_home_with(path, dirs::home_dir)
}

/// Same as [`expand_home`] with an injectable home directory lookup
pub fn expand_home_with<F>(path: &str, home_dir: F) -> Result<PathBuf, HomeDirUnavailable>
where
    F: FnOnce() -> Option<PathBuf>,
{
    let rest = match path.strip_prefix('~') {
        Some(rest) => rest,
        None => return Ok(PathBuf::from(path)),
    };

    if !rest.is_empty() && !rest.starts_with('/') {
        // ~otheruser
        return Ok(PathBuf::from(path));
    }

    let home = home_dir().ok_or(HomeDirUnavailable)?;
    let rest = rest.trim_start_matches('/');
    if rest.is_empty() {
        Ok(home)
    } else {
        Ok(home.join(rest))
    }
}

/// Expand the home shorthand and make the result absolute.
///
/// Does not touch the filesystem: the file may not exist yet, and symlinks
/// are kept as written so diagnostics show the path the user typed.
pub fn resolve(path: &str) -> Result<PathBuf, HomeDirUnavailable> {
    let expanded = expand_home(path)?;
    Ok(absolutize(&expanded))
}

fn absolutize(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Directory that relative references inside `path` are resolved against
pub fn containing_directory(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
