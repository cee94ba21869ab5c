//! Path canonicalization and atomic file replacement

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// Directory that holds `path`, treating a bare file name as living in `.`
pub(crate) fn parent_dir_or_dot(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Resolve `path` to the key the cache stores it under
///
/// Existing files resolve through the filesystem (symlinks, `..`, case on
/// case-insensitive volumes). A file that does not exist yet is resolved
/// through its parent directory; when that is missing too, the path is
/// normalized lexically against the current directory.
pub(crate) fn canonical_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = fs::canonicalize(path) {
        return canonical;
    }

    if let Some(file_name) = path.file_name() {
        if let Ok(dir) = fs::canonicalize(parent_dir_or_dot(path)) {
            return dir.join(file_name);
        }
    }

    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        }
    };
    normalize_lexically(&absolute)
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else if !out.has_root() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Replace `dest` with `bytes` so readers see either the old or the new file
///
/// The bytes go to a temporary file in the destination directory which is
/// then renamed over `dest`. The directory is never created; a missing one
/// is reported as [`Error::NotWritableLocation`]. On any failure the
/// temporary file is removed and `dest` is left as it was.
///
/// A replaced file keeps its permissions; a new one gets the mode
/// `File::create` would give it.
pub(crate) fn atomic_write(dest: &Path, bytes: &[u8], sync: bool) -> Result<()> {
    let dir = parent_dir_or_dot(dest);
    if !dir.is_dir() {
        return Err(Error::NotWritableLocation {
            path: dest.to_path_buf(),
            reason: format!("directory {} does not exist", dir.display()),
        });
    }

    let existing = fs::metadata(dest).ok().filter(|meta| meta.is_file());

    let mut builder = tempfile::Builder::new();
    builder.prefix(".sheetbatch-").suffix(".tmp");
    if existing.is_none() {
        if let Some(permissions) = new_file_permissions() {
            builder.permissions(permissions);
        }
    }

    let mut tmp = builder
        .tempfile_in(dir)
        .map_err(|e| Error::NotWritableLocation {
            path: dest.to_path_buf(),
            reason: e.to_string(),
        })?;

    let io_err = |source: io::Error| Error::FlushIo {
        path: dest.to_path_buf(),
        source,
    };

    if let Some(meta) = &existing {
        tmp.as_file()
            .set_permissions(meta.permissions())
            .map_err(io_err)?;
    }

    tmp.write_all(bytes).map_err(io_err)?;
    tmp.flush().map_err(io_err)?;
    if sync {
        tmp.as_file().sync_all().map_err(io_err)?;
    }

    tmp.persist(dest).map_err(|e| io_err(e.error))?;

    if sync {
        // Not every platform can open a directory for syncing.
        if let Err(err) = sync_dir(dir) {
            log::debug!("could not sync directory {}: {}", dir.display(), err);
        }
    }
    Ok(())
}

fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

/// Creation mode for a file that does not exist yet; the umask still applies
#[cfg(unix)]
fn new_file_permissions() -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(fs::Permissions::from_mode(0o666))
}

#[cfg(not(unix))]
fn new_file_permissions() -> Option<fs::Permissions> {
    None
}
