//! Filesystem helpers shared by producer and curator
//!
//! The alert directory is shared between two processes without locks, so every
//! helper here is written to be safe to repeat: a missing source is reported as
//! `Ok(false)` rather than an error.

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Write `contents` to `target` through a hidden temporary sibling and rename.
///
/// Readers listing the directory either see no file or the complete file.
pub async fn write_atomic(target: &Path, contents: &[u8]) -> io::Result<()> {
    let temp = temp_path_for(target)?;

    if let Err(e) = fs::write(&temp, contents).await {
        let _ = fs::remove_file(&temp).await;
        return Err(e);
    }

    if let Err(e) = fs::rename(&temp, target).await {
        let _ = fs::remove_file(&temp).await;
        return Err(e);
    }

    Ok(())
}

/// Hidden temp name next to the target: `dir/.name.partial`
fn temp_path_for(target: &Path) -> io::Result<PathBuf> {
    let file_name = target.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("target has no file name: {}", target.display()),
        )
    })?;
    let mut temp_name = std::ffi::OsString::from(".");
    temp_name.push(file_name);
    temp_name.push(".partial");
    Ok(target.with_file_name(temp_name))
}

/// Move `src` to `dst`, creating the destination directory when needed.
///
/// Returns `Ok(false)` when `src` does not exist. Falls back to copy + remove
/// when source and destination live on different filesystems.
pub async fn move_file(src: &Path, dst: &Path) -> io::Result<bool> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).await?;
    }

    match fs::rename(src, dst).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("move skipped, source missing: {}", src.display());
            Ok(false)
        }
        Err(e) if is_cross_device(&e) => {
            debug!(
                "rename crosses filesystems, copying {} -> {}",
                src.display(),
                dst.display()
            );
            match fs::copy(src, dst).await {
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
                Err(e) => return Err(e),
            }
            remove_if_exists(src).await?;
            Ok(true)
        }
        Err(e) => Err(e),
    }
}

/// Remove a file. Returns `Ok(false)` when it was already gone.
pub async fn remove_if_exists(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Number of entries directly inside `dir`
pub async fn count_entries(dir: &Path) -> io::Result<usize> {
    let mut entries = fs::read_dir(dir).await?;
    let mut count = 0;
    while entries.next_entry().await?.is_some() {
        count += 1;
    }
    Ok(count)
}

/// Number of regular files directly inside `dir`; a missing directory counts as empty
pub async fn count_files(dir: &Path) -> io::Result<usize> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };
    let mut count = 0;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            count += 1;
        }
    }
    Ok(count)
}

#[cfg(unix)]
fn is_cross_device(e: &io::Error) -> bool {
    // EXDEV
    e.raw_os_error() == Some(18)
}

#[cfg(windows)]
fn is_cross_device(e: &io::Error) -> bool {
    // ERROR_NOT_SAME_DEVICE
    e.raw_os_error() == Some(17)
}

#[cfg(not(any(unix, windows)))]
fn is_cross_device(_e: &io::Error) -> bool {
    false
}
