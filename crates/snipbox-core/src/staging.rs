//! File staging: template cloning and entry point placement.
//!
//! These functions know nothing about workspaces; they only take source and
//! destination paths, so they can be exercised on any directory.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, trace};

/// Recursively mirror `src` into `dst`, preserving relative structure.
///
/// `dst` is created if missing. Regular files are copied with [`copy_file`];
/// symlinks are recreated as links on unix (template projects commonly
/// carry `node_modules/.bin` links).
pub fn copy_tree(src: &Path, dst: &Path) -> io::Result<()> {
    let meta = fs::metadata(src)?;
    if !meta.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "template source is not a directory",
        ));
    }

    fs::create_dir_all(dst)?;
    let mut files = 0usize;
    let mut pending: Vec<(PathBuf, PathBuf)> = vec![(src.to_path_buf(), dst.to_path_buf())];

    while let Some((from_dir, to_dir)) = pending.pop() {
        for entry in fs::read_dir(&from_dir)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            let from = entry.path();
            let to = to_dir.join(entry.file_name());

            if file_type.is_dir() {
                fs::create_dir_all(&to)?;
                pending.push((from, to));
            } else if file_type.is_symlink() {
                copy_symlink(&from, &to)?;
            } else {
                copy_file(&from, &to)?;
                files += 1;
            }
        }
    }

    debug!(src = %src.display(), files, "copied template tree");
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(from: &Path, to: &Path) -> io::Result<()> {
    let target = fs::read_link(from)?;
    std::os::unix::fs::symlink(target, to)
}

#[cfg(not(unix))]
fn copy_symlink(from: &Path, to: &Path) -> io::Result<()> {
    // Follow the link and copy what it points at.
    copy_file(from, to)
}

/// Copy a single file and flush it to disk before returning.
///
/// Once this returns, a process spawned afterwards sees the full contents.
pub fn copy_file(src: &Path, dst: &Path) -> io::Result<()> {
    let mut source = File::open(src)?;
    let mut dest = File::create(dst)?;
    let bytes = io::copy(&mut source, &mut dest)?;
    dest.flush()?;
    dest.sync_all()?;
    if let Ok(meta) = source.metadata() {
        fs::set_permissions(dst, meta.permissions())?;
    }
    trace!(dst = %dst.display(), bytes, "copied file");
    Ok(())
}

/// Write submitted code to `root/name` and sync it.
///
/// Whatever the template left at `name` is unlinked first, so a symlinked
/// placeholder is replaced rather than written through.
///
/// Returns the full path of the entry file.
pub async fn place_entry_point(code: &[u8], root: &Path, name: &str) -> io::Result<PathBuf> {
    let path = root.join(name);
    match tokio::fs::remove_file(&path).await {
        Ok(()) => trace!(path = %path.display(), "replaced template entry file"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    let mut file = tokio::fs::File::create(&path).await?;
    file.write_all(code).await?;
    file.flush().await?;
    file.sync_all().await?;
    trace!(path = %path.display(), bytes = code.len(), "entry point written");
    Ok(path)
}
