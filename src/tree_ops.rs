//! Recursive file-tree operations
//!
//! Copy, delete, and move files or whole directory trees using compio for the
//! actual I/O and `walkdir` for enumeration. Directories are created before
//! their contents when copying and removed after their contents when
//! deleting.

use crate::error::{Result, SyncError};
use compio::io::{AsyncReadAt, AsyncWriteAtExt};
use filetime::FileTime;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;
use walkdir::WalkDir;

/// Chunk size used when streaming file content
const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// What a recursive operation touched
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TreeOpStats {
    /// Regular files copied or removed
    pub files: u64,
    /// Directories created or removed
    pub directories: u64,
    /// Bytes of file content copied
    pub bytes: u64,
}

impl TreeOpStats {
    fn merge(&mut self, other: Self) {
        self.files += other.files;
        self.directories += other.directories;
        self.bytes += other.bytes;
    }
}

/// Kind of a filesystem entry, with symlinks reported as themselves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular file (or any other non-directory, non-link entry)
    File,
    /// Directory
    Dir,
    /// Symbolic link, dangling or not
    Symlink,
}

/// Type and timestamps of one entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryInfo {
    /// What the entry is
    pub kind: EntryKind,
    /// Last modification time
    pub modified: SystemTime,
    /// Creation time, where the filesystem records one
    pub created: Option<SystemTime>,
}

impl EntryInfo {
    /// Later of creation and modification time
    #[must_use]
    pub fn changed(&self) -> SystemTime {
        self.created
            .map_or(self.modified, |created| created.max(self.modified))
    }
}

/// Stat `path` without following symlinks; `None` if nothing is there
///
/// Timestamps come from `lstat` run on the blocking pool, since compio's own
/// metadata does not carry them.
///
/// # Errors
///
/// Returns `SyncError::FileSystem` if the entry exists but cannot be stat'ed.
#[allow(clippy::future_not_send)]
pub async fn stat(path: &Path) -> Result<Option<EntryInfo>> {
    let owned = path.to_path_buf();
    let meta = compio::runtime::spawn_blocking(move || std::fs::symlink_metadata(owned))
        .await
        .map_err(|e| SyncError::FileSystem(format!("spawn_blocking failed: {e:?}")))?;

    let meta = match meta {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(SyncError::FileSystem(format!(
                "Failed to get metadata for {}: {e}",
                path.display()
            )))
        }
    };

    let file_type = meta.file_type();
    let kind = if file_type.is_symlink() {
        EntryKind::Symlink
    } else if file_type.is_dir() {
        EntryKind::Dir
    } else {
        EntryKind::File
    };
    let modified = meta.modified().map_err(|e| {
        SyncError::FileSystem(format!(
            "No modification time for {}: {e}",
            path.display()
        ))
    })?;

    Ok(Some(EntryInfo {
        kind,
        modified,
        created: meta.created().ok(),
    }))
}

/// Set the modification time of `path` (of the link itself for symlinks)
#[allow(clippy::future_not_send)]
async fn set_modified(path: &Path, modified: SystemTime, kind: EntryKind) -> Result<()> {
    let owned = path.to_path_buf();
    let mtime = FileTime::from_system_time(modified);
    compio::runtime::spawn_blocking(move || {
        if kind == EntryKind::Symlink {
            filetime::set_symlink_file_times(&owned, mtime, mtime)
        } else {
            filetime::set_file_mtime(&owned, mtime)
        }
    })
    .await
    .map_err(|e| SyncError::FileSystem(format!("spawn_blocking failed: {e:?}")))?
    .map_err(|e| {
        SyncError::FileSystem(format!(
            "Failed to set modification time on {}: {e}",
            path.display()
        ))
    })
}

#[allow(clippy::future_not_send)]
async fn create_parent(dst: &Path) -> Result<()> {
    if let Some(parent) = dst.parent() {
        compio::fs::create_dir_all(parent).await.map_err(|e| {
            SyncError::CopyFailed(format!(
                "Failed to create directory {}: {e}",
                parent.display()
            ))
        })?;
    }
    Ok(())
}

/// Recreate the symlink `src` at `dst` with the same target
#[cfg(unix)]
#[allow(clippy::future_not_send)]
async fn copy_symlink(src: &Path, dst: &Path, modified: SystemTime) -> Result<()> {
    if stat(dst).await?.is_some_and(|info| info.kind != EntryKind::Dir) {
        remove_file(dst).await?;
    }

    let (src_owned, dst_owned) = (src.to_path_buf(), dst.to_path_buf());
    compio::runtime::spawn_blocking(move || {
        let target = std::fs::read_link(&src_owned)?;
        std::os::unix::fs::symlink(target, &dst_owned)
    })
    .await
    .map_err(|e| SyncError::FileSystem(format!("spawn_blocking failed: {e:?}")))?
    .map_err(|e| {
        SyncError::CopyFailed(format!(
            "Failed to copy symlink {} -> {}: {e}",
            src.display(),
            dst.display()
        ))
    })?;

    set_modified(dst, modified, EntryKind::Symlink).await?;
    debug!("Copied symlink: {} -> {}", src.display(), dst.display());
    Ok(())
}

#[cfg(not(unix))]
#[allow(clippy::future_not_send)]
async fn copy_symlink(src: &Path, _dst: &Path, _modified: SystemTime) -> Result<()> {
    tracing::warn!("Skipping symlink {}: not supported on this platform", src.display());
    Ok(())
}

/// Copy a single non-directory entry, replacing `dst` and preserving the
/// modification time
///
/// Symlinks are recreated with the same target rather than followed. Parent
/// directories of `dst` are created as needed.
///
/// # Errors
///
/// Returns `SyncError::CopyFailed` if the source cannot be read or the
/// destination cannot be created or written.
#[allow(clippy::future_not_send)]
pub async fn copy_file(src: &Path, dst: &Path) -> Result<u64> {
    let src_info = stat(src).await?.ok_or_else(|| {
        SyncError::CopyFailed(format!("Source vanished: {}", src.display()))
    })?;
    create_parent(dst).await?;

    if src_info.kind == EntryKind::Symlink {
        copy_symlink(src, dst, src_info.modified).await?;
        return Ok(0);
    }
    // Writing through an existing link would clobber its target
    if stat(dst).await?.is_some_and(|info| info.kind == EntryKind::Symlink) {
        remove_file(dst).await?;
    }

    let src_file = compio::fs::File::open(src).await.map_err(|e| {
        SyncError::CopyFailed(format!("Failed to open source file {}: {e}", src.display()))
    })?;
    let mut dst_file = compio::fs::File::create(dst).await.map_err(|e| {
        SyncError::CopyFailed(format!(
            "Failed to create destination file {}: {e}",
            dst.display()
        ))
    })?;

    // compio fills the buffer's spare capacity and sets its length
    let mut buffer: Vec<u8> = Vec::with_capacity(COPY_BUFFER_SIZE);
    let mut offset = 0u64;

    loop {
        let read_result = src_file.read_at(buffer, offset).await;
        let bytes_read = read_result.0.map_err(|e| {
            SyncError::CopyFailed(format!("Failed to read {}: {e}", src.display()))
        })?;
        buffer = read_result.1;

        if bytes_read == 0 {
            break;
        }

        let write_result = dst_file.write_all_at(buffer, offset).await;
        write_result.0.map_err(|e| {
            SyncError::CopyFailed(format!("Failed to write {}: {e}", dst.display()))
        })?;

        buffer = write_result.1;
        buffer.clear();
        offset += bytes_read as u64;
    }

    drop(dst_file);
    set_modified(dst, src_info.modified, EntryKind::File).await?;

    debug!("Copied {} bytes: {} -> {}", offset, src.display(), dst.display());
    Ok(offset)
}

/// Copy a file or a whole directory tree from `src` to `dst`
///
/// Existing files at the destination are replaced; existing directories are
/// merged into.
///
/// # Errors
///
/// Returns an error if any entry cannot be enumerated or copied. Entries
/// copied before the failure are left in place.
#[allow(clippy::future_not_send)]
pub async fn copy_path(src: &Path, dst: &Path) -> Result<TreeOpStats> {
    copy_path_filtered(src, dst, |_| true).await
}

/// Like [`copy_path`], but only entries for which `include` returns true are
/// copied
///
/// `include` receives the path relative to `src`; rejecting a directory
/// skips everything below it.
///
/// # Errors
///
/// Returns an error if any included entry cannot be enumerated or copied.
#[allow(clippy::future_not_send)]
pub async fn copy_path_filtered<F>(src: &Path, dst: &Path, include: F) -> Result<TreeOpStats>
where
    F: Fn(&Path) -> bool,
{
    let src_info = stat(src).await?.ok_or_else(|| {
        SyncError::CopyFailed(format!("Source vanished: {}", src.display()))
    })?;

    let mut stats = TreeOpStats::default();
    if src_info.kind != EntryKind::Dir {
        stats.bytes = copy_file(src, dst).await?;
        stats.files = 1;
        return Ok(stats);
    }

    let walker = WalkDir::new(src)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry
                .path()
                .strip_prefix(src)
                .map_or(true, |relative| relative.as_os_str().is_empty() || include(relative))
        });

    for entry in walker {
        let entry = entry.map_err(|e| {
            SyncError::CopyFailed(format!("Failed to walk {}: {e}", src.display()))
        })?;
        let relative = entry.path().strip_prefix(src).map_err(|e| {
            SyncError::CopyFailed(format!("Unexpected entry {}: {e}", entry.path().display()))
        })?;
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            compio::fs::create_dir_all(&target).await.map_err(|e| {
                SyncError::CopyFailed(format!(
                    "Failed to create directory {}: {e}",
                    target.display()
                ))
            })?;
            stats.directories += 1;
        } else {
            let bytes = copy_file(entry.path(), &target).await?;
            stats.merge(TreeOpStats {
                files: 1,
                directories: 0,
                bytes,
            });
        }
    }

    Ok(stats)
}

/// Remove a file or a whole directory tree
///
/// # Errors
///
/// Returns `SyncError::FileSystem` naming the first entry that could not be
/// removed.
#[allow(clippy::future_not_send)]
pub async fn delete_path(path: &Path) -> Result<TreeOpStats> {
    let info = stat(path).await?.ok_or_else(|| {
        SyncError::FileSystem(format!("Nothing to remove at {}", path.display()))
    })?;

    let mut stats = TreeOpStats::default();
    if info.kind != EntryKind::Dir {
        remove_file(path).await?;
        stats.files = 1;
        return Ok(stats);
    }

    for entry in WalkDir::new(path).contents_first(true) {
        let entry = entry.map_err(|e| {
            SyncError::FileSystem(format!("Failed to walk {}: {e}", path.display()))
        })?;

        if entry.file_type().is_dir() {
            compio::fs::remove_dir(entry.path()).await.map_err(|e| {
                SyncError::FileSystem(format!(
                    "Failed to remove directory {}: {e}",
                    entry.path().display()
                ))
            })?;
            stats.directories += 1;
        } else {
            remove_file(entry.path()).await?;
            stats.files += 1;
        }
    }

    Ok(stats)
}

#[allow(clippy::future_not_send)]
async fn remove_file(path: &Path) -> Result<()> {
    compio::fs::remove_file(path).await.map_err(|e| {
        SyncError::FileSystem(format!("Failed to remove file {}: {e}", path.display()))
    })
}

/// Move `src` to `dst`, creating parents of `dst`
///
/// Falls back to copy-then-delete when a rename is not possible (for example
/// across filesystems).
///
/// # Errors
///
/// Returns an error if neither the rename nor the fallback succeeds.
#[allow(clippy::future_not_send)]
pub async fn move_path(src: &Path, dst: &Path) -> Result<()> {
    create_parent(dst).await?;

    if stat(dst).await?.is_some() {
        delete_path(dst).await?;
    }

    match compio::fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(e) => {
            debug!(
                "Rename {} -> {} failed ({e}), copying instead",
                src.display(),
                dst.display()
            );
            copy_path(src, dst).await?;
            delete_path(src).await.map(|_| ())
        }
    }
}

/// Read a whole file into memory
///
/// # Errors
///
/// Returns `SyncError::FileSystem` if the file cannot be read.
#[allow(clippy::future_not_send)]
pub async fn read_file(path: &Path) -> Result<Vec<u8>> {
    compio::fs::read(path)
        .await
        .map_err(|e| SyncError::FileSystem(format!("Failed to read {}: {e}", path.display())))
}

/// Replace a file's content
///
/// # Errors
///
/// Returns `SyncError::FileSystem` if the file cannot be written.
#[allow(clippy::future_not_send)]
pub async fn write_file(path: &Path, content: Vec<u8>) -> Result<()> {
    compio::fs::write(path, content)
        .await
        .0
        .map_err(|e| SyncError::FileSystem(format!("Failed to write {}: {e}", path.display())))
}

/// True if `dir` contains at least one included non-directory entry at any
/// depth
///
/// `include` receives paths relative to `dir`, as in [`copy_path_filtered`].
#[must_use]
pub fn contains_files<F>(dir: &Path, include: F) -> bool
where
    F: Fn(&Path) -> bool,
{
    WalkDir::new(dir)
        .min_depth(1)
        .into_iter()
        .filter_entry(|entry| entry.path().strip_prefix(dir).map_or(true, &include))
        .filter_map(std::result::Result::ok)
        .any(|entry| !entry.file_type().is_dir())
}

/// Entries of a tree that pass an inclusion filter
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IncludedTree {
    /// Non-directory entries, relative to the tree root
    pub files: Vec<PathBuf>,
    /// Directories, deepest first, ending with the root itself (an empty path)
    pub directories: Vec<PathBuf>,
}

/// List the entries below `dir` for which `include` returns true
///
/// `include` receives paths relative to `dir`, as in [`copy_path_filtered`];
/// rejecting a directory hides everything below it.
///
/// # Errors
///
/// Returns `SyncError::FileSystem` if the tree cannot be walked.
pub fn included_entries<F>(dir: &Path, include: F) -> Result<IncludedTree>
where
    F: Fn(&Path) -> bool,
{
    let mut tree = IncludedTree::default();
    let walker = WalkDir::new(dir)
        .contents_first(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry
                .path()
                .strip_prefix(dir)
                .map_or(true, |relative| relative.as_os_str().is_empty() || include(relative))
        });

    for entry in walker {
        let entry = entry.map_err(|e| {
            SyncError::FileSystem(format!("Failed to walk {}: {e}", dir.display()))
        })?;
        let relative = entry
            .path()
            .strip_prefix(dir)
            .map_err(|e| {
                SyncError::FileSystem(format!(
                    "Unexpected entry {}: {e}",
                    entry.path().display()
                ))
            })?
            .to_path_buf();

        if entry.file_type().is_dir() {
            tree.directories.push(relative);
        } else {
            tree.files.push(relative);
        }
    }

    Ok(tree)
}

/// Remove `dir` only if nothing is left inside it
///
/// Returns whether the directory was removed.
///
/// # Errors
///
/// Returns `SyncError::FileSystem` if an empty directory cannot be removed.
#[allow(clippy::future_not_send)]
pub async fn remove_dir_if_empty(dir: &Path) -> Result<bool> {
    let mut children = WalkDir::new(dir).min_depth(1).max_depth(1).into_iter();
    if children.next().is_some() {
        debug!("Keeping non-empty directory {}", dir.display());
        return Ok(false);
    }

    compio::fs::remove_dir(dir).await.map_err(|e| {
        SyncError::FileSystem(format!(
            "Failed to remove directory {}: {e}",
            dir.display()
        ))
    })?;
    Ok(true)
}
