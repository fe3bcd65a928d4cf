//! Two-way synchronization of a local and a remote directory tree
//!
//! Both trees are walked together, breadth first. At each directory the union
//! of child names is reconciled against the last sync time `T`:
//!
//! | local            | remote           | action                                   |
//! |------------------|------------------|------------------------------------------|
//! | dir              | dir              | descend                                  |
//! | file, changed    | file, changed    | conflict                                 |
//! | file, changed    | file             | copy local over remote (and vice versa)  |
//! | file             | dir              | conflict (type mismatch)                 |
//! | changed          | missing          | copy to remote (new since `T`)           |
//! | unchanged        | missing          | remove locally (deleted remotely)        |
//!
//! "Changed" means created or modified after `T`. Directories without any
//! files are never copied or removed, and removing a directory leaves its
//! excluded entries in place. Symlinks are copied as links. Conflicts are collected during the walk
//! and resolved afterwards by a [`ConflictResolver`].

use crate::conflict::{Conflict, ConflictKind, ConflictResolver, Resolution};
use crate::error::{Result, SyncError};
use crate::exclude::ExclusionSet;
use crate::stats::{SharedStats, SyncStats};
use crate::sync_root::{to_millis, SyncRoot};
use crate::tree_ops::{self, EntryKind};
use std::collections::{BTreeSet, VecDeque};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Which of the two roots an entry lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The local root
    Local,
    /// The remote root
    Remote,
}

impl Side {
    /// The opposite side
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Local => Self::Remote,
            Self::Remote => Self::Local,
        }
    }

    /// Lower-case name for log lines
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
        }
    }
}

/// Behaviour switches for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct SyncOptions {
    /// Report actions without touching either tree or the bookkeeping files
    pub dry_run: bool,
    /// Delete removed entries outright instead of moving them to the trash
    pub purge: bool,
    /// Remove the trash of both roots once the run finishes
    pub empty_trash: bool,
}

/// One change applied (or planned, in dry-run mode) to a tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    /// Copy an entry from `from` to the other side
    Copy {
        /// Path relative to both roots
        relative_path: PathBuf,
        /// Side holding the version that wins
        from: Side,
    },
    /// Remove an entry from `side` because the other side deleted it
    Remove {
        /// Path relative to both roots
        relative_path: PathBuf,
        /// Side the entry is removed from
        side: Side,
        /// Whether it was moved to the trash rather than deleted
        trashed: bool,
    },
}

/// A conflict together with the decision taken for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConflict {
    /// The conflict as detected
    pub conflict: Conflict,
    /// The resolver's decision
    pub resolution: Resolution,
}

/// Outcome of [`Synchronizer::synchronize`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Counters for the run
    pub stats: SyncStats,
    /// Changes applied or, in dry-run mode, planned
    pub actions: Vec<SyncAction>,
    /// Every conflict and how it was resolved
    pub conflicts: Vec<ResolvedConflict>,
    /// Time recorded in both sync logs (`None` in dry-run mode)
    pub synced_at: Option<SystemTime>,
}

/// State of one path on one side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryState {
    Missing,
    File { modified: SystemTime, changed: SystemTime },
    Dir { modified: SystemTime, changed: SystemTime },
}

impl EntryState {
    const fn is_dir(self) -> bool {
        matches!(self, Self::Dir { .. })
    }

    const fn is_file(self) -> bool {
        matches!(self, Self::File { .. })
    }

    const fn modified(self) -> SystemTime {
        match self {
            Self::Missing => UNIX_EPOCH,
            Self::File { modified, .. } | Self::Dir { modified, .. } => modified,
        }
    }

    /// Latest of creation and modification time
    const fn changed(self) -> SystemTime {
        match self {
            Self::Missing => UNIX_EPOCH,
            Self::File { changed, .. } | Self::Dir { changed, .. } => changed,
        }
    }
}

#[allow(clippy::future_not_send)]
async fn entry_state(path: &Path) -> Result<EntryState> {
    Ok(match tree_ops::stat(path).await? {
        None => EntryState::Missing,
        Some(info) if info.kind == EntryKind::Dir => EntryState::Dir {
            modified: info.modified,
            changed: info.changed(),
        },
        // Symlinks are synced as links, alongside regular files
        Some(info) => EntryState::File {
            modified: info.modified,
            changed: info.changed(),
        },
    })
}

/// `relative/inner`, without a trailing separator when `inner` is empty
fn nested(relative: &Path, inner: &Path) -> PathBuf {
    if inner.as_os_str().is_empty() {
        relative.to_path_buf()
    } else {
        relative.join(inner)
    }
}

/// Names of the direct children of `dir` (empty if `dir` does not exist)
fn child_names(dir: &Path) -> Result<BTreeSet<OsString>> {
    if !dir.is_dir() {
        return Ok(BTreeSet::new());
    }

    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .map(|entry| {
            entry.map(|e| e.file_name().to_os_string()).map_err(|e| {
                SyncError::FileSystem(format!("Failed to list {}: {e}", dir.display()))
            })
        })
        .collect()
}

/// Synchronizes a local and a remote root
#[derive(Debug)]
pub struct Synchronizer {
    local: SyncRoot,
    remote: SyncRoot,
    excluded: ExclusionSet,
    last_sync: SystemTime,
    options: SyncOptions,
}

impl Synchronizer {
    /// Open both roots and merge their exclusion lists
    ///
    /// The last sync time is the local root's record for `local_hostname`.
    ///
    /// # Errors
    ///
    /// Returns an error if either root cannot be opened.
    #[allow(clippy::future_not_send)]
    pub async fn new(
        local_root: impl Into<PathBuf>,
        remote_root: impl Into<PathBuf>,
        local_hostname: &str,
        remote_hostname: &str,
        options: SyncOptions,
    ) -> Result<Self> {
        let local = SyncRoot::open(local_root, local_hostname).await?;
        let remote = SyncRoot::open(remote_root, remote_hostname).await?;
        Ok(Self::from_roots(local, remote, options))
    }

    /// Build a synchronizer from already opened roots
    #[must_use]
    pub fn from_roots(local: SyncRoot, remote: SyncRoot, options: SyncOptions) -> Self {
        let mut excluded = local.exclusions().clone();
        excluded.extend(remote.exclusions());
        let last_sync = local.last_sync();

        Self {
            local,
            remote,
            excluded,
            last_sync,
            options,
        }
    }

    /// Time of the previous sync (epoch if never synced)
    #[must_use]
    pub const fn last_sync(&self) -> SystemTime {
        self.last_sync
    }

    /// Merged exclusion list of both roots
    #[must_use]
    pub const fn exclusions(&self) -> &ExclusionSet {
        &self.excluded
    }

    /// The root on `side`
    #[must_use]
    pub const fn root(&self, side: Side) -> &SyncRoot {
        match side {
            Side::Local => &self.local,
            Side::Remote => &self.remote,
        }
    }

    fn is_changed(&self, time: SystemTime) -> bool {
        to_millis(time) > to_millis(self.last_sync)
    }

    /// Run one synchronization
    ///
    /// # Errors
    ///
    /// Returns the first filesystem error encountered. Changes made before
    /// the error are kept and the sync logs are not updated.
    #[allow(clippy::future_not_send)]
    pub async fn synchronize(
        &mut self,
        resolver: &mut dyn ConflictResolver,
    ) -> Result<SyncReport> {
        info!(
            "Synchronizing {} <-> {} (last sync {} ms)",
            self.local.path().display(),
            self.remote.path().display(),
            to_millis(self.last_sync)
        );

        if !self.options.dry_run {
            self.local.empty_trash().await?;
            self.remote.empty_trash().await?;
        }

        let stats = SharedStats::new();
        let mut actions = Vec::new();
        let conflicts = self.walk(&stats, &mut actions).await?;

        let mut resolved = Vec::with_capacity(conflicts.len());
        for conflict in conflicts {
            let resolution = resolver.resolve(&conflict)?;
            match resolution {
                Resolution::KeepLocal => {
                    self.copy_entry(&conflict.relative_path, Side::Local, &stats, &mut actions)
                        .await?;
                }
                Resolution::KeepRemote => {
                    self.copy_entry(&conflict.relative_path, Side::Remote, &stats, &mut actions)
                        .await?;
                }
                Resolution::Skip => {
                    warn!(
                        "Skipping conflict: {}",
                        conflict.relative_path.display()
                    );
                    stats.increment_skipped();
                }
            }
            resolved.push(ResolvedConflict {
                conflict,
                resolution,
            });
        }

        let synced_at = if self.options.dry_run {
            None
        } else {
            Some(self.finalize().await?)
        };

        let stats = stats.into_inner();
        info!(
            "Sync finished: {} file(s) copied, {} removed, {} conflict(s), {} skipped",
            stats.files_copied, stats.files_removed, stats.conflicts, stats.skipped
        );

        Ok(SyncReport {
            stats,
            actions,
            conflicts: resolved,
            synced_at,
        })
    }

    /// Walk both trees and apply every non-conflicting change
    #[allow(clippy::future_not_send)]
    async fn walk(
        &self,
        stats: &SharedStats,
        actions: &mut Vec<SyncAction>,
    ) -> Result<Vec<Conflict>> {
        let mut conflicts = Vec::new();
        let mut queue: VecDeque<PathBuf> = VecDeque::new();
        queue.push_back(PathBuf::new());

        while let Some(dir) = queue.pop_front() {
            debug!("Comparing directory '{}'", dir.display());

            let mut names = child_names(&self.local.resolve(&dir))?;
            names.extend(child_names(&self.remote.resolve(&dir))?);

            let mut entries = Vec::with_capacity(names.len());
            for name in names {
                let relative = dir.join(&name);
                if self.excluded.is_excluded(&relative) {
                    debug!("Excluded: {}", relative.display());
                    continue;
                }
                let local = entry_state(&self.local.resolve(&relative)).await?;
                let remote = entry_state(&self.remote.resolve(&relative)).await?;
                entries.push((relative, local, remote));
            }

            // Files before directories at each level
            entries.sort_by_key(|(_, local, remote)| !(local.is_file() || remote.is_file()));

            for (relative, local, remote) in entries {
                match (local, remote) {
                    (EntryState::Dir { .. }, EntryState::Dir { .. }) => queue.push_back(relative),
                    (EntryState::File { .. }, EntryState::File { .. }) => {
                        let local_changed = self.is_changed(local.modified());
                        let remote_changed = self.is_changed(remote.modified());
                        if local_changed && remote_changed {
                            stats.increment_conflicts();
                            conflicts.push(Conflict {
                                relative_path: relative,
                                kind: ConflictKind::BothModified,
                                local_modified: local.modified(),
                                remote_modified: remote.modified(),
                            });
                        } else if local_changed {
                            self.copy_entry(&relative, Side::Local, stats, actions)
                                .await?;
                        } else if remote_changed {
                            self.copy_entry(&relative, Side::Remote, stats, actions)
                                .await?;
                        }
                    }
                    (EntryState::Missing, EntryState::Missing) => {}
                    (present, EntryState::Missing) => {
                        self.reconcile_one_sided(&relative, Side::Local, present, stats, actions)
                            .await?;
                    }
                    (EntryState::Missing, present) => {
                        self.reconcile_one_sided(&relative, Side::Remote, present, stats, actions)
                            .await?;
                    }
                    _ => {
                        stats.increment_conflicts();
                        conflicts.push(Conflict {
                            relative_path: relative,
                            kind: ConflictKind::TypeMismatch,
                            local_modified: local.modified(),
                            remote_modified: remote.modified(),
                        });
                    }
                }
            }
        }

        Ok(conflicts)
    }

    /// Entry exists only on `side`: either new there, or deleted on the other side
    #[allow(clippy::future_not_send)]
    async fn reconcile_one_sided(
        &self,
        relative: &Path,
        side: Side,
        state: EntryState,
        stats: &SharedStats,
        actions: &mut Vec<SyncAction>,
    ) -> Result<()> {
        let absolute = self.root(side).resolve(relative);
        let included = |inner: &Path| !self.excluded.is_excluded(&relative.join(inner));
        if state.is_dir() && !tree_ops::contains_files(&absolute, included) {
            debug!("Ignoring empty directory: {}", absolute.display());
            return Ok(());
        }

        if self.is_changed(state.changed()) {
            self.copy_entry(relative, side, stats, actions).await
        } else {
            self.remove_entry(relative, side, stats, actions).await
        }
    }

    /// Make the other side match `from`
    #[allow(clippy::future_not_send)]
    async fn copy_entry(
        &self,
        relative: &Path,
        from: Side,
        stats: &SharedStats,
        actions: &mut Vec<SyncAction>,
    ) -> Result<()> {
        let source = self.root(from).resolve(relative);
        let destination = self.root(from.other()).resolve(relative);
        info!(
            "COPY: {} '{}' -> {}",
            from.label(),
            relative.display(),
            from.other().label()
        );
        actions.push(SyncAction::Copy {
            relative_path: relative.to_path_buf(),
            from,
        });

        if self.options.dry_run {
            return Ok(());
        }

        // A file replacing a directory (or the reverse) needs the old entry gone
        let existing = entry_state(&destination).await?;
        let source_state = entry_state(&source).await?;
        if existing != EntryState::Missing && existing.is_dir() != source_state.is_dir() {
            let removed = tree_ops::delete_path(&destination).await?;
            stats.record_removal(removed.files);
        }

        let included = |inner: &Path| !self.excluded.is_excluded(&relative.join(inner));
        let copied = tree_ops::copy_path_filtered(&source, &destination, included).await?;
        stats.record_copy(copied);
        Ok(())
    }

    /// Remove an entry from `side`, into the trash unless purging
    #[allow(clippy::future_not_send)]
    async fn remove_entry(
        &self,
        relative: &Path,
        side: Side,
        stats: &SharedStats,
        actions: &mut Vec<SyncAction>,
    ) -> Result<()> {
        let trashed = !self.options.purge;
        info!(
            "DELETE: {} '{}'{}",
            side.label(),
            relative.display(),
            if trashed { " (to trash)" } else { "" }
        );
        actions.push(SyncAction::Remove {
            relative_path: relative.to_path_buf(),
            side,
            trashed,
        });

        if self.options.dry_run {
            return Ok(());
        }

        let root = self.root(side);
        let absolute = root.resolve(relative);
        // Excluded entries inside a removed directory stay where they are
        let tree = if entry_state(&absolute).await?.is_dir() {
            tree_ops::included_entries(&absolute, |inner| {
                !self.excluded.is_excluded(&relative.join(inner))
            })?
        } else {
            tree_ops::IncludedTree {
                files: vec![PathBuf::new()],
                directories: Vec::new(),
            }
        };

        for file in &tree.files {
            let path = nested(relative, file);
            if trashed {
                root.move_to_trash(&path).await?;
            } else {
                tree_ops::delete_path(&root.resolve(&path)).await?;
            }
        }
        for dir in &tree.directories {
            tree_ops::remove_dir_if_empty(&root.resolve(&nested(relative, dir))).await?;
        }

        stats.record_removal(tree.files.len() as u64);
        Ok(())
    }

    /// Write merged exclusions and the new sync time to both roots
    #[allow(clippy::future_not_send)]
    async fn finalize(&mut self) -> Result<SystemTime> {
        self.local.write_exclusions(&self.excluded).await?;
        self.remote.write_exclusions(&self.excluded).await?;

        let now = SystemTime::now();
        self.local.record_sync(now).await?;
        self.remote.record_sync(now).await?;
        self.last_sync = now;

        if self.options.empty_trash {
            self.local.empty_trash().await?;
            self.remote.empty_trash().await?;
        }

        Ok(now)
    }
}
