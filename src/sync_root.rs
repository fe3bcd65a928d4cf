//! One side of a synchronization
//!
//! A sync root is a directory plus the bookkeeping files kept inside it:
//! - `.sync_log`: one `hostname,millis` line per host that synced this root
//! - `.sync_exclude`: path suffixes that are never synchronized
//! - `.sync_trash/`: entries removed by the last sync

use crate::error::{Result, SyncError};
use crate::exclude::{ExclusionSet, SYNC_EXCLUDE_FILE, SYNC_LOG_FILE, SYNC_TRASH_DIR};
use crate::tree_ops;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

/// One `.sync_log` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRecord {
    /// Host that performed the sync
    pub hostname: String,
    /// Milliseconds since the Unix epoch
    pub millis: u64,
}

impl SyncRecord {
    /// Parse a `hostname,millis` line read from the log at `source`
    ///
    /// The hostname is everything before the last comma.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::SyncLog` describing why the line is malformed.
    pub fn parse(line: &str, source: &Path) -> Result<Self> {
        let malformed = |message: String| SyncError::SyncLog {
            path: source.to_path_buf(),
            message,
        };

        let (hostname, millis) = line
            .rsplit_once(',')
            .ok_or_else(|| malformed(format!("missing ',' in record '{line}'")))?;
        if hostname.is_empty() {
            return Err(malformed(format!("empty hostname in record '{line}'")));
        }
        let millis = millis
            .trim()
            .parse::<u64>()
            .map_err(|e| malformed(format!("bad timestamp in record '{line}': {e}")))?;
        Ok(Self {
            hostname: hostname.to_string(),
            millis,
        })
    }

    /// The recorded time
    #[must_use]
    pub fn time(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_millis(self.millis)
    }
}

/// Milliseconds since the Unix epoch (0 for earlier times)
#[must_use]
pub fn to_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// A directory taking part in a sync, with its bookkeeping loaded
#[derive(Debug, Clone)]
pub struct SyncRoot {
    root: PathBuf,
    hostname: String,
    last_sync: SystemTime,
    excluded: ExclusionSet,
}

impl SyncRoot {
    /// Open a root and load its exclusion list and this host's last sync time
    ///
    /// A missing `.sync_log` or a missing record for `hostname` means the root
    /// has never been synced from this host, so the last sync is the epoch.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::InvalidRoot` if `root` is not an existing
    /// directory, or `SyncError::SyncLog` if `.sync_log` is malformed.
    #[allow(clippy::future_not_send)]
    pub async fn open(root: impl Into<PathBuf>, hostname: impl Into<String>) -> Result<Self> {
        let root = root.into();
        let hostname = hostname.into();

        let meta = compio::fs::metadata(&root)
            .await
            .map_err(|e| SyncError::InvalidRoot {
                path: root.clone(),
                reason: e.to_string(),
            })?;
        if !meta.is_dir() {
            return Err(SyncError::InvalidRoot {
                path: root,
                reason: "not a directory".to_string(),
            });
        }

        let mut sync_root = Self {
            root,
            hostname,
            last_sync: UNIX_EPOCH,
            excluded: ExclusionSet::new(),
        };
        sync_root.excluded = sync_root.read_exclusions().await?;
        let records = sync_root.read_records().await?;
        if let Some(record) = records
            .iter()
            .find(|record| record.hostname == sync_root.hostname)
        {
            sync_root.last_sync = record.time();
        }

        debug!(
            "Opened sync root {} (host {}, last sync {} ms, {} exclusion(s))",
            sync_root.root.display(),
            sync_root.hostname,
            to_millis(sync_root.last_sync),
            sync_root.excluded.len()
        );
        Ok(sync_root)
    }

    /// Root directory
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Last time this host synced this root (epoch if never)
    #[must_use]
    pub const fn last_sync(&self) -> SystemTime {
        self.last_sync
    }

    /// Exclusions read from `.sync_exclude`
    #[must_use]
    pub const fn exclusions(&self) -> &ExclusionSet {
        &self.excluded
    }

    /// Absolute path of an entry given relative to the root
    #[must_use]
    pub fn resolve(&self, relative: &Path) -> PathBuf {
        self.root.join(relative)
    }

    /// Location of the trash directory
    #[must_use]
    pub fn trash_dir(&self) -> PathBuf {
        self.root.join(SYNC_TRASH_DIR)
    }

    fn log_path(&self) -> PathBuf {
        self.root.join(SYNC_LOG_FILE)
    }

    fn exclude_path(&self) -> PathBuf {
        self.root.join(SYNC_EXCLUDE_FILE)
    }

    #[allow(clippy::future_not_send)]
    async fn read_exclusions(&self) -> Result<ExclusionSet> {
        let path = self.exclude_path();
        if compio::fs::metadata(&path).await.is_err() {
            return Ok(ExclusionSet::new());
        }
        let bytes = tree_ops::read_file(&path).await?;
        Ok(ExclusionSet::parse(&String::from_utf8_lossy(&bytes)))
    }

    /// Read every record in `.sync_log`
    ///
    /// # Errors
    ///
    /// Returns `SyncError::SyncLog` if the file exists but cannot be read or
    /// contains a malformed line.
    #[allow(clippy::future_not_send)]
    pub async fn read_records(&self) -> Result<Vec<SyncRecord>> {
        let path = self.log_path();
        if compio::fs::metadata(&path).await.is_err() {
            return Ok(Vec::new());
        }

        let bytes = tree_ops::read_file(&path)
            .await
            .map_err(|e| SyncError::SyncLog {
                path: path.clone(),
                message: e.to_string(),
            })?;

        String::from_utf8_lossy(&bytes)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| SyncRecord::parse(line, &path))
            .collect()
    }

    /// Write `exclusions` to `.sync_exclude`
    ///
    /// # Errors
    ///
    /// Returns `SyncError::FileSystem` if the file cannot be written.
    #[allow(clippy::future_not_send)]
    pub async fn write_exclusions(&self, exclusions: &ExclusionSet) -> Result<()> {
        tree_ops::write_file(
            &self.exclude_path(),
            exclusions.to_file_contents().into_bytes(),
        )
        .await
    }

    /// Record a completed sync for this host, keeping other hosts' records
    ///
    /// # Errors
    ///
    /// Returns `SyncError::SyncLog` if the existing log is unreadable or the
    /// new log cannot be written.
    #[allow(clippy::future_not_send)]
    pub async fn record_sync(&mut self, time: SystemTime) -> Result<()> {
        let mut records = vec![SyncRecord {
            hostname: self.hostname.clone(),
            millis: to_millis(time),
        }];
        records.extend(
            self.read_records()
                .await?
                .into_iter()
                .filter(|record| record.hostname != self.hostname),
        );

        let mut contents = String::new();
        for record in &records {
            contents.push_str(&format!("{},{}\n", record.hostname, record.millis));
        }

        let path = self.log_path();
        tree_ops::write_file(&path, contents.into_bytes())
            .await
            .map_err(|e| SyncError::SyncLog {
                path,
                message: e.to_string(),
            })?;
        self.last_sync = time;
        Ok(())
    }

    /// Remove the trash directory and everything in it
    ///
    /// # Errors
    ///
    /// Returns an error if the trash exists but cannot be removed.
    #[allow(clippy::future_not_send)]
    pub async fn empty_trash(&self) -> Result<u64> {
        let trash = self.trash_dir();
        if compio::fs::symlink_metadata(&trash).await.is_err() {
            return Ok(0);
        }
        let removed = tree_ops::delete_path(&trash).await?;
        debug!("Emptied {} ({} file(s))", trash.display(), removed.files);
        Ok(removed.files)
    }

    /// Move an entry into the trash, keeping its relative layout
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be moved.
    #[allow(clippy::future_not_send)]
    pub async fn move_to_trash(&self, relative: &Path) -> Result<PathBuf> {
        let target = self.trash_dir().join(relative);
        tree_ops::move_path(&self.resolve(relative), &target).await?;
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::panic)]
    use super::*;
    use rstest::rstest;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_record() {
        let record = SyncRecord::parse("laptop,1700000000123", Path::new(SYNC_LOG_FILE)).unwrap();
        assert_eq!(record.hostname, "laptop");
        assert_eq!(record.millis, 1_700_000_000_123);

        let record = SyncRecord::parse("my,host,5", Path::new(SYNC_LOG_FILE)).unwrap();
        assert_eq!(record.hostname, "my,host");
    }

    #[rstest]
    #[case("laptop")]
    #[case(",12")]
    #[case("laptop,soon")]
    fn test_parse_record_rejects_garbage(#[case] line: &str) {
        let result = SyncRecord::parse(line, Path::new("/roots/a/.sync_log"));
        match result {
            Err(SyncError::SyncLog { path, message }) => {
                assert_eq!(path, Path::new("/roots/a/.sync_log"));
                assert!(message.contains(line));
            }
            other => panic!("expected a sync log error, got {other:?}"),
        }
    }

    #[compio::test]
    async fn test_open_reports_malformed_log() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        fs::write(temp_dir.path().join(SYNC_LOG_FILE), "laptop,100
broken
")?;

        let result = SyncRoot::open(temp_dir.path(), "laptop").await;
        assert!(matches!(result, Err(SyncError::SyncLog { .. })));
        Ok(())
    }

    #[compio::test]
    async fn test_open_without_history_is_never_synced() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let root = SyncRoot::open(temp_dir.path(), "local").await?;

        assert_eq!(root.last_sync(), UNIX_EPOCH);
        assert!(root.exclusions().is_empty());
        Ok(())
    }

    #[compio::test]
    async fn test_open_rejects_file_root() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let file = temp_dir.path().join("plain.txt");
        fs::write(&file, b"x")?;

        let result = SyncRoot::open(&file, "local").await;
        assert!(matches!(result, Err(SyncError::InvalidRoot { .. })));
        Ok(())
    }

    #[compio::test]
    async fn test_record_sync_keeps_other_hosts() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        fs::write(
            temp_dir.path().join(SYNC_LOG_FILE),
            "desktop,100\nlaptop,200\n",
        )?;

        let mut root = SyncRoot::open(temp_dir.path(), "laptop").await?;
        assert_eq!(to_millis(root.last_sync()), 200);

        root.record_sync(UNIX_EPOCH + Duration::from_millis(999))
            .await?;

        let log = fs::read_to_string(temp_dir.path().join(SYNC_LOG_FILE))?;
        assert_eq!(log, "laptop,999\ndesktop,100\n");
        Ok(())
    }

    #[compio::test]
    async fn test_trash_round_trip() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        fs::create_dir_all(temp_dir.path().join("docs"))?;
        fs::write(temp_dir.path().join("docs/old.txt"), b"bye")?;

        let root = SyncRoot::open(temp_dir.path(), "local").await?;
        let trashed = root.move_to_trash(Path::new("docs/old.txt")).await?;

        assert!(trashed.ends_with(".sync_trash/docs/old.txt"));
        assert!(!temp_dir.path().join("docs/old.txt").exists());
        assert_eq!(root.empty_trash().await?, 1);
        assert!(!root.trash_dir().exists());
        Ok(())
    }
}
