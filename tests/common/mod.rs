//! Shared fixtures for synchronization tests

use filesync::conflict::{ConflictPolicy, PolicyResolver};
use filesync::{SyncOptions, SyncReport, Synchronizer};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// A local and a remote root inside one temporary directory
pub struct SyncFixture {
    _temp_dir: TempDir,
    pub local: PathBuf,
    pub remote: PathBuf,
}

impl SyncFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let local = temp_dir.path().join("local");
        let remote = temp_dir.path().join("remote");
        fs::create_dir(&local).unwrap();
        fs::create_dir(&remote).unwrap();
        Self {
            _temp_dir: temp_dir,
            local,
            remote,
        }
    }

    /// Run one sync with a fresh synchronizer, as a new process would
    pub async fn sync_with(&self, policy: ConflictPolicy, options: SyncOptions) -> SyncReport {
        let mut synchronizer =
            Synchronizer::new(&self.local, &self.remote, "local", "remote", options)
                .await
                .unwrap();
        let mut resolver = PolicyResolver::new(policy);
        let report = synchronizer.synchronize(&mut resolver).await.unwrap();

        // Let the clock move past the recorded sync time before files change again
        settle();
        report
    }

    pub async fn sync(&self) -> SyncReport {
        self.sync_with(ConflictPolicy::Skip, SyncOptions::default())
            .await
    }
}

/// Create an empty file, including parent directories
#[allow(dead_code)]
pub fn create_file(root: &Path, relative: &str) {
    write_file(root, relative, "");
}

/// Create a file with content, including parent directories
#[allow(dead_code)]
pub fn write_file(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[allow(dead_code)]
pub fn read_file(root: &Path, relative: &str) -> String {
    fs::read_to_string(root.join(relative)).unwrap()
}

/// Names in `root`, excluding filesync's own bookkeeping entries
#[allow(dead_code)]
pub fn user_entries(root: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(root)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| !matches!(name.as_str(), ".sync_log" | ".sync_exclude" | ".sync_trash"))
        .collect();
    names.sort();
    names
}

/// Sleep long enough for file timestamps to differ at millisecond precision
pub fn settle() {
    std::thread::sleep(Duration::from_millis(50));
}
