//! Path exclusion lists (`.sync_exclude`)
//!
//! Each line of the file is a relative path. An entry is excluded when its
//! path ends with one of the listed paths, compared component by component,
//! so `target` excludes `a/target` and `a/b/target` but not `a/mytarget`.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// File name of the per-root exclusion list
pub const SYNC_EXCLUDE_FILE: &str = ".sync_exclude";

/// File name of the per-root sync history
pub const SYNC_LOG_FILE: &str = ".sync_log";

/// Directory name of the per-root trash
pub const SYNC_TRASH_DIR: &str = ".sync_trash";

/// Entries that are never synchronized regardless of the list contents
pub const BUILTIN_EXCLUSIONS: [&str; 3] = [SYNC_LOG_FILE, SYNC_EXCLUDE_FILE, SYNC_TRASH_DIR];

/// Set of excluded path suffixes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet {
    paths: BTreeSet<PathBuf>,
}

impl ExclusionSet {
    /// Create an empty set (built-ins still apply)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the contents of a `.sync_exclude` file
    ///
    /// Blank lines are ignored and surrounding whitespace is trimmed.
    #[must_use]
    pub fn parse(contents: &str) -> Self {
        let paths = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(PathBuf::from)
            .collect();
        Self { paths }
    }

    /// Add one path suffix
    pub fn insert(&mut self, path: impl Into<PathBuf>) {
        self.paths.insert(path.into());
    }

    /// Merge another set into this one
    pub fn extend(&mut self, other: &Self) {
        self.paths.extend(other.paths.iter().cloned());
    }

    /// Listed paths, sorted (built-ins not included)
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }

    /// Number of listed paths (built-ins not included)
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// True when nothing is listed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Whether `candidate` should be skipped
    #[must_use]
    pub fn is_excluded(&self, candidate: &Path) -> bool {
        BUILTIN_EXCLUSIONS
            .iter()
            .any(|builtin| candidate.ends_with(builtin))
            || self.paths.iter().any(|excluded| candidate.ends_with(excluded))
    }

    /// Serialize to the `.sync_exclude` format, one entry per line
    #[must_use]
    pub fn to_file_contents(&self) -> String {
        let mut out = String::new();
        for path in &self.paths {
            out.push_str(&path.to_string_lossy());
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("target", "project/target", true)]
    #[case("target", "project/target/debug", false)]
    #[case("target", "project/mytarget", false)]
    #[case("node_modules/cache", "web/node_modules/cache", true)]
    #[case("node_modules/cache", "web/cache", false)]
    fn test_suffix_matching(#[case] listed: &str, #[case] candidate: &str, #[case] expected: bool) {
        let set = ExclusionSet::parse(listed);
        assert_eq!(set.is_excluded(Path::new(candidate)), expected);
    }

    #[test]
    fn test_builtins_always_excluded() {
        let set = ExclusionSet::new();
        assert!(set.is_excluded(Path::new(".sync_log")));
        assert!(set.is_excluded(Path::new("sub/.sync_exclude")));
        assert!(set.is_excluded(Path::new(".sync_trash")));
        assert!(!set.is_excluded(Path::new("notes.txt")));
    }

    #[test]
    fn test_parse_skips_blank_lines() {
        let set = ExclusionSet::parse("build\n\n  .git  \n");
        assert_eq!(set.len(), 2);
        assert_eq!(set.to_file_contents(), ".git\nbuild\n");
    }

    #[test]
    fn test_merge_deduplicates() {
        let mut local = ExclusionSet::parse("build\n.git\n");
        let remote = ExclusionSet::parse(".git\ncache\n");
        local.extend(&remote);
        assert_eq!(local.to_file_contents(), ".git\nbuild\ncache\n");
    }
}
