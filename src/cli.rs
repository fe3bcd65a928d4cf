//! Command-line interface definitions
//!
//! This module organizes CLI arguments by **functional usage** - each group
//! contains the options needed by a specific component or subsystem.

use crate::conflict::ConflictPolicy;
use crate::synchronizer::SyncOptions;
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;

/// Two-way directory synchronizer
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// The two roots to synchronize
    #[command(flatten)]
    pub paths: PathConfig,

    /// Host names recorded in each root's sync log
    #[command(flatten)]
    pub hosts: HostConfig,

    /// Conflict and removal behaviour
    #[command(flatten)]
    pub sync: SyncConfig,

    /// Output and logging configuration
    #[command(flatten)]
    pub output: OutputConfig,
}

// ============================================================================
// FUNCTIONAL GROUPS: Organized by what component consumes them
// ============================================================================

/// Roots configuration
///
/// Used by: `main()`, `Synchronizer::new()`
#[derive(clap::Args, Debug, Clone)]
pub struct PathConfig {
    /// Local root directory
    #[arg(value_name = "LOCAL_ROOT")]
    pub local_root: PathBuf,

    /// Remote root directory
    #[arg(value_name = "REMOTE_ROOT")]
    pub remote_root: PathBuf,
}

/// Host names
///
/// Used by: `SyncRoot::open()`, `SyncRoot::record_sync()`
#[derive(clap::Args, Debug, Clone)]
pub struct HostConfig {
    /// Name of this machine as recorded in `.sync_log`
    #[arg(value_name = "LOCAL_HOSTNAME")]
    pub local_hostname: String,

    /// Name of the machine owning the remote root
    #[arg(value_name = "REMOTE_HOSTNAME")]
    pub remote_hostname: String,
}

/// Synchronization behaviour
///
/// Used by: `Synchronizer::synchronize()`, conflict resolver selection
#[derive(clap::Args, Debug, Clone)]
#[command(next_help_heading = "Sync Options")]
pub struct SyncConfig {
    /// How to resolve files changed on both sides
    #[arg(long, value_enum, default_value_t = ConflictPolicy::Ask)]
    pub conflict: ConflictPolicy,

    /// Delete removed entries instead of moving them to `.sync_trash`
    #[arg(long)]
    pub purge: bool,

    /// Remove `.sync_trash` from both roots after a successful sync
    #[arg(long)]
    pub empty_trash: bool,
}

/// Output and logging configuration
///
/// Used by: `main()`, logging initialization
#[derive(clap::Args, Debug, Clone)]
#[command(next_help_heading = "Output Options")]
pub struct OutputConfig {
    /// Show what would change without touching either root
    #[arg(long)]
    pub dry_run: bool,

    /// Verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress all output except errors)
    #[arg(short, long)]
    pub quiet: bool,
}

impl OutputConfig {
    /// Log level implied by `-q` / `-v`
    #[must_use]
    pub const fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::ERROR;
        }
        match self.verbose {
            0 => LevelFilter::INFO,
            1 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }
}

// ============================================================================
// IMPLEMENTATION: Convenience methods and validation
// ============================================================================

impl Args {
    /// Validate command-line arguments
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - Either root does not exist or is not a directory
    /// - Both roots are the same directory
    /// - A hostname is empty or contains a comma (the sync log separator)
    /// - Both --quiet and --verbose options are used
    pub fn validate(&self) -> Result<()> {
        for root in [&self.paths.local_root, &self.paths.remote_root] {
            if !root.exists() {
                anyhow::bail!("Root path does not exist: {}", root.display());
            }
            if !root.is_dir() {
                anyhow::bail!("Root path must be a directory: {}", root.display());
            }
        }

        let local = self.paths.local_root.canonicalize()?;
        let remote = self.paths.remote_root.canonicalize()?;
        if local == remote {
            anyhow::bail!(
                "Local and remote roots are the same directory: {}",
                local.display()
            );
        }

        for hostname in [&self.hosts.local_hostname, &self.hosts.remote_hostname] {
            if hostname.trim().is_empty() {
                anyhow::bail!("Hostnames must not be empty");
            }
            if hostname.contains(',') || hostname.contains('\n') {
                anyhow::bail!("Hostname must not contain ',' or newlines: {hostname:?}");
            }
        }

        if self.output.quiet && self.output.verbose > 0 {
            anyhow::bail!("Cannot use both --quiet and --verbose options");
        }

        Ok(())
    }

    /// Options for `Synchronizer`
    #[must_use]
    pub const fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            dry_run: self.output.dry_run,
            purge: self.sync.purge,
            empty_trash: self.sync.empty_trash,
        }
    }

    /// Get local root
    #[must_use]
    pub const fn local_root(&self) -> &PathBuf {
        &self.paths.local_root
    }

    /// Get remote root
    #[must_use]
    pub const fn remote_root(&self) -> &PathBuf {
        &self.paths.remote_root
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    use super::*;
    use tempfile::TempDir;

    /// Helper to create default test Args with custom paths
    fn create_test_args(local_root: PathBuf, remote_root: PathBuf) -> Args {
        Args {
            paths: PathConfig {
                local_root,
                remote_root,
            },
            hosts: HostConfig {
                local_hostname: "laptop".to_string(),
                remote_hostname: "server".to_string(),
            },
            sync: SyncConfig {
                conflict: ConflictPolicy::Ask,
                purge: false,
                empty_trash: false,
            },
            output: OutputConfig {
                dry_run: false,
                verbose: 0,
                quiet: false,
            },
        }
    }

    fn two_roots() -> (TempDir, PathBuf, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let local = temp_dir.path().join("local");
        let remote = temp_dir.path().join("remote");
        std::fs::create_dir(&local).unwrap();
        std::fs::create_dir(&remote).unwrap();
        (temp_dir, local, remote)
    }

    #[test]
    fn test_validate_with_existing_roots() {
        let (_temp_dir, local, remote) = two_roots();
        let args = create_test_args(local, remote);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validate_with_nonexistent_root() {
        let (_temp_dir, local, _) = two_roots();
        let args = create_test_args(local, PathBuf::from("/nonexistent/path"));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_same_root() {
        let (_temp_dir, local, _) = two_roots();
        let args = create_test_args(local.clone(), local.join("."));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_comma_hostname() {
        let (_temp_dir, local, remote) = two_roots();
        let mut args = create_test_args(local, remote);
        args.hosts.local_hostname = "lap,top".to_string();
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_quiet_and_verbose() {
        let (_temp_dir, local, remote) = two_roots();
        let mut args = create_test_args(local, remote);
        args.output.quiet = true;
        args.output.verbose = 1;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_parse_from_command_line() {
        let args = Args::parse_from([
            "filesync",
            "/a",
            "/b",
            "laptop",
            "server",
            "--conflict",
            "newer",
            "--purge",
            "-vv",
        ]);

        assert_eq!(args.local_root(), &PathBuf::from("/a"));
        assert_eq!(args.remote_root(), &PathBuf::from("/b"));
        assert_eq!(args.sync.conflict, ConflictPolicy::Newer);
        assert!(args.sync_options().purge);
        assert!(!args.sync_options().dry_run);
        assert_eq!(args.output.log_level(), LevelFilter::TRACE);
    }
}
