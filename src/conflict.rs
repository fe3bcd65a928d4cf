//! Conflict detection results and resolution strategies
//!
//! A conflict arises when both sides changed the same entry since the last
//! sync, or when one side has a file where the other has a directory.

use crate::error::{Result, SyncError};
use chrono::{DateTime, Local};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::time::SystemTime;

/// Why an entry could not be synchronized automatically
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// Both files were modified after the last sync
    BothModified,
    /// One side is a file and the other a directory
    TypeMismatch,
}

/// An entry that needs a decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    /// Path relative to both roots
    pub relative_path: PathBuf,
    /// What kind of conflict this is
    pub kind: ConflictKind,
    /// Modification time of the local entry
    pub local_modified: SystemTime,
    /// Modification time of the remote entry
    pub remote_modified: SystemTime,
}

/// Decision for one conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Copy the local version over the remote one
    KeepLocal,
    /// Copy the remote version over the local one
    KeepRemote,
    /// Leave both sides untouched
    Skip,
}

/// Non-interactive conflict policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ConflictPolicy {
    /// Ask on the terminal for every conflict
    #[default]
    Ask,
    /// Always keep the local version
    Local,
    /// Always keep the remote version
    Remote,
    /// Keep whichever version was modified last
    Newer,
    /// Leave conflicting entries alone
    Skip,
}

/// Decides how each conflict is resolved
pub trait ConflictResolver {
    /// Pick a resolution for `conflict`
    ///
    /// # Errors
    ///
    /// Returns an error if the decision could not be obtained (for example
    /// the prompt could not be written).
    fn resolve(&mut self, conflict: &Conflict) -> Result<Resolution>;
}

/// Resolves every conflict the same way
#[derive(Debug, Clone, Copy)]
pub struct PolicyResolver {
    policy: ConflictPolicy,
}

impl PolicyResolver {
    /// Create a resolver for a non-interactive policy
    ///
    /// `ConflictPolicy::Ask` behaves like `Skip` here; use [`PromptResolver`]
    /// to actually ask.
    #[must_use]
    pub const fn new(policy: ConflictPolicy) -> Self {
        Self { policy }
    }
}

impl ConflictResolver for PolicyResolver {
    fn resolve(&mut self, conflict: &Conflict) -> Result<Resolution> {
        Ok(match self.policy {
            ConflictPolicy::Local => Resolution::KeepLocal,
            ConflictPolicy::Remote => Resolution::KeepRemote,
            // A newer directory says nothing about a file on the other side
            ConflictPolicy::Newer if conflict.kind == ConflictKind::TypeMismatch => {
                Resolution::Skip
            }
            ConflictPolicy::Newer => {
                if conflict.local_modified >= conflict.remote_modified {
                    Resolution::KeepLocal
                } else {
                    Resolution::KeepRemote
                }
            }
            ConflictPolicy::Ask | ConflictPolicy::Skip => Resolution::Skip,
        })
    }
}

/// Format a timestamp in the local time zone as a short date and time
///
/// Uses chrono's locale-style date (`%x`) followed by the 24-hour time.
#[must_use]
pub fn format_timestamp(time: SystemTime) -> String {
    DateTime::<Local>::from(time).format("%x %R").to_string()
}

/// Asks the user about each conflict
///
/// Answers are `l` (local), `r` (remote) or `s` (skip). Anything else asks
/// again; end of input skips.
pub struct PromptResolver<R, W> {
    input: R,
    output: W,
    local_root: PathBuf,
    remote_root: PathBuf,
}

impl<R: BufRead, W: Write> PromptResolver<R, W> {
    /// Create a prompt reading answers from `input` and writing to `output`
    pub fn new(input: R, output: W, local_root: PathBuf, remote_root: PathBuf) -> Self {
        Self {
            input,
            output,
            local_root,
            remote_root,
        }
    }

    fn write_prompt(&mut self, conflict: &Conflict) -> std::io::Result<()> {
        let heading = match conflict.kind {
            ConflictKind::BothModified => "Conflict",
            ConflictKind::TypeMismatch => "Conflict (file vs directory)",
        };
        writeln!(self.output)?;
        writeln!(self.output, "{heading}:")?;
        writeln!(
            self.output,
            "\tLocal  '{}' modified {}",
            self.local_root.join(&conflict.relative_path).display(),
            format_timestamp(conflict.local_modified)
        )?;
        writeln!(
            self.output,
            "\tRemote '{}' modified {}",
            self.remote_root.join(&conflict.relative_path).display(),
            format_timestamp(conflict.remote_modified)
        )?;
        write!(self.output, "Take local changes, remote, or skip? (l/r/s) ")?;
        self.output.flush()
    }
}

impl<R: BufRead, W: Write> ConflictResolver for PromptResolver<R, W> {
    fn resolve(&mut self, conflict: &Conflict) -> Result<Resolution> {
        loop {
            self.write_prompt(conflict)
                .map_err(|e| SyncError::Prompt(format!("Failed to write prompt: {e}")))?;

            let mut answer = String::new();
            let read = self
                .input
                .read_line(&mut answer)
                .map_err(|e| SyncError::Prompt(format!("Failed to read answer: {e}")))?;
            if read == 0 {
                return Ok(Resolution::Skip);
            }

            match answer.trim().to_ascii_lowercase().as_str() {
                "l" | "local" => return Ok(Resolution::KeepLocal),
                "r" | "remote" => return Ok(Resolution::KeepRemote),
                "s" | "skip" => return Ok(Resolution::Skip),
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Cursor;
    use std::time::{Duration, UNIX_EPOCH};

    fn conflict(kind: ConflictKind, local_secs: u64, remote_secs: u64) -> Conflict {
        Conflict {
            relative_path: PathBuf::from("notes/todo.txt"),
            kind,
            local_modified: UNIX_EPOCH + Duration::from_secs(local_secs),
            remote_modified: UNIX_EPOCH + Duration::from_secs(remote_secs),
        }
    }

    #[rstest]
    #[case(ConflictPolicy::Local, 10, 20, Resolution::KeepLocal)]
    #[case(ConflictPolicy::Remote, 20, 10, Resolution::KeepRemote)]
    #[case(ConflictPolicy::Newer, 10, 20, Resolution::KeepRemote)]
    #[case(ConflictPolicy::Newer, 30, 20, Resolution::KeepLocal)]
    #[case(ConflictPolicy::Skip, 30, 20, Resolution::Skip)]
    fn test_policy_resolution(
        #[case] policy: ConflictPolicy,
        #[case] local: u64,
        #[case] remote: u64,
        #[case] expected: Resolution,
    ) -> anyhow::Result<()> {
        let mut resolver = PolicyResolver::new(policy);
        let decision = resolver.resolve(&conflict(ConflictKind::BothModified, local, remote))?;
        assert_eq!(decision, expected);
        Ok(())
    }

    #[test]
    fn test_format_timestamp_is_short_date_and_time() {
        let time = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let formatted = format_timestamp(time);
        let local = DateTime::<Local>::from(time);

        assert_eq!(formatted, local.format("%m/%d/%y %H:%M").to_string());
        assert_eq!(formatted.len(), "11/14/23 22:13".len());
    }

    #[test]
    fn test_newer_skips_type_mismatch() -> anyhow::Result<()> {
        let mut resolver = PolicyResolver::new(ConflictPolicy::Newer);
        let decision = resolver.resolve(&conflict(ConflictKind::TypeMismatch, 30, 20))?;
        assert_eq!(decision, Resolution::Skip);
        Ok(())
    }

    #[test]
    fn test_prompt_reasks_until_valid_answer() -> anyhow::Result<()> {
        let input = Cursor::new(b"maybe\nR\n".to_vec());
        let mut output = Vec::new();
        {
            let mut resolver = PromptResolver::new(
                input,
                &mut output,
                PathBuf::from("/home/me/docs"),
                PathBuf::from("/mnt/backup/docs"),
            );

            let decision = resolver.resolve(&conflict(ConflictKind::BothModified, 10, 20))?;
            assert_eq!(decision, Resolution::KeepRemote);
        }

        let printed = String::from_utf8(output)?;
        assert_eq!(printed.matches("(l/r/s)").count(), 2);
        assert!(printed.contains("/home/me/docs/notes/todo.txt"));
        assert!(printed.contains("/mnt/backup/docs/notes/todo.txt"));
        Ok(())
    }

    #[test]
    fn test_prompt_eof_skips() -> anyhow::Result<()> {
        let mut resolver = PromptResolver::new(
            Cursor::new(Vec::new()),
            std::io::sink(),
            PathBuf::from("/a"),
            PathBuf::from("/b"),
        );
        let decision = resolver.resolve(&conflict(ConflictKind::BothModified, 1, 2))?;
        assert_eq!(decision, Resolution::Skip);
        Ok(())
    }
}
