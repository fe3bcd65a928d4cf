//! filesync: two-way directory synchronizer with a desktop window frontend
//!
//! The library is split into the window/shell layer used by the
//! `filesync-gui` binary and the synchronization engine used by `filesync`.

pub mod cli;
pub mod conflict;
pub mod error;
pub mod exclude;
pub mod layout;
pub mod shell;
pub mod stats;
pub mod sync_root;
pub mod synchronizer;
pub mod tree_ops;
pub mod window;

#[cfg(feature = "gui")]
pub mod gui;

pub use error::{Result, SyncError};
pub use synchronizer::{SyncOptions, SyncReport, Synchronizer};
