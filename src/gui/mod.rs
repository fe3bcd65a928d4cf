//! GUI module for filesync
//!
//! Presents the shell's window models using winio.

pub mod app;
pub mod messages;

// Re-export main types
pub use app::{FileSyncApp, WinioRunLoop};
pub use messages::Message;
