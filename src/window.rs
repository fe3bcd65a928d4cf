//! Window factory
//!
//! The activation handler that builds the main "File Synchronizer" window:
//! fixed title and size, one empty flow-layout container as its only child.

use crate::layout::{Extent, FlowLayout};
use crate::shell::AppContext;

/// Title of the main window
pub const WINDOW_TITLE: &str = "File Synchronizer";

/// Requested width of the main window, in logical pixels
pub const WINDOW_WIDTH: f64 = 500.0;

/// Requested height of the main window, in logical pixels
pub const WINDOW_HEIGHT: f64 = 400.0;

/// Identifier of a window owned by an [`AppContext`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub(crate) u64);

/// Description of a top-level window
///
/// The window owns exactly one root child container.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowModel {
    id: WindowId,
    title: String,
    size: Extent,
    child: FlowLayout,
    visible: bool,
}

impl WindowModel {
    /// Create a hidden window with an empty root container
    #[must_use]
    pub fn new(id: WindowId, title: impl Into<String>, size: Extent) -> Self {
        Self {
            id,
            title: title.into(),
            size,
            child: FlowLayout::new(),
            visible: false,
        }
    }

    /// Window identifier
    #[must_use]
    pub const fn id(&self) -> WindowId {
        self.id
    }

    /// Display title
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Requested size
    #[must_use]
    pub const fn size(&self) -> Extent {
        self.size
    }

    /// The root child container
    #[must_use]
    pub const fn child(&self) -> &FlowLayout {
        &self.child
    }

    /// Replace the root child container
    pub fn set_child(&mut self, child: FlowLayout) {
        self.child = child;
    }

    /// Whether the window has been presented
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.visible
    }

    /// Make the window visible
    pub fn present(&mut self) {
        self.visible = true;
    }
}

/// Activation handler: build and present the main window
///
/// Every call creates a new window; there is no check for an existing one.
pub fn build_main_window(ctx: &mut AppContext) -> WindowId {
    let id = ctx.next_window_id();
    let mut window = WindowModel::new(id, WINDOW_TITLE, Extent::new(WINDOW_WIDTH, WINDOW_HEIGHT));
    window.set_child(FlowLayout::new());
    window.present();

    tracing::debug!("Presented window {:?} ({})", id, window.title());
    ctx.add_window(window);
    id
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_main_window_properties() {
        let mut ctx = AppContext::new("test.filesync");
        let id = build_main_window(&mut ctx);
        let window = ctx.window(id).unwrap();

        assert_eq!(window.title(), "File Synchronizer");
        assert_eq!(window.size(), Extent::new(500.0, 400.0));
        assert!(window.child().is_empty());
        assert!(window.is_visible());
    }

    #[test]
    fn test_each_call_creates_new_window() {
        let mut ctx = AppContext::new("test.filesync");
        let first = build_main_window(&mut ctx);
        let second = build_main_window(&mut ctx);

        assert_ne!(first, second);
        assert_eq!(ctx.window_count(), 2);
    }
}
