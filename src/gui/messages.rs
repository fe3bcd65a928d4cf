//! Message types for GUI event handling

/// Messages handled by the main application component
#[derive(Debug, Clone)]
pub enum Message {
    /// No-op message (default for unhandled events)
    Noop,

    /// User requested to close the window
    WindowClose,
}
