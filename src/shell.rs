//! Application shell
//!
//! Owns the application context and the table of activation handlers, and
//! hands control to a [`RunLoop`] that drives events until the last window
//! closes.
//!
//! The shell is passed explicitly to every handler; there is no global
//! application instance:
//!
//! ```rust
//! use filesync::shell::{ApplicationShell, HeadlessRunLoop, ShellEvent};
//! use filesync::window::build_main_window;
//!
//! let mut shell = ApplicationShell::new("io.github.filesync");
//! shell.connect_activate(build_main_window);
//!
//! let mut run_loop = HeadlessRunLoop::new([ShellEvent::CloseAll]);
//! assert_eq!(shell.run(&mut run_loop), 0);
//! ```

use crate::window::{WindowId, WindowModel};
use std::collections::{BTreeMap, VecDeque};
use tracing::{debug, info};

/// Exit status returned by a run loop on clean shutdown
pub const EXIT_SUCCESS: i32 = 0;

/// Application-wide state handed to activation handlers
#[derive(Debug)]
pub struct AppContext {
    application_id: String,
    windows: BTreeMap<WindowId, WindowModel>,
    next_id: u64,
}

impl AppContext {
    /// Create a context with no windows
    #[must_use]
    pub fn new(application_id: impl Into<String>) -> Self {
        Self {
            application_id: application_id.into(),
            windows: BTreeMap::new(),
            next_id: 0,
        }
    }

    /// Reverse-DNS application identifier
    #[must_use]
    pub fn application_id(&self) -> &str {
        &self.application_id
    }

    /// Allocate an id for a window about to be created
    pub(crate) fn next_window_id(&mut self) -> WindowId {
        let id = WindowId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Take ownership of a window
    pub fn add_window(&mut self, window: WindowModel) {
        self.windows.insert(window.id(), window);
    }

    /// Look up a window by id
    #[must_use]
    pub fn window(&self, id: WindowId) -> Option<&WindowModel> {
        self.windows.get(&id)
    }

    /// All open windows, in creation order
    pub fn windows(&self) -> impl Iterator<Item = &WindowModel> {
        self.windows.values()
    }

    /// Number of open windows
    #[must_use]
    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    /// Destroy a window; returns it if it was open
    pub fn close_window(&mut self, id: WindowId) -> Option<WindowModel> {
        self.windows.remove(&id)
    }

    /// Destroy every window
    pub fn close_all(&mut self) {
        self.windows.clear();
    }
}

/// Handler invoked on each activation event
pub type ActivationHandler = Box<dyn FnMut(&mut AppContext) -> WindowId>;

/// Process-level application object
pub struct ApplicationShell {
    context: AppContext,
    handlers: Vec<ActivationHandler>,
}

impl ApplicationShell {
    /// Create a shell with an empty handler table
    #[must_use]
    pub fn new(application_id: impl Into<String>) -> Self {
        Self {
            context: AppContext::new(application_id),
            handlers: Vec::new(),
        }
    }

    /// Register a handler for the activation event
    pub fn connect_activate<F>(&mut self, handler: F)
    where
        F: FnMut(&mut AppContext) -> WindowId + 'static,
    {
        self.handlers.push(Box::new(handler));
    }

    /// Number of registered activation handlers
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Deliver one activation event to every registered handler
    ///
    /// Returns the ids of the windows the handlers created.
    pub fn activate(&mut self) -> Vec<WindowId> {
        debug!(
            "Activating {} ({} handler(s))",
            self.context.application_id(),
            self.handlers.len()
        );
        let mut created = Vec::with_capacity(self.handlers.len());
        for handler in &mut self.handlers {
            created.push(handler(&mut self.context));
        }
        created
    }

    /// Shared access to the application context
    #[must_use]
    pub const fn context(&self) -> &AppContext {
        &self.context
    }

    /// Mutable access to the application context
    pub fn context_mut(&mut self) -> &mut AppContext {
        &mut self.context
    }

    /// Block in the given run loop until it finishes; returns its exit status
    pub fn run<R: RunLoop + ?Sized>(&mut self, run_loop: &mut R) -> i32 {
        info!("Starting {}", self.context.application_id());
        let status = run_loop.run(self);
        info!("Run loop exited with status {status}");
        status
    }
}

/// Drives an [`ApplicationShell`] until the application terminates
pub trait RunLoop {
    /// Fire activation, process events, and return the exit status
    fn run(&mut self, shell: &mut ApplicationShell) -> i32;
}

/// Events understood by [`HeadlessRunLoop`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellEvent {
    /// A further activation (e.g. the application launched a second time)
    Activate,
    /// The user closed one window
    CloseWindow(WindowId),
    /// The user closed every window
    CloseAll,
    /// Explicit quit request
    Quit,
}

/// Run loop without a display server
///
/// Fires one activation, then replays a fixed queue of events. Exits when no
/// window remains, on [`ShellEvent::Quit`], or when the queue runs dry.
#[derive(Debug, Default)]
pub struct HeadlessRunLoop {
    events: VecDeque<ShellEvent>,
    processed: usize,
}

impl HeadlessRunLoop {
    /// Create a run loop that will replay `events` after activation
    #[must_use]
    pub fn new(events: impl IntoIterator<Item = ShellEvent>) -> Self {
        Self {
            events: events.into_iter().collect(),
            processed: 0,
        }
    }

    /// Number of events handled during the last run
    #[must_use]
    pub const fn processed(&self) -> usize {
        self.processed
    }
}

impl RunLoop for HeadlessRunLoop {
    fn run(&mut self, shell: &mut ApplicationShell) -> i32 {
        shell.activate();

        while let Some(event) = self.events.pop_front() {
            self.processed += 1;
            debug!("Headless event: {:?}", event);

            match event {
                ShellEvent::Activate => {
                    shell.activate();
                }
                ShellEvent::CloseWindow(id) => {
                    shell.context_mut().close_window(id);
                }
                ShellEvent::CloseAll => shell.context_mut().close_all(),
                ShellEvent::Quit => return EXIT_SUCCESS,
            }

            if shell.context().window_count() == 0 {
                return EXIT_SUCCESS;
            }
        }

        EXIT_SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::build_main_window;

    fn shell() -> ApplicationShell {
        let mut shell = ApplicationShell::new("test.filesync");
        shell.connect_activate(build_main_window);
        shell
    }

    #[test]
    fn test_activation_runs_registered_handler() {
        let mut shell = shell();
        let created = shell.activate();

        assert_eq!(shell.handler_count(), 1);
        assert_eq!(created.len(), 1);
        assert_eq!(shell.context().window_count(), 1);
    }

    #[test]
    fn test_closing_last_window_ends_run_loop() {
        let mut shell = shell();
        // First window created by the shell gets id 0
        let mut run_loop = HeadlessRunLoop::new([
            ShellEvent::CloseWindow(WindowId(0)),
            ShellEvent::Activate,
        ]);

        assert_eq!(shell.run(&mut run_loop), EXIT_SUCCESS);
        assert_eq!(run_loop.processed(), 1);
        assert_eq!(shell.context().window_count(), 0);
    }

    #[test]
    fn test_run_loop_keeps_going_while_windows_remain() {
        let mut shell = shell();
        let mut run_loop = HeadlessRunLoop::new([
            ShellEvent::Activate,
            ShellEvent::CloseWindow(WindowId(0)),
            ShellEvent::Quit,
        ]);

        assert_eq!(shell.run(&mut run_loop), EXIT_SUCCESS);
        assert_eq!(run_loop.processed(), 3);
        assert!(shell.context().window(WindowId(1)).is_some());
    }
}
