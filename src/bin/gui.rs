//! GUI frontend for filesync using winio
//!
//! Opens the "File Synchronizer" window and runs until it is closed. Pass
//! `--headless` to run activation without a display server.

use filesync::gui::WinioRunLoop;
use filesync::shell::{ApplicationShell, HeadlessRunLoop, RunLoop, ShellEvent};
use filesync::window::build_main_window;
use std::process::ExitCode;

/// Application identifier handed to the toolkit
const APP_ID: &str = "io.github.filesync";

fn main() -> ExitCode {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let headless = std::env::args().skip(1).any(|arg| arg == "--headless");

    let mut shell = ApplicationShell::new(APP_ID);
    shell.connect_activate(build_main_window);

    let mut run_loop: Box<dyn RunLoop> = if headless {
        Box::new(HeadlessRunLoop::new([ShellEvent::CloseAll]))
    } else {
        Box::new(WinioRunLoop)
    };

    let status = shell.run(run_loop.as_mut());
    ExitCode::from(u8::try_from(status).unwrap_or(1))
}
