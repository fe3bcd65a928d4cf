//! winio component presenting a [`WindowModel`]

use super::messages::Message;
use crate::layout::Placement;
use crate::shell::{ApplicationShell, RunLoop, EXIT_SUCCESS};
use crate::window::WindowModel;
use winio::prelude::*;

/// Root component: one top-level window and its flow container
pub struct FileSyncApp {
    /// Main window
    window: Child<Window>,

    /// Description the window was built from
    model: WindowModel,

    /// Child placements from the last render
    placements: Vec<Placement>,
}

impl Component for FileSyncApp {
    type Event = (); // Root component outputs () to stop the application
    type Init<'a> = WindowModel;
    type Message = Message;

    fn init(model: Self::Init<'_>, _sender: &ComponentSender<Self>) -> Self {
        let size = model.size();
        init! {
            window: Window = (()) => {
                text: model.title(),
                size: Size::new(size.width, size.height),
            }
        }

        if model.is_visible() {
            window.show();
        }

        Self {
            window,
            model,
            placements: Vec::new(),
        }
    }

    async fn start(&mut self, sender: &ComponentSender<Self>) -> ! {
        start! {
            sender, default: Message::Noop,
            self.window => {
                WindowEvent::Close => Message::WindowClose,
            }
        }
    }

    async fn update_children(&mut self) -> bool {
        self.window.update().await
    }

    async fn update(&mut self, message: Self::Message, sender: &ComponentSender<Self>) -> bool {
        match message {
            Message::Noop => false,

            Message::WindowClose => {
                tracing::debug!("Window {:?} closed", self.model.id());
                sender.output(());
                false
            }
        }
    }

    fn render(&mut self, _sender: &ComponentSender<Self>) {
        // The flow container fills the client area
        let csize = self.window.client_size();
        self.placements = self.model.child().arrange(csize.width);
        tracing::trace!(
            "Arranged {} child(ren) in {}x{}",
            self.placements.len(),
            csize.width,
            csize.height
        );
    }

    fn render_children(&mut self) {}
}

/// Run loop backed by the winio event loop
///
/// Fires activation once and presents the first window it produced. Blocks
/// until that window is closed.
pub struct WinioRunLoop;

impl RunLoop for WinioRunLoop {
    fn run(&mut self, shell: &mut ApplicationShell) -> i32 {
        let created = shell.activate();
        let Some(model) = created
            .first()
            .and_then(|id| shell.context().window(*id))
            .cloned()
        else {
            tracing::warn!("Activation created no window");
            return EXIT_SUCCESS;
        };

        App::new(shell.context().application_id()).run::<FileSyncApp>(model);

        shell.context_mut().close_all();
        EXIT_SUCCESS
    }
}
