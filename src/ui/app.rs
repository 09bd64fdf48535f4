use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use super::window::{WindowState, WINDOW_HEIGHT, WINDOW_WIDTH};
use crate::assistant::{DisplayState, StopReason};
use crate::canvas::Canvas;
use crate::config::KeyboardShortcuts;
use crate::render_loop::{FrameHandle, FrameScheduler};
use crate::scene::{self, Scene};
use crate::session::Visualizer;

/// Frame scheduling on top of the window's redraw cycle
///
/// `schedule` requests a redraw and hands out a handle; a redraw only runs
/// the render loop when its handle is still pending, so `cancel` reliably
/// suppresses the next frame callback.
pub struct RedrawScheduler {
    window: Option<Arc<Window>>,
    next_handle: FrameHandle,
    pending: Option<FrameHandle>,
}

impl RedrawScheduler {
    pub fn new() -> Self {
        Self {
            window: None,
            next_handle: 0,
            pending: None,
        }
    }

    pub fn attach(&mut self, window: Arc<Window>) {
        self.window = Some(window);
    }

    /// Consumes the pending handle; false means the frame was cancelled
    pub fn take_due(&mut self) -> bool {
        self.pending.take().is_some()
    }
}

impl Default for RedrawScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameScheduler for RedrawScheduler {
    fn schedule(&mut self) -> FrameHandle {
        self.next_handle += 1;
        self.pending = Some(self.next_handle);
        if let Some(window) = &self.window {
            window.request_redraw();
        }
        self.next_handle
    }

    fn cancel(&mut self, handle: FrameHandle) {
        if self.pending == Some(handle) {
            self.pending = None;
        }
    }
}

/// Shared state the UI needs in assistant mode; all absent in visualizer mode
#[derive(Default)]
pub struct UiHandles {
    pub display: Option<Arc<RwLock<DisplayState>>>,
    pub recording: Option<Arc<AtomicBool>>,
    pub stop_tx: Option<mpsc::Sender<StopReason>>,
}

struct App {
    visualizer: Visualizer,
    scene: Scene,
    scheduler: RedrawScheduler,
    handles: UiHandles,
    running: Arc<AtomicBool>,
    toggle_key: KeyCode,
    exit_key: KeyCode,
    expected_draws: usize,
    state: Option<WindowState>,
    fatal: Option<anyhow::Error>,
}

impl App {
    fn redraw(&mut self) {
        let Some(state) = self.state.as_mut() else {
            return;
        };

        if !self.scheduler.take_due() {
            // Not a scheduled frame. Re-present the last batch for OS-driven
            // redraws; show the bare background once the session is stopped.
            if !self.visualizer.is_active() {
                state.canvas.clear();
            }
            if let Err(e) = state.present() {
                log::warn!("Failed to present frame: {:?}", e);
            }
            return;
        }

        if let Some(display) = &self.handles.display {
            self.scene.tint = scene::state_color(*display.read());
        }

        self.visualizer
            .frame(&mut self.scheduler, &mut state.canvas, &self.scene);

        if let Err(e) = state.present() {
            log::warn!("Failed to present frame: {:?}", e);
        }
    }

    fn handle_key(&mut self, code: KeyCode, event_loop: &ActiveEventLoop) {
        if code == self.exit_key {
            self.shutdown(event_loop);
            return;
        }
        if code != self.toggle_key {
            return;
        }

        if let Some(stop_tx) = &self.handles.stop_tx {
            // Assistant mode: end the current recording
            let is_recording = self
                .handles
                .recording
                .as_ref()
                .map(|r| r.load(Ordering::Relaxed))
                .unwrap_or(false);
            if is_recording {
                if let Err(e) = stop_tx.try_send(StopReason::Manual) {
                    log::debug!("Could not deliver manual stop: {}", e);
                }
            }
        } else {
            // Visualizer mode: toggle the capture session
            if self.visualizer.is_active() {
                self.visualizer.stop(&mut self.scheduler);
                if let Some(state) = &self.state {
                    // one last redraw to clear the surface
                    state.window.request_redraw();
                }
            } else {
                match self.visualizer.start() {
                    Ok(()) => {
                        self.scheduler.schedule();
                    }
                    Err(e) => log::error!("{}", e),
                }
            }
        }
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        self.visualizer.stop(&mut self.scheduler);
        self.running.store(false, Ordering::Relaxed);
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        let attrs = Window::default_attributes()
            .with_title("parlo")
            .with_inner_size(LogicalSize::new(WINDOW_WIDTH, WINDOW_HEIGHT));

        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                self.fatal = Some(anyhow::Error::new(e));
                event_loop.exit();
                return;
            }
        };

        let state = WindowState::new(window.clone(), self.expected_draws);
        self.scheduler.attach(window);

        if let Err(e) = self.visualizer.start() {
            self.fatal = Some(anyhow::Error::new(e));
            event_loop.exit();
            return;
        }

        // First frame; every later one schedules its own successor
        self.scheduler.schedule();
        self.state = Some(state);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                self.shutdown(event_loop);
            }
            WindowEvent::Resized(size) => {
                if let Some(state) = self.state.as_mut() {
                    state.resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => {
                self.redraw();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                self.handle_key(code, event_loop);
            }
            _ => {}
        }
    }
}

/// Runs the window loop until exit; blocks the calling thread
pub fn run(
    visualizer: Visualizer,
    scene: Scene,
    shortcuts: &KeyboardShortcuts,
    running: Arc<AtomicBool>,
    handles: UiHandles,
    expected_draws: usize,
) -> anyhow::Result<()> {
    let toggle_key = shortcuts
        .to_key_code(&shortcuts.toggle_recording)
        .unwrap_or(KeyCode::Space);
    let exit_key = shortcuts
        .to_key_code(&shortcuts.exit_application)
        .unwrap_or(KeyCode::Escape);

    let event_loop = EventLoop::new()?;
    let mut app = App {
        visualizer,
        scene,
        scheduler: RedrawScheduler::new(),
        handles,
        running,
        toggle_key,
        exit_key,
        expected_draws,
        state: None,
        fatal: None,
    };

    event_loop.run_app(&mut app)?;

    match app.fatal {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
