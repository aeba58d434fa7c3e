use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window, WindowId};

use crate::APP_NAME;
use crate::error::{VrError, VrResult};

const DEFAULT_SIZE: PhysicalSize<u32> = PhysicalSize { width: 960, height: 540 };

// Desktop window showing what the HMD shows, also the source of keyboard
// input. Events are pumped once per frame instead of handing the thread over
// to winit.
pub struct MirrorWindow {
    event_loop: EventLoop<()>,
    app: App,
}

struct App {
    window_opt: Option<Arc<Window>>,
    keys: HashSet<KeyCode>,
    closed: bool,
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window_opt.is_none() {
            let window_attrs = Window::default_attributes()
                .with_title(APP_NAME)
                .with_inner_size(DEFAULT_SIZE);

            match event_loop.create_window(window_attrs) {
                Ok(window) => self.window_opt = Some(Arc::new(window)),
                Err(e) => {
                    warn!("Unable to create window: {}", e);
                    event_loop.exit();
                },
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if !event.repeat {
                    let pressed = match event.state {
                        ElementState::Pressed => true,
                        ElementState::Released => false,
                    };

                    if let PhysicalKey::Code(key) = event.physical_key {
                        if pressed {
                            self.keys.insert(key);
                        } else {
                            self.keys.remove(&key);
                        }
                    }
                }
            },
            WindowEvent::Focused(false) => {
                self.keys.clear(); // Key releases are not delivered while unfocused.
            },
            WindowEvent::CloseRequested => {
                info!("Window closed");
                self.closed = true;
                event_loop.exit();
            },
            _ => (),
        }
    }
}

impl MirrorWindow {
    pub fn new() -> VrResult<Self> {
        let event_loop = EventLoop::new().map_err(|e| VrError::Window(e.to_string()))?;

        let mut window = Self {
            event_loop,
            app: App {
                window_opt: None,
                keys: HashSet::new(),
                closed: false,
            },
        };

        window.handle_messages(); // Deliver the first resumed event, so the window exists.

        if window.app.window_opt.is_none() {
            return Err(VrError::Window(String::from("Unable to create window")));
        }

        Ok(window)
    }

    // Pumps pending window events, false once the window has been closed.
    pub fn handle_messages(&mut self) -> bool {
        if !self.app.closed {
            let status = self.event_loop.pump_app_events(Some(Duration::ZERO), &mut self.app);

            if let PumpStatus::Exit(_) = status {
                self.app.closed = true;
            }
        }

        !self.app.closed
    }

    pub fn get_window(&self) -> Option<Arc<Window>> {
        self.app.window_opt.clone()
    }

    pub fn get_keys(&self) -> &HashSet<KeyCode> {
        &self.app.keys
    }

    pub fn set_size(&self, width: u32, height: u32) {
        if let Some(window) = &self.app.window_opt {
            let _ = window.request_inner_size(PhysicalSize::new(width.max(1), height.max(1)));
        }
    }
}
