//! Window host.
//!
//! [`run_deck`] opens a window, picks a quality tier, creates the [`Engine`]
//! and drives one frame per redraw until the user exits or closes the
//! window. If no GPU context can be created the window stays open as a
//! fallback screen whose only action is exit.

use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use crate::capability::DeviceHints;
use crate::deck::Deck;
use crate::engine::{Engine, EngineOptions};
use crate::error::{EngineError, GpuError};
use crate::gpu::GpuState;
use crate::input::DeckInput;
use crate::playback::{DeckCommand, HostRequest};
use crate::time::FrameClock;

/// Title shown when rendering could not start.
pub const FALLBACK_TITLE: &str = "rendering unavailable \u{2014} press Esc to exit";

/// How a deck run ended.
#[derive(Debug)]
pub enum DeckExit {
    /// The user asked to leave (`Esc`).
    UserExit,
    /// The window was closed.
    WindowClosed,
    /// No rendering context; the fallback screen was shown until exit.
    Unavailable(GpuError),
}

/// Present `deck` in a window. Blocks until the run ends.
///
/// The deck is validated first. Window or event-loop failures are errors;
/// a missing GPU is not, it is reported as [`DeckExit::Unavailable`].
pub fn run_deck(deck: Deck, options: EngineOptions) -> Result<DeckExit, EngineError> {
    deck.validate()?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = DeckApp::new(Arc::new(deck), options);
    event_loop.run_app(&mut app)?;

    if let Some(err) = app.failure.take() {
        return Err(err);
    }
    Ok(app.outcome.take().unwrap_or(DeckExit::WindowClosed))
}

struct DeckApp {
    deck: Arc<Deck>,
    options: EngineOptions,
    window: Option<Arc<Window>>,
    engine: Option<Engine>,
    gpu_state: Option<GpuState>,
    /// Set when the fallback screen is up.
    unavailable: Option<GpuError>,
    input: DeckInput,
    clock: FrameClock,
    title: String,
    outcome: Option<DeckExit>,
    failure: Option<EngineError>,
}

impl DeckApp {
    fn new(deck: Arc<Deck>, options: EngineOptions) -> Self {
        Self {
            deck,
            options,
            window: None,
            engine: None,
            gpu_state: None,
            unavailable: None,
            input: DeckInput::new(),
            clock: FrameClock::new(),
            title: String::new(),
            outcome: None,
            failure: None,
        }
    }

    fn start(&mut self, window: Arc<Window>) -> Result<(), EngineError> {
        let hints = DeviceHints::probe(Some(&window));
        let mut options = self.options;
        options.reduced_motion |= hints.reduced_motion;
        let tier = options.resolve_tier(&hints);
        log::info!("device hints {:?}, tier {}", hints, tier);

        let engine = Engine::create(Arc::clone(&self.deck), tier, options)?;
        match pollster::block_on(GpuState::new(Arc::clone(&window), &engine)) {
            Ok(gpu_state) => {
                self.gpu_state = Some(gpu_state);
                self.engine = Some(engine);
                self.clock.reset();
            }
            Err(err) => {
                log::error!("rendering unavailable: {}", err);
                engine.destroy();
                window.set_title(FALLBACK_TITLE);
                self.unavailable = Some(err);
            }
        }
        self.options = options;
        self.window = Some(window);
        Ok(())
    }

    fn finish(&mut self, event_loop: &ActiveEventLoop, outcome: DeckExit) {
        let outcome = match self.unavailable.take() {
            Some(err) => DeckExit::Unavailable(err),
            None => outcome,
        };
        if let Some(engine) = self.engine.take() {
            log::info!(
                "{} frames rendered in {:.1?}",
                self.clock.frame(),
                self.clock.elapsed()
            );
            engine.destroy();
        }
        self.gpu_state = None;
        self.outcome = Some(outcome);
        event_loop.exit();
    }

    fn command(&mut self, event_loop: &ActiveEventLoop, command: DeckCommand) {
        let request = match &mut self.engine {
            Some(engine) => engine.handle(command),
            // fallback screen: exit is the only action
            None if command == DeckCommand::Exit => Some(HostRequest::Exit),
            None => None,
        };
        if request == Some(HostRequest::Exit) {
            self.finish(event_loop, DeckExit::UserExit);
        }
    }

    fn rescale(&mut self, scale_factor: f64) {
        let (Some(window), Some(engine), Some(gpu_state)) =
            (&self.window, &mut self.engine, &mut self.gpu_state)
        else {
            return;
        };
        gpu_state.set_scale_factor(scale_factor as f32);
        let hints = DeviceHints::probe(Some(window));
        let tier = self.options.resolve_tier(&hints);
        if engine.resize(tier) {
            gpu_state.sync_tier(engine);
        }
    }

    fn frame(&mut self, event_loop: &ActiveEventLoop) {
        let (Some(window), Some(engine), Some(gpu_state)) =
            (&self.window, &mut self.engine, &mut self.gpu_state)
        else {
            return;
        };

        let raw_dt = self.clock.tick();
        engine.advance(raw_dt);

        match gpu_state.render(engine) {
            Ok(_) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("surface lost, reconfiguring");
                gpu_state.reconfigure();
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("GPU out of memory");
                self.finish(event_loop, DeckExit::WindowClosed);
                return;
            }
            Err(e) => log::warn!("render error: {:?}", e),
        }

        engine.sample_performance(raw_dt);

        let title = if engine.playback().hud_visible() {
            engine.status_line()
        } else {
            engine.variant().name.clone()
        };
        if title != self.title {
            window.set_title(&title);
            self.title = title;
        }

        window.request_redraw();
    }
}

impl ApplicationHandler for DeckApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let window_attrs = Window::default_attributes()
            .with_title(self.deck.variant.name.clone())
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));

        let started = event_loop
            .create_window(window_attrs)
            .map_err(EngineError::from)
            .and_then(|window| self.start(Arc::new(window)));
        if let Err(err) = started {
            log::error!("{}", err);
            self.failure = Some(err);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                self.finish(event_loop, DeckExit::WindowClosed);
            }
            WindowEvent::Resized(physical_size) => {
                if let Some(gpu_state) = &mut self.gpu_state {
                    gpu_state.resize(physical_size);
                }
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                self.rescale(scale_factor);
            }
            WindowEvent::RedrawRequested => {
                self.frame(event_loop);
            }
            other => {
                if let Some(command) = self.input.handle_event(&other) {
                    self.command(event_loop, command);
                }
            }
        }
    }
}
