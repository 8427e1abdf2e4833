use std::mem;
use std::sync::Arc;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{debug, info, warn};
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, MouseButton, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::window::{Fullscreen, WindowBuilder};

use super::{InputEvent, PointerButton, Renderer, ScreenMode, Size, Vec2, World, WorldError};

pub const DEFAULT_TARGET_TPS: u32 = 30;

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub mode: ScreenMode,
    /// Window decorations. Ignored by the fullscreen modes.
    pub border: bool,
    pub hardware_acceleration: bool,
    /// Present with vsync.
    pub double_buffer: bool,
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "questy".to_string(),
            mode: ScreenMode::default(),
            border: true,
            hardware_acceleration: true,
            double_buffer: true,
            target_tps: DEFAULT_TARGET_TPS,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 3,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("failed to set up the screen: {0}")]
    Screen(#[from] WorldError),
    #[error("failed to present a frame: {0}")]
    Render(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

/// Opens the window for `world` and ticks it at `config.target_tps` until
/// the world quits or the window goes away.
pub fn run_world(world: &mut World, config: &LoopConfig) -> Result<(), AppError> {
    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let display = event_loop
        .primary_monitor()
        .map(|monitor| Size::new(monitor.size().width, monitor.size().height));
    let viewport = world.create_screen(config.mode, display)?;

    let style = WindowStyle::for_mode(config.mode, config.border);
    let mut builder = WindowBuilder::new()
        .with_title(config.window_title.clone())
        .with_inner_size(PhysicalSize::new(
            viewport.real_size.width,
            viewport.real_size.height,
        ))
        .with_resizable(false)
        .with_decorations(style.decorations);
    if style.fullscreen {
        builder = builder.with_fullscreen(Some(Fullscreen::Borderless(None)));
    }
    if style.pinned_to_origin {
        builder = builder.with_position(PhysicalPosition::new(0, 0));
    }
    let window = Arc::new(builder.build(&event_loop).map_err(AppError::CreateWindow)?);
    let mut renderer =
        Renderer::new(Arc::clone(&window), viewport, config).map_err(AppError::CreateRenderer)?;

    let target_tps = config.target_tps.max(1);
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let max_frame_delta = if config.max_frame_delta.is_zero() {
        Duration::from_millis(250)
    } else {
        config.max_frame_delta
    };
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    info!(
        target_tps,
        max_ticks_per_frame,
        mode = ?config.mode,
        "loop_config"
    );

    let mut input = InputCollector::default();
    let mut accumulator = fixed_dt;
    let mut last_frame_instant = Instant::now();
    let mut next_deadline = last_frame_instant;
    let mut render_failure = None;

    event_loop
        .run(|event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => input.push(InputEvent::CloseRequested),
                WindowEvent::Resized(size) => {
                    if let Err(error) = renderer.resize_surface(size.width, size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                    }
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    input.handle_key(event.physical_key, event.state, event.repeat);
                }
                WindowEvent::CursorMoved { position, .. } => {
                    let buffer = renderer.window_to_buffer(position.x as f32, position.y as f32);
                    input.handle_cursor_moved(buffer);
                }
                WindowEvent::CursorLeft { .. } => input.clear_cursor(),
                WindowEvent::MouseInput { button, state, .. } => {
                    input.handle_mouse_input(button, state);
                }
                WindowEvent::RedrawRequested => {
                    let now = Instant::now();
                    let frame_dt = now
                        .saturating_duration_since(last_frame_instant)
                        .min(max_frame_delta);
                    last_frame_instant = now;
                    accumulator = accumulator.saturating_add(frame_dt);

                    let plan = plan_ticks(accumulator, fixed_dt, max_ticks_per_frame);
                    accumulator = plan.remaining_accumulator;
                    if plan.dropped_backlog > Duration::ZERO {
                        debug!(
                            dropped_backlog_ms = plan.dropped_backlog.as_millis() as u64,
                            "tick_backlog_dropped"
                        );
                    }
                    if plan.ticks_to_run == 0 {
                        return;
                    }

                    let events = input.drain();
                    let result = renderer.render_with(|canvas| {
                        for tick in 0..plan.ticks_to_run {
                            let batch: &[InputEvent] = if tick == 0 { &events } else { &[] };
                            world.tick(batch, now, canvas);
                        }
                    });
                    if let Err(error) = result {
                        warn!(error = %error, "renderer_draw_failed");
                        render_failure = Some(error);
                        window_target.exit();
                    }
                    next_deadline = now + fixed_dt.saturating_sub(accumulator);
                }
                _ => {}
            },
            Event::AboutToWait => {
                if world.is_quitting() {
                    window_target.exit();
                    return;
                }
                if Instant::now() >= next_deadline {
                    window.request_redraw();
                }
                window_target.set_control_flow(ControlFlow::WaitUntil(next_deadline));
            }
            Event::LoopExiting => {
                info!(ticks = world.tick_count(), "shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)?;

    match render_failure {
        Some(error) => Err(AppError::Render(error)),
        None => Ok(()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct WindowStyle {
    decorations: bool,
    fullscreen: bool,
    pinned_to_origin: bool,
}

impl WindowStyle {
    fn for_mode(mode: ScreenMode, border: bool) -> Self {
        match mode {
            ScreenMode::Fullscreen => Self {
                decorations: false,
                fullscreen: true,
                pinned_to_origin: false,
            },
            ScreenMode::FakeFullscreen => Self {
                decorations: false,
                fullscreen: false,
                pinned_to_origin: true,
            },
            ScreenMode::Exact { .. } | ScreenMode::Manual(_) => Self {
                decorations: border,
                fullscreen: false,
                pinned_to_origin: false,
            },
        }
    }
}

/// Translates window events into [`InputEvent`]s queued for the next tick.
/// Pointer positions are frame-buffer pixels.
#[derive(Debug, Default)]
struct InputCollector {
    events: Vec<InputEvent>,
    cursor: Option<Vec2>,
}

impl InputCollector {
    fn push(&mut self, event: InputEvent) {
        self.events.push(event);
    }

    fn handle_key(&mut self, key: PhysicalKey, state: ElementState, repeat: bool) {
        let PhysicalKey::Code(code) = key else {
            return;
        };
        match state {
            ElementState::Pressed if !repeat => self.push(InputEvent::KeyDown(code)),
            ElementState::Pressed => {}
            ElementState::Released => self.push(InputEvent::KeyUp(code)),
        }
    }

    fn handle_cursor_moved(&mut self, position: Vec2) {
        self.cursor = Some(position);
        self.push(InputEvent::PointerMoved { position });
    }

    fn clear_cursor(&mut self) {
        self.cursor = None;
    }

    fn handle_mouse_input(&mut self, button: MouseButton, state: ElementState) {
        let Some(position) = self.cursor else {
            return;
        };
        let button = pointer_button(button);
        self.push(match state {
            ElementState::Pressed => InputEvent::PointerDown { button, position },
            ElementState::Released => InputEvent::PointerUp { button, position },
        });
    }

    fn drain(&mut self) -> Vec<InputEvent> {
        mem::take(&mut self.events)
    }
}

fn pointer_button(button: MouseButton) -> PointerButton {
    match button {
        MouseButton::Left => PointerButton::Left,
        MouseButton::Right => PointerButton::Right,
        MouseButton::Middle => PointerButton::Middle,
        MouseButton::Back => PointerButton::Other(3),
        MouseButton::Forward => PointerButton::Other(4),
        MouseButton::Other(code) => PointerButton::Other(code),
    }
}

#[derive(Debug, Clone, Copy)]
struct TickPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_ticks(mut accumulator: Duration, fixed_dt: Duration, max_ticks_per_frame: u32) -> TickPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    if accumulator >= fixed_dt {
        TickPlan {
            ticks_to_run,
            remaining_accumulator: Duration::ZERO,
            dropped_backlog: accumulator,
        }
    } else {
        TickPlan {
            ticks_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use winit::keyboard::KeyCode;

    use super::*;

    const TICK: Duration = Duration::from_nanos(33_333_333);

    #[test]
    fn plan_ticks_runs_one_tick_per_interval() {
        let result = plan_ticks(TICK * 2, TICK, 3);

        assert_eq!(result.ticks_to_run, 2);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::ZERO);
    }

    #[test]
    fn plan_ticks_waits_until_interval_elapses() {
        let result = plan_ticks(Duration::from_millis(20), TICK, 3);

        assert_eq!(result.ticks_to_run, 0);
        assert_eq!(result.remaining_accumulator, Duration::from_millis(20));
    }

    #[test]
    fn plan_ticks_drops_backlog_when_tick_cap_hit() {
        let fixed_dt = Duration::from_millis(30);
        let result = plan_ticks(Duration::from_millis(150), fixed_dt, 3);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::from_millis(60));
    }

    #[test]
    fn key_repeat_is_not_a_new_press() {
        let mut input = InputCollector::default();
        let key = PhysicalKey::Code(KeyCode::ArrowLeft);
        input.handle_key(key, ElementState::Pressed, false);
        input.handle_key(key, ElementState::Pressed, true);
        input.handle_key(key, ElementState::Released, false);

        assert_eq!(
            input.drain(),
            vec![
                InputEvent::KeyDown(KeyCode::ArrowLeft),
                InputEvent::KeyUp(KeyCode::ArrowLeft),
            ]
        );
        assert!(input.drain().is_empty());
    }

    #[test]
    fn clicks_carry_last_cursor_position() {
        let mut input = InputCollector::default();
        input.handle_mouse_input(MouseButton::Left, ElementState::Pressed);
        assert!(input.drain().is_empty());

        input.handle_cursor_moved(Vec2::new(12.0, 7.0));
        input.handle_mouse_input(MouseButton::Right, ElementState::Pressed);
        input.handle_mouse_input(MouseButton::Right, ElementState::Released);

        assert_eq!(
            input.drain(),
            vec![
                InputEvent::PointerMoved {
                    position: Vec2::new(12.0, 7.0)
                },
                InputEvent::PointerDown {
                    button: PointerButton::Right,
                    position: Vec2::new(12.0, 7.0)
                },
                InputEvent::PointerUp {
                    button: PointerButton::Right,
                    position: Vec2::new(12.0, 7.0)
                },
            ]
        );

        input.clear_cursor();
        input.handle_mouse_input(MouseButton::Left, ElementState::Pressed);
        assert!(input.drain().is_empty());
    }

    #[test]
    fn window_style_follows_screen_mode() {
        assert_eq!(
            WindowStyle::for_mode(ScreenMode::Fullscreen, true),
            WindowStyle {
                decorations: false,
                fullscreen: true,
                pinned_to_origin: false
            }
        );
        assert_eq!(
            WindowStyle::for_mode(ScreenMode::FakeFullscreen, true),
            WindowStyle {
                decorations: false,
                fullscreen: false,
                pinned_to_origin: true
            }
        );
        assert!(!WindowStyle::for_mode(ScreenMode::Exact { zoom: 2.0 }, false).decorations);
        assert!(WindowStyle::for_mode(ScreenMode::Manual(Size::new(640, 400)), true).decorations);
    }

    #[test]
    fn default_loop_runs_at_thirty_ticks() {
        let config = LoopConfig::default();
        assert_eq!(config.target_tps, 30);
        assert!(config.border);
        assert_eq!(config.mode, ScreenMode::Exact { zoom: 1.0 });
    }
}
