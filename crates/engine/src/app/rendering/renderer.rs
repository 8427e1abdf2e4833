use std::sync::Arc;

use pixels::wgpu::{PowerPreference, RequestAdapterOptions};
use pixels::{Error, Pixels, PixelsBuilder, SurfaceTexture, TextureError};
use tracing::debug;
use winit::window::Window;

use crate::app::{LoopConfig, Vec2};

use super::{Canvas, Viewport};

/// Owns the window surface. The frame buffer always has the viewport's real
/// size; the world draws into it through a [`Canvas`].
pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    viewport: Viewport,
}

impl Renderer {
    pub fn new(window: Arc<Window>, viewport: Viewport, config: &LoopConfig) -> Result<Self, Error> {
        let surface_size = window.inner_size();
        let pixels = build_pixels(Arc::clone(&window), surface_size, viewport, config)?;
        debug!(
            buffer_width = viewport.real_size.width,
            buffer_height = viewport.real_size.height,
            surface_width = surface_size.width,
            surface_height = surface_size.height,
            vsync = config.double_buffer,
            hardware_acceleration = config.hardware_acceleration,
            "renderer_ready"
        );
        Ok(Self {
            window,
            pixels,
            viewport,
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn resize_surface(&mut self, width: u32, height: u32) -> Result<(), TextureError> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels.resize_surface(width, height)
    }

    /// Maps a window position to a frame-buffer pixel, clamping positions
    /// that fall outside the buffer.
    pub fn window_to_buffer(&self, x: f32, y: f32) -> Vec2 {
        match self.pixels.window_pos_to_pixel((x, y)) {
            Ok((px, py)) => Vec2::new(px as f32, py as f32),
            Err((px, py)) => {
                let clamped = self.pixels.clamp_pixel_pos((px, py));
                Vec2::new(clamped.0 as f32, clamped.1 as f32)
            }
        }
    }

    pub fn render_with(&mut self, draw: impl FnOnce(&mut Canvas<'_>)) -> Result<(), Error> {
        let width = self.viewport.real_size.width;
        let height = self.viewport.real_size.height;
        {
            let mut canvas = Canvas::new(self.pixels.frame_mut(), width, height, self.viewport);
            draw(&mut canvas);
        }
        self.pixels.render()
    }
}

fn build_pixels(
    window: Arc<Window>,
    surface_size: winit::dpi::PhysicalSize<u32>,
    viewport: Viewport,
    config: &LoopConfig,
) -> Result<Pixels<'static>, Error> {
    let surface = SurfaceTexture::new(surface_size.width, surface_size.height, window);
    let power_preference = if config.hardware_acceleration {
        PowerPreference::HighPerformance
    } else {
        PowerPreference::LowPower
    };
    PixelsBuilder::new(
        viewport.real_size.width,
        viewport.real_size.height,
        surface,
    )
    .enable_vsync(config.double_buffer)
    .request_adapter_options(RequestAdapterOptions {
        power_preference,
        force_fallback_adapter: false,
        compatible_surface: None,
    })
    .build()
}
