use thiserror::Error;

use crate::app::{Point, Size, Vec2};

/// How the logical screen is mapped onto the real display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScreenMode {
    /// Window of exactly logical size × zoom.
    Exact { zoom: f32 },
    /// Window of a user-chosen size; the logical screen is aspect-fitted.
    Manual(Size),
    /// Real fullscreen at the display resolution, aspect-fitted.
    Fullscreen,
    /// Borderless window covering the display, aspect-fitted.
    FakeFullscreen,
}

impl Default for ScreenMode {
    fn default() -> Self {
        ScreenMode::Exact { zoom: 1.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ViewportError {
    #[error("zoom factor must be a positive finite number, got {0}")]
    InvalidZoom(f32),
    #[error("logical size {}x{} has zero area", .0.width, .0.height)]
    EmptyLogical(Size),
    #[error("target size {}x{} has zero area", .0.width, .0.height)]
    EmptyTarget(Size),
    #[error("fullscreen requested but the display size could not be detected")]
    NoDisplay,
}

/// Logical → real transform: `real = offset + logical * zoom`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub logical_size: Size,
    pub real_size: Size,
    pub zoom: f32,
    pub offset: Point,
    pub letterbox: Option<[ScreenRect; 2]>,
}

impl Viewport {
    pub fn identity(logical_size: Size) -> Self {
        Self {
            logical_size,
            real_size: logical_size,
            zoom: 1.0,
            offset: Point::default(),
            letterbox: None,
        }
    }

    pub fn compute(
        logical_size: Size,
        mode: ScreenMode,
        display_size: Option<Size>,
    ) -> Result<Self, ViewportError> {
        if logical_size.is_empty() {
            return Err(ViewportError::EmptyLogical(logical_size));
        }
        match mode {
            ScreenMode::Exact { zoom } => {
                if !zoom.is_finite() || zoom <= 0.0 {
                    return Err(ViewportError::InvalidZoom(zoom));
                }
                Ok(Self {
                    logical_size,
                    real_size: logical_size.scaled(zoom),
                    zoom,
                    offset: Point::default(),
                    letterbox: None,
                })
            }
            ScreenMode::Manual(target) => Self::fit(logical_size, target),
            ScreenMode::Fullscreen | ScreenMode::FakeFullscreen => {
                let display = display_size.ok_or(ViewportError::NoDisplay)?;
                Self::fit(logical_size, display)
            }
        }
    }

    /// Aspect-fit into `target`: the smaller axis factor wins, the image is
    /// centered and the slack on the other axis becomes two letterbox bars.
    pub fn fit(logical_size: Size, target: Size) -> Result<Self, ViewportError> {
        if logical_size.is_empty() {
            return Err(ViewportError::EmptyLogical(logical_size));
        }
        if target.is_empty() {
            return Err(ViewportError::EmptyTarget(target));
        }

        let zoom_x = target.width as f32 / logical_size.width as f32;
        let zoom_y = target.height as f32 / logical_size.height as f32;
        let zoom = zoom_x.min(zoom_y);
        let scaled_width = ((logical_size.width as f32 * zoom).round() as u32).min(target.width);
        let scaled_height =
            ((logical_size.height as f32 * zoom).round() as u32).min(target.height);
        let offset = Point::new(
            ((target.width - scaled_width) / 2) as i32,
            ((target.height - scaled_height) / 2) as i32,
        );

        let letterbox = if scaled_width < target.width {
            let right_x = offset.x + scaled_width as i32;
            Some([
                ScreenRect {
                    x: 0,
                    y: 0,
                    width: offset.x as u32,
                    height: target.height,
                },
                ScreenRect {
                    x: right_x,
                    y: 0,
                    width: target.width - right_x as u32,
                    height: target.height,
                },
            ])
        } else if scaled_height < target.height {
            let bottom_y = offset.y + scaled_height as i32;
            Some([
                ScreenRect {
                    x: 0,
                    y: 0,
                    width: target.width,
                    height: offset.y as u32,
                },
                ScreenRect {
                    x: 0,
                    y: bottom_y,
                    width: target.width,
                    height: target.height - bottom_y as u32,
                },
            ])
        } else {
            None
        };

        Ok(Self {
            logical_size,
            real_size: target,
            zoom,
            offset,
            letterbox,
        })
    }

    pub fn logical_to_real(&self, logical: Point) -> Point {
        Point::new(
            self.offset.x + (logical.x as f32 * self.zoom).round() as i32,
            self.offset.y + (logical.y as f32 * self.zoom).round() as i32,
        )
    }

    pub fn real_to_logical(&self, real: Vec2) -> Vec2 {
        Vec2::new(
            (real.x - self.offset.x as f32) / self.zoom,
            (real.y - self.offset.y as f32) / self.zoom,
        )
    }
}
