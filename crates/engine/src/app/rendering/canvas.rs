use std::fmt;

use crate::app::{Point, Size};

use super::{ScreenRect, Viewport};

/// Decoded RGBA8 image held in memory.
#[derive(Clone, PartialEq, Eq)]
pub struct Surface {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl fmt::Debug for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Surface")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl Surface {
    /// Returns `None` when the buffer does not hold `width * height` pixels.
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Option<Self> {
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return None;
        }
        Some(Self {
            width,
            height,
            rgba,
        })
    }

    pub fn solid(size: Size, color: [u8; 4]) -> Self {
        let pixel_count = size.width as usize * size.height as usize;
        let mut rgba = Vec::with_capacity(pixel_count * 4);
        for _ in 0..pixel_count {
            rgba.extend_from_slice(&color);
        }
        Self {
            width: size.width,
            height: size.height,
            rgba,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let mut pixel = [0u8; 4];
        pixel.copy_from_slice(&self.rgba[offset..offset + 4]);
        Some(pixel)
    }
}

/// Frame buffer in real pixels, addressed with logical coordinates.
pub struct Canvas<'a> {
    frame: &'a mut [u8],
    width: u32,
    height: u32,
    viewport: Viewport,
}

impl<'a> Canvas<'a> {
    pub fn new(frame: &'a mut [u8], width: u32, height: u32, viewport: Viewport) -> Self {
        Self {
            frame,
            width,
            height,
            viewport,
        }
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn clear(&mut self, color: [u8; 4]) {
        for pixel in self.frame.chunks_exact_mut(4) {
            pixel.copy_from_slice(&color);
        }
    }

    pub fn blit(&mut self, surface: &Surface, position: Point) -> ScreenRect {
        self.blit_scaled(surface, position, 1.0)
    }

    /// Nearest-neighbour blit of `surface` with its top-left corner at the
    /// logical `position`. Fully transparent source pixels are skipped.
    pub fn blit_scaled(&mut self, surface: &Surface, position: Point, scale: f32) -> ScreenRect {
        let scale = normalized_scale(scale) * self.viewport.zoom;
        let origin = self.viewport.logical_to_real(position);
        let scaled_width = (surface.width as f32 * scale).round().max(1.0) as u32;
        let scaled_height = (surface.height as f32 * scale).round().max(1.0) as u32;
        let target = ScreenRect {
            x: origin.x,
            y: origin.y,
            width: scaled_width,
            height: scaled_height,
        };
        if surface.width == 0 || surface.height == 0 {
            return target;
        }

        let draw_left = origin.x.max(0);
        let draw_top = origin.y.max(0);
        let draw_right = (origin.x + scaled_width as i32).min(self.width as i32);
        let draw_bottom = (origin.y + scaled_height as i32).min(self.height as i32);
        if draw_left >= draw_right || draw_top >= draw_bottom {
            return target;
        }

        let inv_scale = scale.recip();
        let frame_width = self.width as usize;
        let source_width = surface.width as usize;

        for out_y in draw_top..draw_bottom {
            let src_y = (((out_y - origin.y) as f32) * inv_scale).floor() as u32;
            let src_row = src_y.min(surface.height - 1) as usize * source_width * 4;
            let dst_row = out_y as usize * frame_width * 4;

            for out_x in draw_left..draw_right {
                let src_x = (((out_x - origin.x) as f32) * inv_scale).floor() as u32;
                let src = src_row + src_x.min(surface.width - 1) as usize * 4;
                let alpha = surface.rgba[src + 3];
                if alpha == 0 {
                    continue;
                }
                let dst = dst_row + out_x as usize * 4;
                blend_into(&mut self.frame[dst..dst + 4], &surface.rgba[src..src + 4]);
            }
        }
        target
    }

    pub fn draw_letterbox(&mut self, color: [u8; 4]) {
        if let Some(bars) = self.viewport.letterbox {
            for bar in bars {
                self.fill_real(bar, color);
            }
        }
    }

    fn fill_real(&mut self, rect: ScreenRect, color: [u8; 4]) {
        let left = rect.x.max(0);
        let top = rect.y.max(0);
        let right = (rect.x + rect.width as i32).min(self.width as i32);
        let bottom = (rect.y + rect.height as i32).min(self.height as i32);
        for y in top..bottom {
            for x in left..right {
                let offset = (y as usize * self.width as usize + x as usize) * 4;
                self.frame[offset..offset + 4].copy_from_slice(&color);
            }
        }
    }
}

fn normalized_scale(scale: f32) -> f32 {
    if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        1.0
    }
}

fn blend_into(dst: &mut [u8], src: &[u8]) {
    let alpha = src[3] as u32;
    if alpha == 255 {
        dst.copy_from_slice(src);
        return;
    }
    let inverse = 255 - alpha;
    for channel in 0..3 {
        dst[channel] = ((src[channel] as u32 * alpha + dst[channel] as u32 * inverse) / 255) as u8;
    }
    dst[3] = 255;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::rendering::ScreenMode;

    const RED: [u8; 4] = [255, 0, 0, 255];
    const BLACK: [u8; 4] = [0, 0, 0, 255];

    fn pixel_at(frame: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
        let offset = ((y * width + x) * 4) as usize;
        [
            frame[offset],
            frame[offset + 1],
            frame[offset + 2],
            frame[offset + 3],
        ]
    }

    #[test]
    fn blit_scales_by_zoom_and_offset() {
        let viewport = Viewport::compute(
            Size::new(10, 10),
            ScreenMode::Manual(Size::new(20, 30)),
            None,
        )
        .expect("viewport");
        assert_eq!(viewport.offset, Point::new(0, 5));
        let mut frame = vec![0u8; 20 * 30 * 4];
        let mut canvas = Canvas::new(&mut frame, 20, 30, viewport);
        canvas.clear(BLACK);

        let drawn = canvas.blit(&Surface::solid(Size::new(2, 2), RED), Point::new(1, 1));
        assert_eq!(
            drawn,
            ScreenRect {
                x: 2,
                y: 7,
                width: 4,
                height: 4
            }
        );
        assert_eq!(pixel_at(&frame, 20, 2, 7), RED);
        assert_eq!(pixel_at(&frame, 20, 5, 10), RED);
        assert_eq!(pixel_at(&frame, 20, 6, 10), BLACK);
        assert_eq!(pixel_at(&frame, 20, 1, 7), BLACK);
    }

    #[test]
    fn transparent_pixels_keep_the_background_and_edges_clip() {
        let viewport = Viewport::identity(Size::new(4, 4));
        let mut frame = vec![0u8; 4 * 4 * 4];
        let mut canvas = Canvas::new(&mut frame, 4, 4, viewport);
        canvas.clear(BLACK);

        let sprite =
            Surface::from_rgba(2, 1, vec![255, 0, 0, 255, 0, 255, 0, 0]).expect("surface");
        canvas.blit(&sprite, Point::new(3, -1));
        canvas.blit(&sprite, Point::new(0, 3));

        assert_eq!(pixel_at(&frame, 4, 0, 3), RED);
        assert_eq!(pixel_at(&frame, 4, 1, 3), BLACK);
    }

    #[test]
    fn letterbox_bars_are_painted_outside_content() {
        let viewport =
            Viewport::compute(Size::new(4, 2), ScreenMode::Manual(Size::new(4, 4)), None)
                .expect("viewport");
        let mut frame = vec![0u8; 4 * 4 * 4];
        let mut canvas = Canvas::new(&mut frame, 4, 4, viewport);
        canvas.clear(RED);
        canvas.draw_letterbox(BLACK);

        assert_eq!(pixel_at(&frame, 4, 0, 0), BLACK);
        assert_eq!(pixel_at(&frame, 4, 0, 1), RED);
        assert_eq!(pixel_at(&frame, 4, 3, 2), RED);
        assert_eq!(pixel_at(&frame, 4, 3, 3), BLACK);
    }

    #[test]
    fn from_rgba_rejects_wrong_length() {
        assert!(Surface::from_rgba(2, 2, vec![0; 15]).is_none());
        let surface = Surface::solid(Size::new(3, 1), RED);
        assert_eq!(surface.pixel(2, 0), Some(RED));
        assert_eq!(surface.pixel(3, 0), None);
    }
}
