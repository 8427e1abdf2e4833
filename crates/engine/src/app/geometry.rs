use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Scales both axes, rounding to the nearest pixel. Never collapses a
    /// non-empty axis to zero.
    pub fn scaled(&self, factor: f32) -> Size {
        let factor = if factor.is_finite() && factor > 0.0 {
            factor
        } else {
            1.0
        };
        let scale_axis = |axis: u32| {
            if axis == 0 {
                0
            } else {
                ((axis as f32 * factor).round() as u32).max(1)
            }
        };
        Size {
            width: scale_axis(self.width),
            height: scale_axis(self.height),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<Point> for Vec2 {
    fn from(point: Point) -> Self {
        Vec2 {
            x: point.x as f32,
            y: point.y as f32,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub const fn new(origin: Point, size: Size) -> Self {
        Self { origin, size }
    }

    /// Builds the rectangle spanning two corners in any order.
    pub fn from_corners(a: Point, b: Point) -> Self {
        let left = a.x.min(b.x);
        let top = a.y.min(b.y);
        Rect {
            origin: Point::new(left, top),
            size: Size::new(a.x.abs_diff(b.x), a.y.abs_diff(b.y)),
        }
    }

    pub fn left(&self) -> i32 {
        self.origin.x
    }

    pub fn top(&self) -> i32 {
        self.origin.y
    }

    pub fn right(&self) -> i32 {
        self.origin.x.saturating_add(self.size.width as i32)
    }

    pub fn bottom(&self) -> i32 {
        self.origin.y.saturating_add(self.size.height as i32)
    }

    /// Open-interval overlap: touching edges do not count.
    pub fn overlaps_span(&self, left: i32, top: i32, right: i32, bottom: i32) -> bool {
        left < self.right() && right > self.left() && top < self.bottom() && bottom > self.top()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaled_size_rounds_and_keeps_one_pixel() {
        assert_eq!(Size::new(10, 20).scaled(0.5), Size::new(5, 10));
        assert_eq!(Size::new(3, 3).scaled(0.01), Size::new(1, 1));
        assert_eq!(Size::new(0, 8).scaled(2.0), Size::new(0, 16));
        assert_eq!(Size::new(4, 4).scaled(f32::NAN), Size::new(4, 4));
    }

    #[test]
    fn rect_from_corners_normalizes_order() {
        let rect = Rect::from_corners(Point::new(30, 40), Point::new(10, 5));
        assert_eq!(rect.origin, Point::new(10, 5));
        assert_eq!(rect.size, Size::new(20, 35));
    }

    #[test]
    fn touching_edges_do_not_overlap() {
        let rect = Rect::new(Point::new(10, 10), Size::new(10, 10));
        assert!(!rect.overlaps_span(0, 0, 10, 10));
        assert!(rect.overlaps_span(0, 0, 11, 11));
        assert!(!rect.overlaps_span(20, 10, 30, 20));
    }
}
