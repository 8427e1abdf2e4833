use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;

use super::{ActorFootprint, Canvas, Direction, FiredAction, Place, Point, Size, Surface};

pub const DEFAULT_FRAME_DURATION: Duration = Duration::from_millis(200);
/// Percent of the world dimension covered by one full-scale step.
pub const DEFAULT_STRIDE: f32 = 3.0;
const MIN_WALK_SCALE: f32 = 0.5;
const WALK_SCALE_STEP: f32 = 0.1;
const SCALE_EPSILON: f32 = 1e-4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CharacterError {
    #[error("character '{character}' has no frames for direction {direction}")]
    MissingFrames {
        character: String,
        direction: Direction,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkStatus {
    Moved,
    /// An object refused the step.
    Blocked,
    /// No walkable candidate down to the minimum scale.
    Halted,
}

#[derive(Debug)]
pub struct WalkOutcome {
    pub status: WalkStatus,
    pub fired: Vec<FiredAction>,
}

/// Animated sprite with eight facings. `position` is the feet: left edge and
/// bottom edge of the sprite box.
#[derive(Debug)]
pub struct Character {
    id: String,
    frames: HashMap<Direction, Vec<Surface>>,
    frame_duration: Duration,
    stride: f32,
    direction: Direction,
    original_direction: Direction,
    step: usize,
    walking: bool,
    position: Point,
    original_position: Point,
    rendered_position: Point,
}

impl Character {
    pub fn new(
        id: impl Into<String>,
        frames: HashMap<Direction, Vec<Surface>>,
        position: Point,
        direction: Direction,
    ) -> Self {
        Self {
            id: id.into(),
            frames,
            frame_duration: DEFAULT_FRAME_DURATION,
            stride: DEFAULT_STRIDE,
            direction,
            original_direction: direction,
            step: 0,
            walking: false,
            position,
            original_position: position,
            rendered_position: position,
        }
    }

    pub fn with_frame_duration(mut self, duration: Duration) -> Self {
        self.frame_duration = duration;
        self
    }

    pub fn with_stride(mut self, stride: f32) -> Self {
        self.stride = stride;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn frame_duration(&self) -> Duration {
        self.frame_duration
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn rendered_position(&self) -> Point {
        self.rendered_position
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn is_walking(&self) -> bool {
        self.walking
    }

    pub fn current_frame(&self) -> Result<&Surface, CharacterError> {
        let frames = self
            .frames
            .get(&self.direction)
            .filter(|frames| !frames.is_empty())
            .ok_or_else(|| CharacterError::MissingFrames {
                character: self.id.clone(),
                direction: self.direction,
            })?;
        let index = if self.walking {
            self.step % frames.len()
        } else {
            0
        };
        Ok(&frames[index])
    }

    pub fn frame_size(&self) -> Result<Size, CharacterError> {
        self.current_frame().map(Surface::size)
    }

    /// Depth-scaled box at the current position.
    pub fn footprint(&self, place: &Place) -> Result<ActorFootprint, CharacterError> {
        let frame = self.frame_size()?;
        Ok(ActorFootprint {
            position: self.position,
            rendered_position: place.rendered_position(self.position, frame.width),
            size: frame.scaled(place.char_depth_scale(self.position)),
        })
    }

    /// Advances the animation. Driven by the frame timer, not by walking.
    pub fn next_step(&mut self) {
        let len = self.frames.get(&self.direction).map_or(0, Vec::len);
        self.step = if len == 0 { 0 } else { (self.step + 1) % len };
    }

    pub fn stop(&mut self) {
        self.walking = false;
    }

    pub fn reset_position(&mut self) {
        self.position = self.original_position;
        self.direction = self.original_direction;
        self.walking = false;
    }

    /// Teleports without walkability checks, stops walking and makes the new
    /// spot the reset target.
    pub fn place_at(&mut self, position: Point, direction: Option<Direction>) {
        self.position = position;
        self.rendered_position = position;
        if let Some(direction) = direction {
            self.direction = direction;
        }
        self.original_position = position;
        self.original_direction = self.direction;
        self.walking = false;
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    pub fn refresh_rendered_position(&mut self, place: &Place) {
        let width = self.frame_size().map_or(0, |size| size.width);
        self.rendered_position = place.rendered_position(self.position, width);
    }

    /// One movement step. Tries `start_scale` and smaller scales down to 0.5
    /// until the place accepts the box. With no walkable candidate the
    /// character stops and is clamped back into the world. A candidate an
    /// object blocks is not committed.
    pub fn attempt_walk(
        &mut self,
        place: &mut Place,
        direction: Direction,
        enforce_screen_bounds: bool,
        start_scale: f32,
        leading_frame_height: u32,
    ) -> Result<WalkOutcome, CharacterError> {
        let frame = self.frame_size()?;
        let depth = place.char_depth_scale(self.position);
        let size = frame.scaled(depth);
        let world = place.size();
        let unit = direction.unit_vector();

        let mut candidate = None;
        for attempt in 0u16.. {
            let scale = start_scale - f32::from(attempt) * WALK_SCALE_STEP;
            if scale < MIN_WALK_SCALE - SCALE_EPSILON {
                break;
            }
            let reach = self.stride * depth * scale;
            let next = Point::new(
                self.position.x + step_offset(unit.x * reach * world.width as f32 / 100.0),
                self.position.y + step_offset(unit.y * reach * world.height as f32 / 100.0),
            );
            if place.is_position_walkable(next, size, enforce_screen_bounds, leading_frame_height) {
                candidate = Some(next);
                break;
            }
        }

        let Some(next) = candidate else {
            self.stop();
            self.clamp_into(world, frame);
            self.refresh_rendered_position(place);
            return Ok(WalkOutcome {
                status: WalkStatus::Halted,
                fired: Vec::new(),
            });
        };

        let footprint = ActorFootprint {
            position: next,
            rendered_position: place.rendered_position(next, frame.width),
            size: frame.scaled(place.char_depth_scale(next)),
        };
        let (blocked, fired) = place.check_objects(&footprint);
        if blocked {
            self.stop();
            return Ok(WalkOutcome {
                status: WalkStatus::Blocked,
                fired,
            });
        }

        self.direction = direction;
        self.position = next;
        self.rendered_position = footprint.rendered_position;
        self.walking = true;
        Ok(WalkOutcome {
            status: WalkStatus::Moved,
            fired,
        })
    }

    fn clamp_into(&mut self, world: Size, frame: Size) {
        let max_x = world.width as i32 - 1 - frame.width as i32;
        if self.position.x > max_x {
            self.position.x = max_x;
        }
        if self.position.x < 0 {
            self.position.x = 0;
        }
        if self.position.y >= world.height as i32 {
            self.position.y = world.height as i32 - 1;
        }
        if self.position.y - (frame.height as i32) < 0 {
            self.position.y = (frame.height as i32).min(world.height as i32 - 1);
        }
    }

    pub fn draw(&self, canvas: &mut Canvas<'_>, place: &Place) -> Result<(), CharacterError> {
        let frame = self.current_frame()?;
        let scale = place.char_depth_scale(self.position);
        let height = frame.size().scaled(scale).height as i32;
        let top_left = Point::new(self.rendered_position.x, self.rendered_position.y - height);
        canvas.blit_scaled(frame, top_left, scale);
        Ok(())
    }
}

/// Truncates toward zero, except that values within float noise of an
/// integer snap to it.
fn step_offset(offset: f32) -> i32 {
    let nearest = offset.round();
    if (offset - nearest).abs() < SCALE_EPSILON {
        nearest as i32
    } else {
        offset.trunc() as i32
    }
}
