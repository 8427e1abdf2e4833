use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::content::{ImageSlot, WalkabilityMask};

use super::{
    ActorFootprint, Canvas, Compass, FiredAction, Object, ObjectId, Point, Size,
};

/// Smallest depth factor handed out, keeps sprites from vanishing.
pub const MIN_DEPTH_SCALE: f32 = 0.05;

/// How callers name a place: by list index or by symbolic id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PlaceRef {
    Index(usize),
    Named(String),
}

impl From<usize> for PlaceRef {
    fn from(index: usize) -> Self {
        PlaceRef::Index(index)
    }
}

impl From<&str> for PlaceRef {
    fn from(id: &str) -> Self {
        PlaceRef::Named(id.to_string())
    }
}

impl From<String> for PlaceRef {
    fn from(id: String) -> Self {
        PlaceRef::Named(id)
    }
}

impl fmt::Display for PlaceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaceRef::Index(index) => write!(f, "#{index}"),
            PlaceRef::Named(id) => write!(f, "'{id}'"),
        }
    }
}

#[derive(Debug, Default)]
enum MaskSlot {
    #[default]
    None,
    Deferred(PathBuf),
    Loaded(WalkabilityMask),
    Failed,
}

#[derive(Debug)]
pub struct Place {
    id: Option<String>,
    size: Size,
    background: ImageSlot,
    mask: MaskSlot,
    depth_power: Option<f32>,
    default_position: Option<Point>,
    objects: Vec<Object>,
    next_object_id: u32,
    exits: HashMap<Compass, ObjectId>,
    names: HashMap<String, ObjectId>,
    exits_finalized: bool,
}

impl Place {
    /// `size` is the logical size of the world the place belongs to.
    pub fn new(size: Size) -> Self {
        Self {
            id: None,
            size,
            background: ImageSlot::Empty,
            mask: MaskSlot::None,
            depth_power: None,
            default_position: None,
            objects: Vec::new(),
            next_object_id: 0,
            exits: HashMap::new(),
            names: HashMap::new(),
            exits_finalized: false,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_background(mut self, background: ImageSlot) -> Self {
        self.background = background;
        self
    }

    pub fn with_mask(mut self, mask: WalkabilityMask) -> Self {
        self.mask = MaskSlot::Loaded(mask);
        self
    }

    /// The mask is read from `path` when the place is first entered.
    pub fn with_deferred_mask(mut self, path: impl Into<PathBuf>) -> Self {
        self.mask = MaskSlot::Deferred(path.into());
        self
    }

    pub fn with_depth_power(mut self, power: f32) -> Self {
        self.depth_power = Some(power);
        self
    }

    pub fn with_default_position(mut self, position: Point) -> Self {
        self.default_position = Some(position);
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn default_position(&self) -> Option<Point> {
        self.default_position
    }

    pub fn has_mask(&self) -> bool {
        matches!(self.mask, MaskSlot::Loaded(_))
    }

    pub fn add_object(&mut self, mut object: Object) -> ObjectId {
        let id = ObjectId(self.next_object_id);
        self.next_object_id += 1;
        object.id = id;
        if let Some(name) = object.name() {
            self.names.insert(name.to_string(), id);
        }
        self.objects.push(object);
        id
    }

    pub fn remove_object(&mut self, id: ObjectId) -> Option<Object> {
        let index = self.objects.iter().position(|object| object.id() == id)?;
        let object = self.objects.remove(index);
        self.names.retain(|_, named| *named != id);
        self.exits.retain(|_, exit| *exit != id);
        Some(object)
    }

    pub fn object(&self, id: ObjectId) -> Option<&Object> {
        self.objects.iter().find(|object| object.id() == id)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut Object> {
        self.objects.iter_mut().find(|object| object.id() == id)
    }

    pub fn object_by_name(&self, name: &str) -> Option<&Object> {
        self.names.get(name).and_then(|id| self.object(*id))
    }

    pub fn objects(&self) -> &[Object] {
        &self.objects
    }

    pub fn set_direction_object(&mut self, compass: Compass, id: ObjectId) {
        self.exits.insert(compass, id);
    }

    pub fn direction_object(&self, compass: Compass) -> Option<&Object> {
        self.exits.get(&compass).and_then(|id| self.object(*id))
    }

    /// Perspective shrink factor in `(0, 1]` for a character standing at
    /// `position`: `(y / height) ^ power`.
    pub fn char_depth_scale(&self, position: Point) -> f32 {
        let Some(power) = self.depth_power else {
            return 1.0;
        };
        let height = self.size.height.max(1) as f32;
        let y = (position.y as f32).clamp(1.0, height);
        let scale = (y / height).powf(power);
        if scale.is_finite() {
            scale.clamp(MIN_DEPTH_SCALE, 1.0)
        } else {
            1.0
        }
    }

    /// Where a character at `position` is drawn: shifted right by half the
    /// width lost to depth scaling so it shrinks around its center.
    pub fn rendered_position(&self, position: Point, frame_width: u32) -> Point {
        let scale = self.char_depth_scale(position);
        let lost = frame_width as f32 * (1.0 - scale);
        Point::new(position.x + (lost / 2.0) as i32, position.y)
    }

    /// `position` is the feet (bottom-left) of a box of `size`. With screen
    /// bounds enforced the box must stay inside the world, except that its
    /// top may reach above the screen by a quarter of the leading frame.
    pub fn is_position_walkable(
        &self,
        position: Point,
        size: Size,
        enforce_screen_bounds: bool,
        leading_frame_height: u32,
    ) -> bool {
        let width = size.width as i32;
        let height = size.height as i32;

        if enforce_screen_bounds {
            let tolerance = leading_frame_height as i32 / 4;
            if position.x < 0
                || position.x + width >= self.size.width as i32
                || position.y >= self.size.height as i32
                || position.y - height < -tolerance
            {
                return false;
            }
        }

        let MaskSlot::Loaded(mask) = &self.mask else {
            return true;
        };

        let left = position.x;
        let right = position.x + (width - 1).max(0);
        let feet = position.y;
        let top = position.y - height;
        let middle = position.y - height / 2;
        let samples = [
            Point::new(left, feet),
            Point::new(right, feet),
            Point::new(left, top),
            Point::new(right, top),
            Point::new(left + width / 2, middle),
            Point::new(left + width / 4, middle),
            Point::new(left + width * 3 / 4, middle),
        ];
        samples.into_iter().all(|sample| mask.query(sample))
    }

    /// Decodes the background, mask and object images if they are still
    /// pending. Failures are logged; a missing mask leaves everything
    /// walkable.
    pub fn load_assets(&mut self) {
        self.background.ensure_loaded();
        if let MaskSlot::Deferred(path) = &self.mask {
            self.mask = match WalkabilityMask::load_sized(path, self.size) {
                Ok(mask) => {
                    debug!(path = %path.display(), "walkability_mask_loaded");
                    MaskSlot::Loaded(mask)
                }
                Err(error) => {
                    warn!(path = %path.display(), error = %error, "walkability_mask_load_failed");
                    MaskSlot::Failed
                }
            };
        }
        for object in &mut self.objects {
            object.load_image();
        }
    }

    pub(crate) fn finalize_exits(&mut self) {
        if self.exits_finalized {
            return;
        }
        self.exits_finalized = true;
        let size = self.size;
        for object in &mut self.objects {
            object.finalize_exit(size);
        }
    }

    /// Tests every object against `footprint` and updates each one's
    /// enter/leave state. The caller must not move when any object blocks.
    pub fn check_objects(&mut self, footprint: &ActorFootprint) -> (bool, Vec<FiredAction>) {
        let mut blocked = false;
        let mut fired = Vec::new();
        for object in &mut self.objects {
            let check = object.probe(footprint);
            blocked |= check.blocks;
            if let Some(action) = object.apply_touch(check.touching) {
                fired.push(action);
            }
        }
        (blocked, fired)
    }

    pub fn prime_objects(&mut self, footprint: &ActorFootprint) {
        for object in &mut self.objects {
            object.prime(footprint);
        }
    }

    pub fn draw_background(&self, canvas: &mut Canvas<'_>) {
        if let Some(surface) = self.background.surface() {
            canvas.blit(surface, Point::new(0, 0));
        }
    }
}
