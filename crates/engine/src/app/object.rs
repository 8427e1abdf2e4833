use std::fmt;
use std::rc::Rc;

use crate::content::ImageSlot;

use super::{Canvas, Direction, PlaceRef, Point, Rect, Size, World};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub(crate) u32);

impl ObjectId {
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "object#{}", self.0)
    }
}

/// Which actor position an object tests against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CoordinateMode {
    /// The depth-shifted position the character is drawn at.
    #[default]
    Rendered,
    /// The character's logical feet position.
    Logical,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub target: PlaceRef,
    pub position: Option<Point>,
    pub direction: Option<Direction>,
}

impl Transition {
    pub fn to(target: impl Into<PlaceRef>) -> Self {
        Self {
            target: target.into(),
            position: None,
            direction: None,
        }
    }

    pub fn at(mut self, position: Point) -> Self {
        self.position = Some(position);
        self
    }

    pub fn facing(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }
}

/// Work an object asks the world to do. Applied after the walk that
/// triggered it has settled.
#[derive(Clone)]
pub enum ObjectAction {
    Transition(Transition),
    /// Runs the named signal on the world's signal bus.
    Emit(String),
    Custom(Rc<dyn Fn(&mut World)>),
}

impl ObjectAction {
    pub fn custom(action: impl Fn(&mut World) + 'static) -> Self {
        ObjectAction::Custom(Rc::new(action))
    }
}

impl fmt::Debug for ObjectAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectAction::Transition(transition) => {
                f.debug_tuple("Transition").field(transition).finish()
            }
            ObjectAction::Emit(name) => f.debug_tuple("Emit").field(name).finish(),
            ObjectAction::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// The parts of a character an object needs to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActorFootprint {
    pub position: Point,
    pub rendered_position: Point,
    pub size: Size,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerEdge {
    Enter,
    Leave,
}

#[derive(Debug, Clone)]
pub struct FiredAction {
    pub object: ObjectId,
    pub edge: TriggerEdge,
    pub action: Option<ObjectAction>,
}

#[derive(Debug, Clone, Default)]
pub struct ObjectCheck {
    pub touching: bool,
    pub blocks: bool,
    pub fired: Option<FiredAction>,
}

/// Rectangular trigger region on a place, optionally drawn.
#[derive(Debug)]
pub struct Object {
    pub(crate) id: ObjectId,
    name: Option<String>,
    position: Point,
    size: Size,
    area: Option<Rect>,
    coordinates: CoordinateMode,
    on_enter: Option<ObjectAction>,
    on_leave: Option<ObjectAction>,
    visible: bool,
    walk_on_act: bool,
    image: ImageSlot,
    exit: Option<Transition>,
    exit_finalized: bool,
    in_area: bool,
}

impl Object {
    pub fn new(position: Point, size: Size) -> Self {
        Self {
            id: ObjectId(0),
            name: None,
            position,
            size,
            area: None,
            coordinates: CoordinateMode::default(),
            on_enter: None,
            on_leave: None,
            visible: true,
            walk_on_act: true,
            image: ImageSlot::Empty,
            exit: None,
            exit_finalized: false,
            in_area: false,
        }
    }

    /// Invisible region that moves the leading character elsewhere.
    pub fn exit(position: Point, size: Size, transition: Transition) -> Self {
        let mut object = Self::new(position, size);
        object.visible = false;
        object.exit = Some(transition);
        object
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_area(mut self, area: Rect) -> Self {
        self.area = Some(area);
        self
    }

    pub fn with_coordinates(mut self, coordinates: CoordinateMode) -> Self {
        self.coordinates = coordinates;
        self
    }

    pub fn on_enter(mut self, action: ObjectAction) -> Self {
        self.on_enter = Some(action);
        self
    }

    pub fn on_leave(mut self, action: ObjectAction) -> Self {
        self.on_leave = Some(action);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Touching the object stops the walk instead of passing through.
    pub fn blocking(mut self) -> Self {
        self.walk_on_act = false;
        self
    }

    pub fn with_image(mut self, image: ImageSlot) -> Self {
        self.image = image;
        self.adopt_image_size();
        self
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn coordinates(&self) -> CoordinateMode {
        self.coordinates
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_in_area(&self) -> bool {
        self.in_area
    }

    pub fn exit_transition(&self) -> Option<&Transition> {
        self.exit.as_ref()
    }

    pub fn show(&mut self) {
        self.visible = true;
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    pub fn trigger_rect(&self) -> Rect {
        self.area
            .unwrap_or_else(|| Rect::new(self.position, self.size))
    }

    /// Bottom edge used for ordering against characters.
    pub fn baseline(&self) -> i32 {
        self.position.y + self.size.height as i32
    }

    pub fn load_image(&mut self) {
        if self.image.ensure_loaded().is_some() {
            self.adopt_image_size();
        }
    }

    fn adopt_image_size(&mut self) {
        if let Some(surface) = self.image.surface() {
            if self.size.is_empty() {
                self.size = surface.size();
            }
        }
    }

    /// Foot-band overlap test without touching trigger state.
    pub fn probe(&self, footprint: &ActorFootprint) -> ObjectCheck {
        let actor = match self.coordinates {
            CoordinateMode::Rendered => footprint.rendered_position,
            CoordinateMode::Logical => footprint.position,
        };
        let band = (footprint.size.height / 15).max(1) as i32;
        let touching = self.trigger_rect().overlaps_span(
            actor.x,
            actor.y - band,
            actor.x + footprint.size.width as i32,
            actor.y,
        );
        ObjectCheck {
            touching,
            blocks: touching && !self.walk_on_act,
            fired: None,
        }
    }

    /// Tests the footprint and, when `trigger` is set, fires the enter or
    /// leave action on the edge of the overlap.
    pub fn check_if_action_needed(&mut self, footprint: &ActorFootprint, trigger: bool) -> ObjectCheck {
        let mut check = self.probe(footprint);
        if trigger {
            check.fired = self.apply_touch(check.touching);
        }
        check
    }

    pub(crate) fn apply_touch(&mut self, touching: bool) -> Option<FiredAction> {
        match (touching, self.in_area) {
            (true, false) => {
                self.in_area = true;
                let action = self
                    .on_enter
                    .clone()
                    .or_else(|| self.exit.clone().map(ObjectAction::Transition));
                Some(FiredAction {
                    object: self.id,
                    edge: TriggerEdge::Enter,
                    action,
                })
            }
            (false, true) => {
                self.in_area = false;
                Some(FiredAction {
                    object: self.id,
                    edge: TriggerEdge::Leave,
                    action: self.on_leave.clone(),
                })
            }
            _ => None,
        }
    }

    /// Records the current overlap without firing anything.
    pub fn prime(&mut self, footprint: &ActorFootprint) {
        self.in_area = self.probe(footprint).touching;
    }

    /// A negative target x counts from the right edge of the world. Runs once.
    pub(crate) fn finalize_exit(&mut self, world_size: Size) {
        if self.exit_finalized {
            return;
        }
        self.exit_finalized = true;
        if let Some(position) = self.exit.as_mut().and_then(|exit| exit.position.as_mut()) {
            if position.x < 0 {
                position.x += world_size.width as i32;
            }
        }
    }

    pub fn draw(&self, canvas: &mut Canvas<'_>) {
        if !self.visible {
            return;
        }
        if let Some(surface) = self.image.surface() {
            canvas.blit(surface, self.position);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn footprint_at(x: i32, y: i32) -> ActorFootprint {
        ActorFootprint {
            position: Point::new(x, y),
            rendered_position: Point::new(x, y),
            size: Size::new(10, 30),
        }
    }

    fn door() -> Object {
        Object::new(Point::new(100, 100), Size::new(20, 20))
            .on_enter(ObjectAction::Emit("door_open".to_string()))
            .on_leave(ObjectAction::Emit("door_close".to_string()))
    }

    #[test]
    fn enter_fires_once_per_continuous_overlap_and_leave_once() {
        let mut object = door();

        let outside = object.check_if_action_needed(&footprint_at(50, 50), true);
        assert!(!outside.touching);
        assert!(outside.fired.is_none());

        let entered = object.check_if_action_needed(&footprint_at(105, 110), true);
        let fired = entered.fired.expect("enter fired");
        assert_eq!(fired.edge, TriggerEdge::Enter);
        assert!(matches!(fired.action, Some(ObjectAction::Emit(ref name)) if name == "door_open"));

        for y in [111, 112, 115] {
            let still = object.check_if_action_needed(&footprint_at(105, y), true);
            assert!(still.touching);
            assert!(still.fired.is_none(), "re-fired at y={y}");
        }

        let left = object.check_if_action_needed(&footprint_at(105, 200), true);
        let fired = left.fired.expect("leave fired");
        assert_eq!(fired.edge, TriggerEdge::Leave);
        assert!(object
            .check_if_action_needed(&footprint_at(105, 200), true)
            .fired
            .is_none());
    }

    #[test]
    fn only_the_foot_band_counts() {
        let object = Object::new(Point::new(0, 0), Size::new(50, 50));
        // Body overlaps the object but the feet are below it.
        assert!(!object.probe(&footprint_at(10, 52)).touching);
        // Feet band reaches one pixel into the object.
        assert!(object.probe(&footprint_at(10, 51)).touching);
        // Edges touching do not overlap.
        assert!(!object.probe(&footprint_at(50, 30)).touching);
    }

    #[test]
    fn coordinate_mode_selects_actor_position() {
        let footprint = ActorFootprint {
            position: Point::new(0, 10),
            rendered_position: Point::new(100, 10),
            size: Size::new(4, 30),
        };
        let rendered = Object::new(Point::new(98, 0), Size::new(10, 20));
        let logical = Object::new(Point::new(98, 0), Size::new(10, 20))
            .with_coordinates(CoordinateMode::Logical);
        assert!(rendered.probe(&footprint).touching);
        assert!(!logical.probe(&footprint).touching);
    }

    #[test]
    fn blocking_objects_block_only_when_touched() {
        let wall = Object::new(Point::new(0, 0), Size::new(10, 10)).blocking();
        assert!(wall.probe(&footprint_at(2, 5)).blocks);
        assert!(!wall.probe(&footprint_at(40, 5)).blocks);
        assert!(!door().probe(&footprint_at(105, 110)).blocks);
    }

    #[test]
    fn area_overrides_image_rect() {
        let object = Object::new(Point::new(0, 0), Size::new(100, 100))
            .with_area(Rect::new(Point::new(80, 80), Size::new(5, 5)));
        assert!(!object.probe(&footprint_at(10, 50)).touching);
        assert!(object.probe(&footprint_at(78, 82)).touching);
    }

    #[test]
    fn primed_objects_do_not_fire_on_first_check() {
        let mut object = door();
        object.prime(&footprint_at(105, 110));
        assert!(object.is_in_area());
        assert!(object
            .check_if_action_needed(&footprint_at(105, 111), true)
            .fired
            .is_none());
    }

    #[test]
    fn exit_enter_action_is_its_transition_and_negative_x_is_finalized_once() {
        let mut exit = Object::exit(
            Point::new(620, 0),
            Size::new(20, 480),
            Transition::to(1usize).at(Point::new(-40, 300)),
        );
        exit.finalize_exit(Size::new(640, 480));
        exit.finalize_exit(Size::new(640, 480));
        assert_eq!(
            exit.exit_transition().and_then(|t| t.position),
            Some(Point::new(600, 300))
        );
        assert!(!exit.is_visible());

        let fired = exit
            .check_if_action_needed(&footprint_at(625, 100), true)
            .fired
            .expect("enter");
        assert!(matches!(
            fired.action,
            Some(ObjectAction::Transition(Transition {
                target: PlaceRef::Index(1),
                ..
            }))
        ));
    }
}
