use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};
use winit::keyboard::KeyCode;

use super::signals::names;
use super::{
    Canvas, Character, CharacterError, Direction, DirectionKeyMap, EventBus,
    FiredAction, InputEvent, IntervalTimer, ObjectAction, Place, PlaceRef, Point, PressedKeys,
    ScreenMode, SignalBus, SignalPayload, Size, Transition, TriggerEdge, Vec2, Viewport,
    ViewportError, WalkStatus,
};

pub const DEFAULT_WALK_INTERVAL: Duration = Duration::from_millis(100);
pub const QUIT_KEY: KeyCode = KeyCode::Escape;
pub const RESET_KEY: KeyCode = KeyCode::KeyR;
const MAX_COMMANDS_PER_TICK: usize = 64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AssetLoading {
    /// Decode every place's assets when it is added.
    Eager,
    /// Decode a place's assets when it first becomes current.
    #[default]
    Lazy,
}

#[derive(Debug, Clone)]
pub struct WorldConfig {
    pub size: Size,
    pub enforce_screen_bounds: bool,
    pub asset_loading: AssetLoading,
    pub clear_color: [u8; 4],
    pub letterbox_color: [u8; 4],
    pub walk_interval: Duration,
}

impl WorldConfig {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            enforce_screen_bounds: true,
            asset_loading: AssetLoading::default(),
            clear_color: [0, 0, 0, 255],
            letterbox_color: [0, 0, 0, 255],
            walk_interval: DEFAULT_WALK_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CharacterId(usize);

#[derive(Clone)]
pub enum WorldCommand {
    Transition(Transition),
    Emit { name: String, payload: SignalPayload },
    Custom(Rc<dyn Fn(&mut World)>),
    Quit,
}

impl fmt::Debug for WorldCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorldCommand::Transition(transition) => {
                f.debug_tuple("Transition").field(transition).finish()
            }
            WorldCommand::Emit { name, payload } => f
                .debug_struct("Emit")
                .field("name", name)
                .field("payload", payload)
                .finish(),
            WorldCommand::Custom(_) => f.write_str("Custom(..)"),
            WorldCommand::Quit => f.write_str("Quit"),
        }
    }
}

#[derive(Debug, Error)]
pub enum WorldError {
    #[error("no place matches {0}")]
    UnknownPlace(PlaceRef),
    #[error("no character with id {0:?}")]
    UnknownCharacter(CharacterId),
    #[error("the world has no places")]
    NoPlaces,
    #[error(transparent)]
    Viewport(#[from] ViewportError),
}

struct CharacterSlot {
    character: Character,
    timer: IntervalTimer,
}

/// Places, characters and the per-tick loop body. Owns the viewport every
/// drawing call goes through.
pub struct World {
    config: WorldConfig,
    viewport: Viewport,
    places: Vec<Place>,
    current: Option<usize>,
    characters: Vec<CharacterSlot>,
    leading: Option<CharacterId>,
    pressed: PressedKeys,
    key_map: DirectionKeyMap,
    walk_timer: IntervalTimer,
    signals: SignalBus,
    events: EventBus,
    pending: VecDeque<WorldCommand>,
    pointer: Option<Vec2>,
    running: bool,
    quitting: bool,
    tick_count: u64,
    warned: HashSet<String>,
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("size", &self.config.size)
            .field("places", &self.places.len())
            .field("current", &self.current)
            .field("characters", &self.characters.len())
            .field("running", &self.running)
            .field("quitting", &self.quitting)
            .field("tick_count", &self.tick_count)
            .finish_non_exhaustive()
    }
}

impl World {
    pub fn new(config: WorldConfig, signals: SignalBus, events: EventBus) -> Self {
        let viewport = Viewport::identity(config.size);
        let walk_timer = IntervalTimer::new(config.walk_interval);
        Self {
            config,
            viewport,
            places: Vec::new(),
            current: None,
            characters: Vec::new(),
            leading: None,
            pressed: PressedKeys::default(),
            key_map: DirectionKeyMap::default(),
            walk_timer,
            signals,
            events,
            pending: VecDeque::new(),
            pointer: None,
            running: false,
            quitting: false,
            tick_count: 0,
            warned: HashSet::new(),
        }
    }

    pub fn size(&self) -> Size {
        self.config.size
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn signals(&self) -> &SignalBus {
        &self.signals
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn pressed_keys(&self) -> &PressedKeys {
        &self.pressed
    }

    /// Last pointer position in logical coordinates.
    pub fn pointer(&self) -> Option<Vec2> {
        self.pointer
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn is_running(&self) -> bool {
        self.running && !self.quitting
    }

    pub fn is_quitting(&self) -> bool {
        self.quitting
    }

    /// Computes and installs the viewport for `mode`. `display_size` is the
    /// detected monitor resolution, needed by the fullscreen modes.
    pub fn create_screen(
        &mut self,
        mode: ScreenMode,
        display_size: Option<Size>,
    ) -> Result<Viewport, WorldError> {
        let viewport = Viewport::compute(self.config.size, mode, display_size)?;
        info!(
            logical_width = self.config.size.width,
            logical_height = self.config.size.height,
            real_width = viewport.real_size.width,
            real_height = viewport.real_size.height,
            zoom = viewport.zoom,
            offset_x = viewport.offset.x,
            offset_y = viewport.offset.y,
            letterboxed = viewport.letterbox.is_some(),
            "screen_created"
        );
        self.viewport = viewport;
        Ok(viewport)
    }

    /// A blank place sized to this world.
    pub fn create_place(&self) -> Place {
        Place::new(self.config.size)
    }

    pub fn add_place(&mut self, mut place: Place) -> usize {
        if self.config.asset_loading == AssetLoading::Eager {
            place.load_assets();
        }
        self.places.push(place);
        self.places.len() - 1
    }

    pub fn places(&self) -> &[Place] {
        &self.places
    }

    pub fn place(&self, index: usize) -> Option<&Place> {
        self.places.get(index)
    }

    pub fn place_mut(&mut self, index: usize) -> Option<&mut Place> {
        self.places.get_mut(index)
    }

    pub fn current_place_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_place(&self) -> Option<&Place> {
        self.current.and_then(|index| self.places.get(index))
    }

    pub fn current_place_mut(&mut self) -> Option<&mut Place> {
        self.current.and_then(|index| self.places.get_mut(index))
    }

    pub fn resolve_place(&self, place: &PlaceRef) -> Option<usize> {
        match place {
            PlaceRef::Index(index) => (*index < self.places.len()).then_some(*index),
            PlaceRef::Named(id) => self
                .places
                .iter()
                .position(|candidate| candidate.id() == Some(id.as_str())),
        }
    }

    pub fn add_character(&mut self, character: Character) -> CharacterId {
        let mut timer = IntervalTimer::new(character.frame_duration());
        if self.running {
            timer.restart(Instant::now());
        }
        self.characters.push(CharacterSlot { character, timer });
        CharacterId(self.characters.len() - 1)
    }

    pub fn character(&self, id: CharacterId) -> Option<&Character> {
        self.characters.get(id.0).map(|slot| &slot.character)
    }

    pub fn character_mut(&mut self, id: CharacterId) -> Option<&mut Character> {
        self.characters.get_mut(id.0).map(|slot| &mut slot.character)
    }

    /// The input-driven character. Without one, walking input is ignored.
    pub fn set_leading(&mut self, id: CharacterId) -> Result<(), WorldError> {
        if id.0 >= self.characters.len() {
            return Err(WorldError::UnknownCharacter(id));
        }
        self.leading = Some(id);
        Ok(())
    }

    pub fn leading(&self) -> Option<&Character> {
        self.leading.and_then(|id| self.character(id))
    }

    pub fn leading_mut(&mut self) -> Option<&mut Character> {
        self.leading.and_then(|id| self.character_mut(id))
    }

    fn leading_frame_height(&self) -> u32 {
        self.leading()
            .and_then(|character| character.frame_size().ok())
            .map_or(0, |size| size.height)
    }

    /// Where characters appear in a place that sets no default.
    pub fn default_position(&self) -> Point {
        Point::new(
            (self.config.size.width / 2) as i32,
            (self.config.size.height as f32 * 0.9) as i32,
        )
    }

    /// Switches the current place. The leading character lands on
    /// `position`, or the place's default, and stops walking.
    pub fn set_place(
        &mut self,
        place: impl Into<PlaceRef>,
        position: Option<Point>,
        direction: Option<Direction>,
    ) -> Result<(), WorldError> {
        let place = place.into();
        let index = self
            .resolve_place(&place)
            .ok_or(WorldError::UnknownPlace(place))?;

        if let Some(previous) = self.current {
            self.emit(names::PLACE_LEAVE, SignalPayload::Place { index: previous });
        }
        self.current = Some(index);

        let fallback = self.default_position();
        let target_place = &mut self.places[index];
        target_place.load_assets();
        target_place.finalize_exits();
        let landing = position
            .or(target_place.default_position())
            .unwrap_or(fallback);

        if let Some(id) = self.leading {
            self.characters[id.0].character.place_at(landing, direction);
        }
        let walkable = self.settle_leading(index);

        info!(
            place = index,
            x = landing.x,
            y = landing.y,
            walkable,
            "place_entered"
        );
        self.emit(names::PLACE_ENTER, SignalPayload::Place { index });
        Ok(())
    }

    pub fn start(&mut self) -> Result<(), WorldError> {
        if self.places.is_empty() {
            return Err(WorldError::NoPlaces);
        }
        self.emit(names::BEFORE_WORLD_START, self.world_payload());
        if self.current.is_none() {
            self.set_place(0usize, None, None)?;
        }
        let now = Instant::now();
        for slot in &mut self.characters {
            slot.timer.restart(now);
        }
        self.running = true;
        self.emit(names::AFTER_WORLD_START, self.world_payload());
        Ok(())
    }

    pub fn end(&mut self) {
        if !self.running {
            return;
        }
        self.emit(names::BEFORE_WORLD_END, self.world_payload());
        self.running = false;
        self.emit(names::AFTER_WORLD_END, self.world_payload());
        info!(ticks = self.tick_count, "world_ended");
    }

    /// Terminal: a quitting world never ticks again.
    pub fn quit(&mut self) {
        if !self.quitting {
            info!(tick = self.tick_count, "world_quitting");
        }
        self.quitting = true;
    }

    pub fn queue(&mut self, command: WorldCommand) {
        self.pending.push_back(command);
    }

    /// One loop iteration: input, walking, deferred commands, animation,
    /// then drawing.
    pub fn tick(&mut self, events: &[InputEvent], now: Instant, canvas: &mut Canvas<'_>) {
        if self.quitting {
            return;
        }
        self.tick_count += 1;
        self.emit(names::BEFORE_LOOP, self.world_payload());

        for event in events {
            self.handle_event(*event);
        }

        if !self.quitting {
            self.step_leading(now);
            self.apply_pending();
            self.advance_timers(now);
        }

        self.draw(canvas);
        self.emit(names::AFTER_LOOP, self.world_payload());
    }

    fn handle_event(&mut self, event: InputEvent) {
        let event = match event.pointer_position() {
            Some(real) => event.with_pointer_position(self.viewport.real_to_logical(real)),
            None => event,
        };

        match event {
            InputEvent::KeyDown(key) => {
                if key == QUIT_KEY {
                    info!(reason = "escape_key", "shutdown_requested");
                    self.quit();
                } else if key == RESET_KEY {
                    self.reset_leading();
                }
                self.pressed.press(key);
            }
            InputEvent::KeyUp(key) => {
                self.pressed.release(key);
            }
            InputEvent::CloseRequested => {
                info!(reason = "window_close", "shutdown_requested");
                self.quit();
            }
            _ => {}
        }
        if let Some(position) = event.pointer_position() {
            self.pointer = Some(position);
        }

        self.events.run(&event.kind(), &event);
    }

    fn reset_leading(&mut self) {
        let Some(lead) = self.leading else {
            return;
        };
        self.characters[lead.0].character.reset_position();
        let walkable = match self.current {
            Some(place) => self.settle_leading(place),
            None => true,
        };
        debug!(walkable, "leading_character_reset");
    }

    /// Brings the leading character's drawn position and object contacts in
    /// line with a position it was moved to without walking. Returns whether
    /// that position is walkable; an unwalkable landing is only logged.
    fn settle_leading(&mut self, place_index: usize) -> bool {
        let Some(lead) = self.leading else {
            return true;
        };
        let frame_height = self.leading_frame_height();
        let enforce = self.config.enforce_screen_bounds;
        let character = &mut self.characters[lead.0].character;
        let place = &mut self.places[place_index];
        character.refresh_rendered_position(place);
        let footprint = match character.footprint(place) {
            Ok(footprint) => footprint,
            Err(error) => {
                warn!(error = %error, "place_prime_skipped");
                return true;
            }
        };
        place.prime_objects(&footprint);
        let walkable =
            place.is_position_walkable(footprint.position, footprint.size, enforce, frame_height);
        if !walkable {
            warn!(
                place = place_index,
                x = footprint.position.x,
                y = footprint.position.y,
                "landing_unwalkable"
            );
        }
        walkable
    }

    fn step_leading(&mut self, now: Instant) {
        let (Some(lead), Some(place_index)) = (self.leading, self.current) else {
            return;
        };
        let Some(direction) = self.key_map.resolve(&self.pressed) else {
            self.characters[lead.0].character.stop();
            return;
        };

        let walking = self.characters[lead.0].character.is_walking();
        if walking && !self.walk_timer.poll(now) {
            return;
        }
        self.walk_timer.restart(now);

        let frame_height = self.leading_frame_height();
        let enforce = self.config.enforce_screen_bounds;
        let character = &mut self.characters[lead.0].character;
        let place = &mut self.places[place_index];
        match character.attempt_walk(place, direction, enforce, 1.0, frame_height) {
            Ok(outcome) => {
                if outcome.status != WalkStatus::Moved {
                    debug!(status = ?outcome.status, direction = %direction, "walk_stopped");
                }
                self.dispatch_fired(place_index, outcome.fired);
            }
            Err(error) => self.warn_once(&error),
        }
    }

    fn dispatch_fired(&mut self, place: usize, fired: Vec<FiredAction>) {
        for action in fired {
            let signal = match action.edge {
                TriggerEdge::Enter => names::OBJECT_ENTER,
                TriggerEdge::Leave => names::OBJECT_LEAVE,
            };
            debug!(place, object = %action.object, edge = ?action.edge, "object_triggered");
            self.emit(
                signal,
                SignalPayload::Object {
                    place,
                    object: action.object,
                },
            );
            if let Some(command) = action.action {
                let command = match command {
                    ObjectAction::Transition(transition) => WorldCommand::Transition(transition),
                    ObjectAction::Emit(name) => WorldCommand::Emit {
                        payload: SignalPayload::Custom {
                            name: name.clone(),
                            place: Some(place),
                        },
                        name,
                    },
                    ObjectAction::Custom(custom) => WorldCommand::Custom(custom),
                };
                self.queue(command);
            }
        }
    }

    fn apply_pending(&mut self) {
        let mut applied = 0;
        while let Some(command) = self.pending.pop_front() {
            if applied == MAX_COMMANDS_PER_TICK {
                warn!(
                    remaining = self.pending.len() + 1,
                    "world_command_budget_exhausted"
                );
                self.pending.push_front(command);
                return;
            }
            applied += 1;
            match command {
                WorldCommand::Transition(transition) => {
                    let target = transition.target.clone();
                    if let Err(error) =
                        self.set_place(transition.target, transition.position, transition.direction)
                    {
                        warn!(target = %target, error = %error, "transition_failed");
                    }
                }
                WorldCommand::Emit { name, payload } => {
                    self.signals.run(name.as_str(), &payload);
                }
                WorldCommand::Custom(custom) => custom(self),
                WorldCommand::Quit => self.quit(),
            }
        }
    }

    fn advance_timers(&mut self, now: Instant) {
        for slot in &mut self.characters {
            if slot.timer.poll(now) {
                slot.character.next_step();
            }
        }
    }

    fn draw(&mut self, canvas: &mut Canvas<'_>) {
        canvas.clear(self.config.clear_color);

        let mut failures = Vec::new();
        if let Some(place) = self.current.and_then(|index| self.places.get(index)) {
            place.draw_background(canvas);

            let feet = self
                .leading
                .and_then(|id| self.characters.get(id.0))
                .map_or(i32::MAX, |slot| slot.character.position().y);

            for object in place.objects().iter().filter(|object| object.baseline() <= feet) {
                object.draw(canvas);
            }
            for slot in &self.characters {
                if let Err(error) = slot.character.draw(canvas, place) {
                    failures.push(error);
                }
            }
            for object in place.objects().iter().filter(|object| object.baseline() > feet) {
                object.draw(canvas);
            }
        }
        canvas.draw_letterbox(self.config.letterbox_color);

        for error in failures {
            self.warn_once(&error);
        }
    }

    fn warn_once(&mut self, error: &CharacterError) {
        let message = error.to_string();
        if self.warned.insert(message) {
            warn!(error = %error, "character_degraded");
        }
    }

    fn emit(&self, name: &str, payload: SignalPayload) {
        self.signals.run(name, &payload);
    }

    fn world_payload(&self) -> SignalPayload {
        SignalPayload::World {
            tick: self.tick_count,
            place: self.current,
        }
    }
}
