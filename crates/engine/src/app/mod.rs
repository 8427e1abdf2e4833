mod character;
mod direction;
mod geometry;
mod input;
mod loop_runner;
mod object;
mod place;
mod rendering;
pub mod signals;
mod system;
mod timer;
mod world;

pub use character::{
    Character, CharacterError, WalkOutcome, WalkStatus, DEFAULT_FRAME_DURATION, DEFAULT_STRIDE,
};
pub use direction::{
    resolve_direction, Compass, Direction, DirectionBinding, DirectionKeyMap, InvalidDirection,
};
pub use geometry::{Point, Rect, Size, Vec2};
pub use input::{InputEvent, InputEventKind, PointerButton, PressedKeys};
pub use loop_runner::{run_world, AppError, LoopConfig, DEFAULT_TARGET_TPS};
pub use object::{
    ActorFootprint, CoordinateMode, FiredAction, Object, ObjectAction, ObjectCheck, ObjectId,
    Transition, TriggerEdge,
};
pub use place::{Place, PlaceRef, MIN_DEPTH_SCALE};
pub use rendering::{Canvas, Renderer, ScreenMode, ScreenRect, Surface, Viewport, ViewportError};
pub use signals::{
    DispatchReport, EventBus, HandlerId, HookBus, HookError, HookResult, SignalBus, SignalPayload,
};
pub use system::{
    Game, GameError, GameInfo, System, SystemConfig, SystemContext, SystemError, SystemHook,
};
pub use timer::IntervalTimer;
pub use world::{
    AssetLoading, CharacterId, World, WorldCommand, WorldConfig, WorldError,
    DEFAULT_WALK_INTERVAL, QUIT_KEY, RESET_KEY,
};
