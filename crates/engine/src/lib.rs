pub mod app;
pub mod content;

pub use app::{
    run_world, signals, AppError, AssetLoading, Canvas, Character, CharacterError, CharacterId,
    Compass, CoordinateMode, Direction, EventBus, Game, GameError, GameInfo, HookError,
    HookResult, InputEvent, InputEventKind, LoopConfig, Object, ObjectAction, ObjectId, Place,
    PlaceRef, Point, Rect, ScreenMode, SignalBus, SignalPayload, Size, Surface, System,
    SystemConfig, SystemContext, SystemError, SystemHook, Transition, Vec2, Viewport, World,
    WorldCommand, WorldConfig, WorldError,
};
pub use content::{ImageSlot, WalkabilityMask};
