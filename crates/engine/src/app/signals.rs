use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use thiserror::Error;
use tracing::warn;

use super::input::{InputEvent, InputEventKind};
use super::ObjectId;

pub mod names {
    pub const AFTER_SYSTEM_INIT: &str = "after_system_init";
    pub const BEFORE_SYSTEM_START: &str = "before_system_start";
    pub const AFTER_SYSTEM_START: &str = "after_system_start";
    pub const BEFORE_SYSTEM_END: &str = "before_system_end";
    pub const AFTER_SYSTEM_END: &str = "after_system_end";
    pub const BEFORE_GAME_START: &str = "before_game_start";
    pub const AFTER_GAME_START: &str = "after_game_start";
    pub const BEFORE_GAME_RUN: &str = "before_game_run";
    pub const AFTER_GAME_RUN: &str = "after_game_run";
    pub const BEFORE_GAME_END: &str = "before_game_end";
    pub const AFTER_GAME_END: &str = "after_game_end";
    pub const BEFORE_WORLD_START: &str = "before_world_start";
    pub const AFTER_WORLD_START: &str = "after_world_start";
    pub const BEFORE_WORLD_END: &str = "before_world_end";
    pub const AFTER_WORLD_END: &str = "after_world_end";
    pub const BEFORE_LOOP: &str = "before_loop";
    pub const AFTER_LOOP: &str = "after_loop";
    pub const PLACE_LEAVE: &str = "place_leave";
    pub const PLACE_ENTER: &str = "place_enter";
    pub const OBJECT_ENTER: &str = "object_enter";
    pub const OBJECT_LEAVE: &str = "object_leave";

    pub const ALL: &[&str] = &[
        AFTER_SYSTEM_INIT,
        BEFORE_SYSTEM_START,
        AFTER_SYSTEM_START,
        BEFORE_SYSTEM_END,
        AFTER_SYSTEM_END,
        BEFORE_GAME_START,
        AFTER_GAME_START,
        BEFORE_GAME_RUN,
        AFTER_GAME_RUN,
        BEFORE_GAME_END,
        AFTER_GAME_END,
        BEFORE_WORLD_START,
        AFTER_WORLD_START,
        BEFORE_WORLD_END,
        AFTER_WORLD_END,
        BEFORE_LOOP,
        AFTER_LOOP,
        PLACE_LEAVE,
        PLACE_ENTER,
        OBJECT_ENTER,
        OBJECT_LEAVE,
    ];
}

/// What a lifecycle signal is about.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalPayload {
    System,
    Game { shortname: String },
    World { tick: u64, place: Option<usize> },
    Place { index: usize },
    Object { place: usize, object: ObjectId },
    Custom { name: String, place: Option<usize> },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HookError {
    message: String,
}

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub type HookResult = Result<(), HookError>;

type Handler<P> = Rc<dyn Fn(&P, &[String]) -> HookResult>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

struct Registration<P> {
    id: HandlerId,
    handler: Handler<P>,
    extra_args: Rc<[String]>,
}

impl<P> Clone for Registration<P> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            handler: Rc::clone(&self.handler),
            extra_args: Rc::clone(&self.extra_args),
        }
    }
}

struct Registry<K, P> {
    next_id: u64,
    entries: HashMap<K, Vec<Registration<P>>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub invoked: usize,
    pub failed: usize,
}

/// Ordered name → handlers registry. Clones share the same registry.
pub struct HookBus<K, P> {
    registry: Rc<RefCell<Registry<K, P>>>,
}

pub type SignalBus = HookBus<String, SignalPayload>;
pub type EventBus = HookBus<InputEventKind, InputEvent>;

impl<K, P> Clone for HookBus<K, P> {
    fn clone(&self) -> Self {
        Self {
            registry: Rc::clone(&self.registry),
        }
    }
}

impl<K, P> Default for HookBus<K, P> {
    fn default() -> Self {
        Self {
            registry: Rc::new(RefCell::new(Registry {
                next_id: 0,
                entries: HashMap::new(),
            })),
        }
    }
}

impl<K, P> fmt::Debug for HookBus<K, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.borrow();
        let handler_count: usize = registry.entries.values().map(Vec::len).sum();
        f.debug_struct("HookBus")
            .field("names", &registry.entries.len())
            .field("handlers", &handler_count)
            .finish()
    }
}

impl<K, P> HookBus<K, P>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `handler` after every handler already registered for `name`.
    pub fn add<F>(&self, name: impl Into<K>, handler: F, extra_args: Vec<String>) -> HandlerId
    where
        F: Fn(&P, &[String]) -> HookResult + 'static,
    {
        let mut registry = self.registry.borrow_mut();
        let id = HandlerId(registry.next_id);
        registry.next_id += 1;
        registry
            .entries
            .entry(name.into())
            .or_default()
            .push(Registration {
                id,
                handler: Rc::new(handler),
                extra_args: extra_args.into(),
            });
        id
    }

    pub fn remove<Q>(&self, name: &Q, id: HandlerId) -> bool
    where
        K: std::borrow::Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let mut registry = self.registry.borrow_mut();
        let Some(list) = registry.entries.get_mut(name) else {
            return false;
        };
        match list.iter().position(|registration| registration.id == id) {
            Some(index) => {
                list.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn handler_count<Q>(&self, name: &Q) -> usize
    where
        K: std::borrow::Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.registry
            .borrow()
            .entries
            .get(name)
            .map_or(0, Vec::len)
    }

    /// Calls every handler for `name` in registration order. A handler that
    /// errors or panics is logged and skipped; the rest still run.
    pub fn run<Q>(&self, name: &Q, payload: &P) -> DispatchReport
    where
        K: std::borrow::Borrow<Q>,
        Q: Eq + Hash + fmt::Debug + ?Sized,
    {
        let snapshot: Vec<Registration<P>> = match self.registry.borrow().entries.get(name) {
            Some(list) => list.clone(),
            None => return DispatchReport::default(),
        };

        let mut report = DispatchReport::default();
        for registration in &snapshot {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                (registration.handler)(payload, &registration.extra_args)
            }));
            match outcome {
                Ok(Ok(())) => report.invoked += 1,
                Ok(Err(error)) => {
                    report.failed += 1;
                    warn!(signal = ?name, error = %error, "signal_handler_failed");
                }
                Err(_) => {
                    report.failed += 1;
                    warn!(signal = ?name, "signal_handler_panicked");
                }
            }
        }
        report
    }
}
