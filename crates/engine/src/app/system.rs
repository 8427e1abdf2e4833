use std::error::Error as StdError;
use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{error, info};

use super::signals::names;
use super::{
    AppError, AssetLoading, EventBus, HookError, LoopConfig, SignalBus, SignalPayload, Size,
    WorldError,
};

/// Static description of a game.
#[derive(Debug, Clone, PartialEq)]
pub struct GameInfo {
    pub name: String,
    pub shortname: String,
    pub size: Size,
    pub datadir: PathBuf,
}

#[derive(Debug, Error)]
pub enum GameError {
    #[error(transparent)]
    World(#[from] WorldError),
    #[error(transparent)]
    App(#[from] AppError),
    #[error("{context}: {source}")]
    Other {
        context: String,
        #[source]
        source: Box<dyn StdError + 'static>,
    },
    #[error("{0}")]
    Message(String),
}

impl GameError {
    pub fn other(context: impl Into<String>, source: impl StdError + 'static) -> Self {
        GameError::Other {
            context: context.into(),
            source: Box::new(source),
        }
    }
}

/// A playable game. The system drives it through start, run and end.
pub trait Game {
    fn info(&self) -> &GameInfo;

    fn start_game(&mut self, context: &SystemContext) -> Result<(), GameError>;

    /// Blocks until the game is over.
    fn run_game(&mut self, context: &SystemContext) -> Result<(), GameError>;

    fn end_game(&mut self, context: &SystemContext) -> Result<(), GameError>;

    fn load(&mut self, _path: &Path) -> Result<(), GameError> {
        Ok(())
    }

    fn save(&self, _path: &Path) -> Result<(), GameError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct SystemConfig {
    pub display: LoopConfig,
    pub asset_loading: AssetLoading,
    /// Free-form arguments handed to installed hooks.
    pub debug_args: Vec<String>,
}

/// Everything a game or hook may reach: the configuration and both buses.
#[derive(Debug, Clone)]
pub struct SystemContext {
    pub config: SystemConfig,
    pub signals: SignalBus,
    pub events: EventBus,
}

/// Code attached to the system before it starts, typically signal handlers.
pub trait SystemHook {
    fn name(&self) -> &str;

    fn install(&self, context: &SystemContext) -> Result<(), HookError>;
}

#[derive(Debug, Error)]
pub enum SystemError {
    #[error("hook {name} failed to install: {source}")]
    Hook {
        name: String,
        #[source]
        source: HookError,
    },
    #[error("failed to resolve game: {0}")]
    ResolveGame(#[source] GameError),
    #[error("game failed during {stage}: {source}")]
    Game {
        stage: &'static str,
        #[source]
        source: GameError,
    },
    #[error("system already started")]
    AlreadyStarted,
}

pub struct System {
    context: SystemContext,
    game: Option<Box<dyn Game>>,
    started: bool,
    ended: bool,
}

impl fmt::Debug for System {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("System")
            .field("context", &self.context)
            .field("game", &self.game.as_ref().map(|game| game.info().shortname.clone()))
            .field("started", &self.started)
            .field("ended", &self.ended)
            .finish()
    }
}

impl System {
    pub fn new(config: SystemConfig, hooks: &[Box<dyn SystemHook>]) -> Result<Self, SystemError> {
        let context = SystemContext {
            config,
            signals: SignalBus::new(),
            events: EventBus::new(),
        };
        for hook in hooks {
            hook.install(&context).map_err(|source| SystemError::Hook {
                name: hook.name().to_string(),
                source,
            })?;
            info!(hook = hook.name(), "system_hook_installed");
        }

        let system = Self {
            context,
            game: None,
            started: false,
            ended: false,
        };
        system.emit(names::AFTER_SYSTEM_INIT, SignalPayload::System);
        Ok(system)
    }

    pub fn context(&self) -> &SystemContext {
        &self.context
    }

    pub fn signals(&self) -> &SignalBus {
        &self.context.signals
    }

    pub fn events(&self) -> &EventBus {
        &self.context.events
    }

    pub fn game(&self) -> Option<&dyn Game> {
        self.game.as_deref()
    }

    pub fn game_mut(&mut self) -> Option<&mut (dyn Game + 'static)> {
        self.game.as_deref_mut()
    }

    /// Resolves the game, then starts and runs it. Returns once the game's
    /// run loop is over; call [`System::end`] afterwards in every case.
    pub fn start<R>(&mut self, resolve: R) -> Result<(), SystemError>
    where
        R: FnOnce(&SystemContext) -> Result<Box<dyn Game>, GameError>,
    {
        if self.started {
            return Err(SystemError::AlreadyStarted);
        }
        self.started = true;
        info!("system_starting");
        self.emit(names::BEFORE_SYSTEM_START, SignalPayload::System);
        let game = resolve(&self.context).map_err(SystemError::ResolveGame)?;
        let payload = game_payload(game.as_ref());
        info!(name = %game.info().name, shortname = %game.info().shortname, "game_resolved");
        let game = self.game.insert(game);
        self.context.signals.run(names::AFTER_SYSTEM_START, &SignalPayload::System);

        self.context.signals.run(names::BEFORE_GAME_START, &payload);
        game.start_game(&self.context)
            .map_err(|source| SystemError::Game {
                stage: "start",
                source,
            })?;
        self.context.signals.run(names::AFTER_GAME_START, &payload);

        info!("game_running");
        self.context.signals.run(names::BEFORE_GAME_RUN, &payload);
        game.run_game(&self.context)
            .map_err(|source| SystemError::Game {
                stage: "run",
                source,
            })?;
        self.context.signals.run(names::AFTER_GAME_RUN, &payload);
        Ok(())
    }

    /// Ends the game, if any. Safe to call more than once and after a failed
    /// start; the end signals are emitted even when the game errors.
    pub fn end(&mut self) -> Result<(), SystemError> {
        if self.ended {
            return Ok(());
        }
        self.ended = true;
        self.emit(names::BEFORE_SYSTEM_END, SignalPayload::System);

        let mut outcome = Ok(());
        if let Some(game) = self.game.as_mut() {
            let payload = game_payload(game.as_ref());
            self.context.signals.run(names::BEFORE_GAME_END, &payload);
            if let Err(source) = game.end_game(&self.context) {
                error!(error = %source, "game_end_failed");
                outcome = Err(SystemError::Game { stage: "end", source });
            }
            self.context.signals.run(names::AFTER_GAME_END, &payload);
        }

        self.emit(names::AFTER_SYSTEM_END, SignalPayload::System);
        info!("system_ended");
        outcome
    }

    fn emit(&self, name: &str, payload: SignalPayload) {
        self.context.signals.run(name, &payload);
    }
}

fn game_payload(game: &dyn Game) -> SignalPayload {
    SignalPayload::Game {
        shortname: game.info().shortname.clone(),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    type Log = Rc<RefCell<Vec<String>>>;

    struct ScriptedGame {
        info: GameInfo,
        log: Log,
        fail_run: bool,
    }

    impl ScriptedGame {
        fn boxed(log: &Log, fail_run: bool) -> Box<dyn Game> {
            Box::new(Self {
                info: GameInfo {
                    name: "Test Quest".to_string(),
                    shortname: "testquest".to_string(),
                    size: Size::new(320, 200),
                    datadir: PathBuf::from("data"),
                },
                log: Rc::clone(log),
                fail_run,
            })
        }
    }

    impl Game for ScriptedGame {
        fn info(&self) -> &GameInfo {
            &self.info
        }

        fn start_game(&mut self, _context: &SystemContext) -> Result<(), GameError> {
            self.log.borrow_mut().push("start_game".to_string());
            Ok(())
        }

        fn run_game(&mut self, _context: &SystemContext) -> Result<(), GameError> {
            self.log.borrow_mut().push("run_game".to_string());
            if self.fail_run {
                return Err(GameError::Message("window unavailable".to_string()));
            }
            Ok(())
        }

        fn end_game(&mut self, _context: &SystemContext) -> Result<(), GameError> {
            self.log.borrow_mut().push("end_game".to_string());
            Ok(())
        }
    }

    struct RecordingHook {
        log: Log,
    }

    impl SystemHook for RecordingHook {
        fn name(&self) -> &str {
            "recorder"
        }

        fn install(&self, context: &SystemContext) -> Result<(), HookError> {
            for name in names::ALL {
                let log = Rc::clone(&self.log);
                context.signals.add(
                    *name,
                    move |_: &SignalPayload, _: &[String]| {
                        log.borrow_mut().push((*name).to_string());
                        Ok(())
                    },
                    Vec::new(),
                );
            }
            Ok(())
        }
    }

    struct BrokenHook;

    impl SystemHook for BrokenHook {
        fn name(&self) -> &str {
            "broken"
        }

        fn install(&self, _context: &SystemContext) -> Result<(), HookError> {
            Err(HookError::new("unknown signal"))
        }
    }

    fn recording_system(log: &Log) -> System {
        let hooks: Vec<Box<dyn SystemHook>> = vec![Box::new(RecordingHook {
            log: Rc::clone(log),
        })];
        System::new(SystemConfig::default(), &hooks).expect("system")
    }

    #[test]
    fn lifecycle_signals_surround_game_calls() {
        let log: Log = Rc::default();
        let mut system = recording_system(&log);
        system
            .start(|_| Ok(ScriptedGame::boxed(&log, false)))
            .expect("start");
        system.end().expect("end");

        assert_eq!(
            *log.borrow(),
            vec![
                "after_system_init",
                "before_system_start",
                "after_system_start",
                "before_game_start",
                "start_game",
                "after_game_start",
                "before_game_run",
                "run_game",
                "after_game_run",
                "before_system_end",
                "before_game_end",
                "end_game",
                "after_game_end",
                "after_system_end",
            ]
        );
    }

    #[test]
    fn end_after_failed_resolve_is_safe_and_idempotent() {
        let log: Log = Rc::default();
        let mut system = recording_system(&log);
        let result = system.start(|_| Err(GameError::Message("no such game".to_string())));
        assert!(matches!(result, Err(SystemError::ResolveGame(_))));
        assert!(system.game().is_none());

        system.end().expect("end");
        system.end().expect("second end");
        let ends = log
            .borrow()
            .iter()
            .filter(|name| name.as_str() == names::AFTER_SYSTEM_END)
            .count();
        assert_eq!(ends, 1);
    }

    #[test]
    fn failed_run_still_lets_game_end() {
        let log: Log = Rc::default();
        let mut system = recording_system(&log);
        let result = system.start(|_| Ok(ScriptedGame::boxed(&log, true)));
        assert!(matches!(result, Err(SystemError::Game { stage: "run", .. })));

        system.end().expect("end");
        assert!(log.borrow().iter().any(|entry| entry == "end_game"));
        assert!(!log.borrow().iter().any(|entry| entry == names::AFTER_GAME_RUN));
    }

    #[test]
    fn hook_install_failure_is_fatal() {
        let hooks: Vec<Box<dyn SystemHook>> = vec![Box::new(BrokenHook)];
        let result = System::new(SystemConfig::default(), &hooks);
        assert!(matches!(result, Err(SystemError::Hook { name, .. }) if name == "broken"));
    }

    #[test]
    fn second_start_is_rejected() {
        let log: Log = Rc::default();
        let mut system = recording_system(&log);
        system
            .start(|_| Ok(ScriptedGame::boxed(&log, false)))
            .expect("start");
        assert!(matches!(
            system.start(|_| Ok(ScriptedGame::boxed(&log, false))),
            Err(SystemError::AlreadyStarted)
        ));
    }
}
