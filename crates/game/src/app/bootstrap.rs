use std::io;
use std::path::PathBuf;

use questy_engine::{AssetLoading, LoopConfig, SystemConfig, SystemHook};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::cli::Cli;
use super::debug_hook::{DebugSpecError, TraceHook};

pub(crate) struct AppWiring {
    pub(crate) game_dir: PathBuf,
    pub(crate) config: SystemConfig,
    pub(crate) hooks: Vec<Box<dyn SystemHook>>,
}

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error("no GAME_DIR has been specified, quitting")]
    MissingGameDir,
    #[error(transparent)]
    DebugSpec(#[from] DebugSpecError),
}

pub(crate) fn build_app(cli: Cli) -> Result<AppWiring, BootstrapError> {
    init_tracing(cli.log_level(), !cli.no_color);
    info!("=== Questy Startup ===");

    let config = system_config(&cli);
    let hooks = debug_hooks(&cli)?;
    let game_dir = cli.game_dir.ok_or(BootstrapError::MissingGameDir)?;

    Ok(AppWiring {
        game_dir,
        config,
        hooks,
    })
}

pub(crate) fn system_config(cli: &Cli) -> SystemConfig {
    SystemConfig {
        display: LoopConfig {
            mode: cli.screen_mode(),
            border: !cli.no_border,
            hardware_acceleration: !cli.no_hardware_acceleration,
            double_buffer: !cli.no_double_buffer,
            ..LoopConfig::default()
        },
        asset_loading: if cli.eager {
            AssetLoading::Eager
        } else {
            AssetLoading::Lazy
        },
        debug_args: cli.debug_args.clone(),
    }
}

fn debug_hooks(cli: &Cli) -> Result<Vec<Box<dyn SystemHook>>, DebugSpecError> {
    let trace = TraceHook::from_sources(
        cli.debug_string.as_deref(),
        cli.debug_file.as_deref(),
        cli.debug_args.clone(),
    )?;
    Ok(trace
        .into_iter()
        .map(|hook| Box::new(hook) as Box<dyn SystemHook>)
        .collect())
}

fn init_tracing(default_level: &str, ansi: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(ansi)
        .with_writer(io::stderr)
        .compact()
        .init();
}
