use std::process::ExitCode;

use clap::Parser;
use questy_engine::{Game, GameError, System};
use tracing::error;

use super::bootstrap::{build_app, BootstrapError};
use super::cli::Cli;
use super::directory_game::DirectoryGame;

const USAGE_ERROR: u8 = 1;

pub(crate) fn run() -> ExitCode {
    let app = match build_app(Cli::parse()) {
        Ok(app) => app,
        Err(BootstrapError::MissingGameDir) => {
            eprintln!("questy: error: {}", BootstrapError::MissingGameDir);
            return ExitCode::from(USAGE_ERROR);
        }
        Err(err) => {
            error!(error = %err, "startup_failed");
            return ExitCode::FAILURE;
        }
    };

    let mut system = match System::new(app.config, &app.hooks) {
        Ok(system) => system,
        Err(err) => {
            error!(error = %err, "startup_failed");
            return ExitCode::FAILURE;
        }
    };

    let game_dir = app.game_dir;
    let started = system.start(|_| {
        DirectoryGame::open(&game_dir)
            .map(|game| Box::new(game) as Box<dyn Game>)
            .map_err(GameError::from)
    });
    let ended = system.end();

    if let Err(err) = started {
        error!(error = %err, "game_failed");
        return ExitCode::FAILURE;
    }
    if let Err(err) = ended {
        error!(error = %err, "shutdown_failed");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
