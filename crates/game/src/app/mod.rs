mod bootstrap;
mod cli;
mod debug_hook;
mod directory_game;
mod loop_runner;
mod manifest;

pub(crate) use loop_runner::run;
