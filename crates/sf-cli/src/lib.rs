//! Habit tracker CLI library.
//!
//! This crate provides the command-line transport for the habit tracker. It
//! maps subcommands onto the engine operations in `sf-core` and renders the
//! results for a terminal.

mod cli;
pub mod commands;
mod config;

pub use cli::{ChallengeAction, Cli, Commands, NoteAction, UserArg};
pub use config::Config;
