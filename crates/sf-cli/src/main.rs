use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use sf_cli::commands::{challenge, checkin, note, recipe, start, stats, status};
use sf_cli::{ChallengeAction, Cli, Commands, Config, NoteAction};
use sf_core::{SystemClock, Tracker};

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(sf_db::Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = sf_db::Database::open(&config.database_path).context("failed to open database")?;
    Ok((db, config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match &cli.command {
        Some(Commands::Start {
            user,
            name,
            utc_offset,
        }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            let tracker = Tracker::new(db, SystemClock);
            start::run(&mut out, &tracker, &user.user, name.clone(), *utc_offset)?;
        }
        Some(Commands::Checkin {
            user,
            success,
            slip: _,
            note,
        }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            let tracker = Tracker::new(db, SystemClock);
            checkin::run(&mut out, &tracker, &user.user, *success, note.clone())?;
        }
        Some(Commands::Stats { user, json }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            let tracker = Tracker::new(db, SystemClock);
            stats::run(&mut out, &tracker, &user.user, *json)?;
        }
        Some(Commands::Challenge { action }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            let tracker = Tracker::new(db, SystemClock);
            match action {
                ChallengeAction::Start { user, days } => {
                    challenge::start(&mut out, &tracker, &user.user, *days)?;
                }
                ChallengeAction::Status { user } => {
                    challenge::status(&mut out, &tracker, &user.user)?;
                }
                ChallengeAction::Abandon { user } => {
                    challenge::abandon(&mut out, &tracker, &user.user)?;
                }
            }
        }
        Some(Commands::Note { action }) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            match action {
                NoteAction::Add { user, text } => {
                    note::add(&mut out, &mut db, &user.user, text)?;
                }
                NoteAction::List { user, limit } => {
                    note::list(&mut out, &db, &user.user, *limit)?;
                }
            }
        }
        Some(Commands::Recipe { user, ingredients }) => {
            let (mut db, config) = open_database(cli.config.as_deref())?;
            recipe::run(
                &mut out,
                &mut db,
                config.api_key.as_deref(),
                config.api_url.as_deref(),
                config.model.as_deref(),
                &user.user,
                ingredients,
            )?;
        }
        Some(Commands::Status) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            status::run(&mut out, &db, &config.database_path)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            writeln!(out)?;
        }
    }

    Ok(())
}
