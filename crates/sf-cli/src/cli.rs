//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Sugar-free habit tracker.
///
/// Records daily check-ins, computes streaks, runs fixed-length challenges,
/// and asks a generative-text service for no-added-sugar recipes.
#[derive(Debug, Parser)]
#[command(name = "sf", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Register a user, or update an existing profile.
    Start {
        #[command(flatten)]
        user: UserArg,

        /// Display name.
        #[arg(long)]
        name: Option<String>,

        /// Day-boundary offset in minutes east of UTC.
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        utc_offset: i32,
    },

    /// Record today's check-in.
    Checkin {
        #[command(flatten)]
        user: UserArg,

        /// The day was sugar-free.
        #[arg(long, conflicts_with = "slip", required_unless_present = "slip")]
        success: bool,

        /// The day had a slip-up.
        #[arg(long)]
        slip: bool,

        /// Attach a note to the check-in.
        #[arg(long)]
        note: Option<String>,
    },

    /// Show streak and challenge statistics.
    Stats {
        #[command(flatten)]
        user: UserArg,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Manage fixed-length challenges.
    Challenge {
        #[command(subcommand)]
        action: ChallengeAction,
    },

    /// Manage progress notes.
    Note {
        #[command(subcommand)]
        action: NoteAction,
    },

    /// Suggest a no-added-sugar recipe from ingredients.
    Recipe {
        #[command(flatten)]
        user: UserArg,

        /// Comma-separated ingredients to cook with.
        #[arg(long)]
        ingredients: String,
    },

    /// Show database location and recent check-ins per user.
    Status,
}

/// Challenge subcommands.
#[derive(Debug, Subcommand)]
pub enum ChallengeAction {
    /// Start a new challenge, replacing any active one.
    Start {
        #[command(flatten)]
        user: UserArg,

        /// Challenge length in days.
        #[arg(long)]
        days: u32,
    },

    /// Show the current challenge.
    Status {
        #[command(flatten)]
        user: UserArg,
    },

    /// Abandon the active challenge.
    Abandon {
        #[command(flatten)]
        user: UserArg,
    },
}

/// Note subcommands.
#[derive(Debug, Subcommand)]
pub enum NoteAction {
    /// Add a progress note.
    Add {
        #[command(flatten)]
        user: UserArg,

        /// The note text.
        text: String,
    },

    /// List recent notes, newest first.
    List {
        #[command(flatten)]
        user: UserArg,

        /// Maximum number of notes to show.
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

/// The user every operation acts on.
#[derive(Debug, Args)]
pub struct UserArg {
    /// Stable user identifier from the chat transport.
    #[arg(long)]
    pub user: String,
}
