//! personal-ops: notes, todos and a focus timer from the terminal.
//!
//! Every invocation is one short-lived process that reads a single JSON
//! document, applies one command, and (for mutations) writes the whole
//! document back.
//!
//! # Architecture
//!
//! - **Persistent store** ([`core::store`]): whole-document `load` / `save`,
//!   atomic replace on write, and a `transaction` that serialises concurrent
//!   invocations on an advisory lock file.
//! - **Command layer** ([`plugins`]): one subsystem per domain (`note`, `todo`,
//!   `timer`) that validates a request, computes the state transition, and
//!   renders the result.
//!
//! # Examples
//!
//! ```bash
//! ops note add "Read 10 pages" --tags learning,reading
//! ops note list --tag learning
//! ops todo add "Ship CLI MVP" --due 2026-03-01
//! ops todo done 1
//! ops timer start "Deep work" --minutes 50
//! ops timer status
//! ```
//!
//! # Crate Structure
//!
//! - [`core`]: configuration, logging, schema, migrations, store
//! - [`plugins`]: domain subsystems

pub mod core;
pub mod plugins;

use crate::core::config::OpsConfig;
use crate::core::error::OpsError;
use crate::core::logging;
use crate::core::store::Store;
use crate::core::time::SystemClock;
use clap::{Parser, Subcommand};
use plugins::{note, timer, todo};
use std::path::PathBuf;

pub const OPS_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[clap(
    name = "ops",
    version = env!("CARGO_PKG_VERSION"),
    about = "Personal Ops CLI: manage notes, tasks, and a focus timer from your terminal.",
    after_help = "Examples:\n  ops note add \"Read 10 pages\" --tags learning,reading\n  ops note list --tag learning\n  ops todo add \"Ship CLI MVP\" --due 2026-03-01\n  ops todo done 1\n  ops timer start \"Deep work\" --minutes 50\n  ops timer status\n\nRun 'ops <domain> --help' for domain-specific help."
)]
pub struct Cli {
    /// Path to the state document (overrides ops.toml and OPS_DATA_PATH).
    #[clap(long, global = true, value_name = "PATH")]
    pub data: Option<PathBuf>,
    /// Increase diagnostic output on stderr (-v info, -vv debug).
    #[clap(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create and view notes
    #[clap(name = "note", visible_alias = "n")]
    Note(note::NoteCli),

    /// Create and track tasks
    #[clap(name = "todo", visible_alias = "t")]
    Todo(todo::TodoCli),

    /// Start/check focus timer
    #[clap(name = "timer")]
    Timer(timer::TimerCli),

    /// Show version information
    #[clap(name = "version")]
    Version,
}

/// Execute a parsed command line against the configured store.
pub fn run(cli: Cli) -> Result<(), OpsError> {
    logging::init(cli.verbose);

    if let Command::Version = cli.command {
        println!("v{}", OPS_VERSION);
        return Ok(());
    }

    let cwd = std::env::current_dir()?;
    let config = OpsConfig::load(&cwd, cli.data.as_deref())?;
    tracing::debug!(data_path = %config.data_path.display(), "resolved configuration");
    let store = Store::from_config(&config);
    let clock = SystemClock;

    match cli.command {
        Command::Note(note_cli) => note::run_note_cli(&store, &clock, note_cli),
        Command::Todo(todo_cli) => todo::run_todo_cli(&store, &clock, todo_cli),
        Command::Timer(timer_cli) => timer::run_timer_cli(&store, &clock, timer_cli),
        Command::Version => Ok(()),
    }
}
