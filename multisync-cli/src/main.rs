//! multisync: keep several folders mirrored.
//!
//! # Usage
//!
//! ```text
//! multisync profile init <name> <root> <root>...
//! multisync profile list
//! multisync profile show <name>
//! multisync profile add-root <name> <path>
//! multisync profile set <name> [--ranking <r>] [--tolerance-ms <ms>] [--backup-dir <dir> | --no-backup]
//! multisync profile remove <name>
//! multisync rule add|remove|list <profile> --kind filters|blacklist [<pattern>]
//! multisync sync <profile> [--dry-run] [--json] [--priority <p>]
//! multisync watch <profile>
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{profile::ProfileCommand, rule::RuleCommand, sync::SyncArgs, watch::WatchArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "multisync",
    version,
    about = "Keep any number of folders mirrored with each other",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create, inspect and delete sync profiles.
    Profile {
        #[command(subcommand)]
        command: ProfileCommand,
    },

    /// Edit a profile's filter and blacklist patterns.
    Rule {
        #[command(subcommand)]
        command: RuleCommand,
    },

    /// Mirror a profile's roots once.
    Sync(SyncArgs),

    /// Mirror a profile's roots now and after every change, until ctrl-c.
    Watch(WatchArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Profile { command } => commands::profile::run(command),
        Commands::Rule { command } => commands::rule::run(command),
        Commands::Sync(args) => args.run(),
        Commands::Watch(args) => args.run(),
    }
}
