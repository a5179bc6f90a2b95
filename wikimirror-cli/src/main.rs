//! wikimirror: mirror wiki pages, templates and files between MediaWiki sites.
//!
//! # Usage
//!
//! ```text
//! wikimirror sync <CONFIG>... [-f] [-t] [-d] [-u] [-e <DIR>] [--dry-run] [--json]
//! wikimirror validate <CONFIG>...
//! ```

mod budget;
mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{sync::SyncArgs, validate::ValidateArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "wikimirror",
    version,
    about = "Mirror pages, templates and files from one wiki to another",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Mirror the content described by one or more configuration files.
    Sync(SyncArgs),

    /// Check configuration files and modification patterns offline.
    Validate(ValidateArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();
    match cli.command {
        Commands::Sync(args) => args.run(),
        Commands::Validate(args) => args.run(),
    }
}

/// Log records (including those from `log`-based crates) go to stderr so
/// `--json` output stays parseable.
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
