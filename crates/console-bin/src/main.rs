//! Mall Console - command-line front end for login, session management, and
//! authenticated backend access.

mod app;
mod commands;
mod error;
mod intents;
mod malls;

#[cfg(test)]
mod testing;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use console_config_and_utils::{init_logging, Config, Paths};
use tracing::{debug, error};

use crate::app::Console;
use crate::error::CliResult;

/// Mall console command-line interface.
#[derive(Parser)]
#[command(name = "mall-console")]
#[command(about = "Administrative console for the mall platform")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error). Defaults to the configured level
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Base directory for runtime files (config, session, logs). Defaults to ~/.mall-console
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    /// Mirror log output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with a one-time code sent by email
    Login {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
    /// Show the stored session
    Status,
    /// Exchange the refresh token for a new session
    Refresh,
    /// Clear the stored session
    Logout,
    /// GET a backend path with the current session and print the response
    Get {
        /// Path relative to the API base URL, e.g. /v1/malls
        path: String,
    },
    /// List malls
    Malls {
        /// Zero-based page number
        #[arg(long, default_value_t = 0)]
        page: u32,

        /// Page size
        #[arg(long, default_value_t = 10)]
        size: u32,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    paths.ensure_dirs()?;
    let config = Config::load(&paths)?;

    let level = cli.log_level.unwrap_or_else(|| config.log_level.clone());
    init_logging(&level, &paths, cli.verbose);
    debug!(base_dir = %paths.base_dir().display(), "Console starting");

    let console = Console::new(config, &paths)?;

    match run(&console, cli.command).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("{}", e.user_message());
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run(console: &Console, command: Commands) -> CliResult<()> {
    let mut out = std::io::stdout();

    match command {
        Commands::Login { email } => commands::login::run(console, &email, &mut out).await,
        Commands::Status => commands::session::status(console, &mut out),
        Commands::Refresh => commands::session::refresh(console, &mut out).await,
        Commands::Logout => commands::session::logout(console, &mut out),
        Commands::Get { path } => commands::fetch::get(console, &path, &mut out).await,
        Commands::Malls { page, size } => commands::fetch::malls(console, page, size, &mut out).await,
    }
}
