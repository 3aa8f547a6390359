// SPDX-License-Identifier: AGPL-3.0-or-later
//! fernfs CLI
//!
//! Drives a sandboxed storage adapter from the command line.

mod commands;
mod config;

use clap::{Parser, Subcommand};
use config::{Config, LogFormat, LoggingConfig};
use fernfs_core::FernError;
use fernfs_providers::create_adapter;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

#[derive(Parser)]
#[command(name = "fernfs")]
#[command(author, version, about = "fernfs - sandboxed file storage", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Base directory, overriding the configured one
    #[arg(short = 'b', long, global = true)]
    base_dir: Option<String>,

    /// Log level (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log line format on stderr: json or text
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List directory contents
    #[command(alias = "readdir")]
    Ls {
        /// Directory to list
        #[arg(default_value = ".")]
        path: String,

        /// Long format with details
        #[arg(short, long)]
        long: bool,

        /// Show all files including hidden
        #[arg(short, long)]
        all: bool,

        /// Human-readable sizes
        #[arg(short = 'H', long)]
        human: bool,

        /// Print entries as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show file or directory information
    Stat {
        /// Path to inspect
        path: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Display file contents
    #[command(alias = "read")]
    Cat {
        /// File to display
        path: String,

        /// Byte range, e.g. `bytes=0-99` (inclusive) or `bytes=100-`
        #[arg(short, long)]
        range: Option<String>,
    },

    /// Replace a file with data from stdin or a local file
    Write {
        /// Destination path
        path: String,

        /// Read content from this local file instead of stdin
        #[arg(short, long)]
        from: Option<PathBuf>,

        /// Octal permission bits (default 644)
        #[arg(short, long)]
        mode: Option<String>,
    },

    /// Create directories
    Mkdir {
        /// Directory path(s) to create
        #[arg(required = true)]
        paths: Vec<String>,

        /// Octal permission bits (default 755)
        #[arg(short, long)]
        mode: Option<String>,
    },

    /// Remove empty directories
    Rmdir {
        /// Directory path(s) to remove
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Remove files
    #[command(alias = "unlink")]
    Rm {
        /// File path(s) to remove
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Move or rename files and directories
    #[command(alias = "rename")]
    Mv {
        /// Source path
        source: String,

        /// Destination path
        dest: String,
    },

    /// Change permission bits
    Chmod {
        /// Octal mode, e.g. 600
        mode: String,

        /// Path(s) to change
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

/// Map an error onto a process exit code, following its HTTP classification.
fn exit_code(err: &FernError) -> ExitCode {
    match err.http_status() {
        404 => ExitCode::from(2),
        400 => ExitCode::from(3),
        _ => ExitCode::FAILURE,
    }
}

fn init_logging(logging: &LoggingConfig) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(dir) = cli.base_dir {
        config.storage.base_path = dir;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }

    init_logging(&config.logging);

    let adapter = match create_adapter(&config.storage) {
        Ok(adapter) => adapter,
        Err(e) => {
            eprintln!("Error: {e}");
            return exit_code(&e);
        }
    };
    info!(
        adapter = adapter.id(),
        backend = adapter.display_name(),
        base_path = %config.storage.base_path,
        "storage adapter ready"
    );

    let adapter = adapter.as_ref();
    let result = match cli.command {
        Commands::Ls { path, long, all, human, json } => {
            commands::ls(adapter, &path, long, all, human, json).await
        }
        Commands::Stat { path, json } => {
            commands::stat(adapter, &path, json).await
        }
        Commands::Cat { path, range } => {
            commands::cat(adapter, &path, range.as_deref()).await
        }
        Commands::Write { path, from, mode } => {
            commands::write(adapter, &path, from.as_deref(), mode.as_deref()).await
        }
        Commands::Mkdir { paths, mode } => {
            commands::mkdir(adapter, &paths, mode.as_deref()).await
        }
        Commands::Rmdir { paths } => {
            commands::rmdir(adapter, &paths).await
        }
        Commands::Rm { paths } => {
            commands::rm(adapter, &paths).await
        }
        Commands::Mv { source, dest } => {
            commands::mv(adapter, &source, &dest).await
        }
        Commands::Chmod { mode, paths } => {
            commands::chmod(adapter, &mode, &paths).await
        }
    };

    if let Err(e) = adapter.close().await {
        tracing::warn!(error = %e, "failed to close storage adapter");
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            exit_code(&e)
        }
    }
}
