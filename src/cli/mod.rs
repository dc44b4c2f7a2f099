//! CLI Module
//!
//! Command-line interface for voicebatch using Clap v4.

mod commands;

pub use commands::load_config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;

/// voicebatch - clone voices from samples and narrate a text table with them
#[derive(Parser, Debug)]
#[command(name = "voicebatch")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable debug mode (creates log files in .voicebatch/logs/)
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the upload/generate page (default)
    Serve {
        /// Address to bind (overrides server.bind)
        #[arg(long)]
        bind: Option<String>,

        /// Port to listen on (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Enroll the given samples and generate every text once, without the web page
    Run {
        /// Voice sample files; the owner id is the file name without its extension
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Emotion tag (or "none")
        #[arg(short, long, default_value = "none")]
        emotion: String,

        /// Speaking rate change in percent, -50 to 50
        #[arg(
            short,
            long,
            default_value_t = 0,
            allow_hyphen_values = true,
            value_parser = clap::value_parser!(i32).range(-50..=50)
        )]
        rate: i32,
    },

    /// Initialize configuration
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show configuration
    Config {
        /// Show full configuration including secrets
        #[arg(short, long)]
        show_secrets: bool,
    },

    /// List enrolled voices from the result log
    Voices,

    /// Log management operations
    Logs {
        #[command(subcommand)]
        operation: LogCommands,
    },

    /// Manage the API key in the OS keyring
    Keyring {
        #[command(subcommand)]
        operation: KeyringCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum LogCommands {
    /// Show log file location and status
    Status,
    /// Clean up old log files
    Clean {
        /// Maximum age in days (default: 7)
        #[arg(short = 'a', long, default_value = "7")]
        days: u64,
    },
}

#[derive(Subcommand, Debug)]
pub enum KeyringCommands {
    /// Store the API key in the OS keyring
    Set {
        /// API key to store
        api_key: String,
    },
    /// Show whether a key is stored (masked)
    Get,
    /// Delete the stored API key
    Delete,
}

/// Main CLI entry point
pub async fn run(cli: Cli, config: Config) -> Result<()> {
    if cli.debug {
        tracing::info!("Debug mode enabled");
    }

    match cli.command {
        None => commands::cmd_serve(config, None, None).await,
        Some(Commands::Serve { bind, port }) => commands::cmd_serve(config, bind, port).await,
        Some(Commands::Run {
            files,
            emotion,
            rate,
        }) => commands::cmd_run(&config, files, &emotion, rate).await,
        Some(Commands::Init { force }) => commands::cmd_init(force),
        Some(Commands::Config { show_secrets }) => commands::cmd_config(&config, show_secrets),
        Some(Commands::Voices) => commands::cmd_voices(&config),
        Some(Commands::Logs { operation }) => commands::cmd_logs(operation),
        Some(Commands::Keyring { operation }) => commands::cmd_keyring(operation),
    }
}
