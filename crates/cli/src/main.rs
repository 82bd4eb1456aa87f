//! reagent CLI — the main entry point.
//!
//! Commands:
//! - `chat`    — One-shot or interactive conversation with the agent
//! - `tools`   — List the built-in tools
//! - `config`  — Print the effective configuration or a starter file

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reagent_config::AgentMode;

mod commands;

#[derive(Parser)]
#[command(
    name = "reagent",
    about = "reagent — a ReAct agent for the terminal",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the agent
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Override the configured mode (chat, react or auto)
        #[arg(long)]
        mode: Option<AgentMode>,

        /// Read configuration from this file instead of ~/.reagent/config.toml
        #[arg(long, env = "REAGENT_CONFIG")]
        config: Option<PathBuf>,
    },

    /// List the built-in tools
    Tools,

    /// Print the effective configuration (secrets redacted)
    Config {
        /// Print a starter config file instead
        #[arg(long)]
        default: bool,

        #[arg(long, env = "REAGENT_CONFIG")]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Chat {
            message,
            mode,
            config,
        } => commands::chat::run(message, mode, config, cli.verbose).await?,
        Commands::Tools => commands::tools::run()?,
        Commands::Config { default, config } => commands::config_cmd::run(default, config)?,
    }

    Ok(())
}
