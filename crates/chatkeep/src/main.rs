// SPDX-FileCopyrightText: 2026 Chatkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chatkeep - WhatsApp chatbot backend.
//!
//! This is the binary entry point: the webhook server plus checkpoint
//! maintenance commands.

mod amnesia;
mod history;
mod serve;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Chatkeep - debounced WhatsApp conversations with durable checkpoints.
#[derive(Parser, Debug)]
#[command(name = "chatkeep", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the webhook server and the debounce pipeline.
    Serve,
    /// List the checkpoints of one conversation thread, newest first.
    History {
        /// Thread id, `{instance}#{phone}` for WhatsApp conversations.
        #[arg(long)]
        thread: String,
        /// Checkpoint namespace (root namespace when omitted).
        #[arg(long, default_value = "")]
        ns: String,
        /// Maximum number of checkpoints to show.
        #[arg(long)]
        limit: Option<usize>,
        /// Print one JSON object per line.
        #[arg(long)]
        json: bool,
    },
    /// Forget conversation state: one thread, or every thread.
    Amnesia {
        /// Only clear this thread.
        #[arg(long)]
        thread: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => chatkeep_config::load_and_validate_path(path),
        None => chatkeep_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            chatkeep_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.log.level);

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::History {
            thread,
            ns,
            limit,
            json,
        }) => history::run_history(&config, &thread, &ns, limit, json).await,
        Some(Commands::Amnesia { thread }) => {
            amnesia::run_amnesia(&config, thread.as_deref()).await
        }
        None => {
            println!("chatkeep: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber with the given log level.
///
/// `RUST_LOG` takes precedence over the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("chatkeep={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
