//! CLI for the feedpoll poller.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use feedpoll_core::config;
use std::path::PathBuf;

use commands::{run_list_clients, run_poller, RunOptions};

/// Top-level CLI for the feedpoll poller.
#[derive(Debug, Parser)]
#[command(name = "feedpoll")]
#[command(about = "feedpoll: keep polling a flaky, rate-limited API", long_about = None)]
pub struct Cli {
    /// Show DEBUG logging.
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Log to stderr instead of the state-dir log file.
    #[arg(long, global = true)]
    pub stderr: bool,

    /// Use this config file instead of ~/.config/feedpoll/config.toml.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Fetch URL once, or keep polling it with --loop.
    Run {
        /// HTTP/HTTPS URL to poll.
        url: String,

        /// File replaced with every successful response body.
        #[arg(long, default_value = "feed.bin", value_name = "PATH")]
        output: PathBuf,

        /// Poll continuously with this period in seconds (0 = fetch once).
        #[arg(long = "loop", default_value = "0", value_name = "SECS")]
        loop_secs: u64,

        /// JSON file describing several clients (keys and transports).
        #[arg(long, value_name = "FILE", conflicts_with = "tunnels")]
        clients: Option<PathBuf>,

        /// Directory of WireGuard configs; one client per tunnel.
        #[arg(long, value_name = "DIR")]
        tunnels: Option<PathBuf>,
    },

    /// Validate a clients file and list its clients (keys are never shown).
    Clients {
        /// Path to the clients JSON file.
        path: PathBuf,
    },
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let cfg = match &self.config {
            Some(path) => config::load_from_path(path)?,
            None => config::load_or_init()?,
        };
        tracing::debug!("loaded config: {:?}", cfg);

        match self.command {
            CliCommand::Run {
                url,
                output,
                loop_secs,
                clients,
                tunnels,
            } => run_poller(
                &cfg,
                &RunOptions {
                    url,
                    output,
                    loop_secs,
                    clients,
                    tunnels,
                },
            )?,
            CliCommand::Clients { path } => run_list_clients(&cfg, &path)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
