//! CLI command definitions using clap.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// standup - asynchronous stand-up meetings
#[derive(Parser, Debug)]
#[command(name = "standup")]
#[command(version)]
#[command(about = "Runs recurring team stand-ups asynchronously")]
#[command(
    long_about = "Reminds each participant at their meeting's local time, collects their answers one question at a time, and publishes a consolidated brief to the team channel."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the engine and the HTTP API
    Serve {
        /// Configuration file (TOML); defaults apply when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Validate a configuration file and print the effective settings
    CheckConfig {
        /// Configuration file (TOML)
        #[arg(short, long)]
        config: PathBuf,
    },
}
