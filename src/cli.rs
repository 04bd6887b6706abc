//! CLI definitions for the Monica bridge.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Monica bridge CLI.
#[derive(Parser)]
#[command(name = "monica-bridge")]
#[command(about = "Bridge between an AI coding studio chat and per-project context storage")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (defaults to ~/.monica-bridge/config.toml)
    #[arg(short, long, global = true, env = "MONICA_BRIDGE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run as the browser extension's native messaging host on stdio
    Host,

    /// Process AI output offline: apply updates and changelog entries, run actions
    Scan {
        #[command(flatten)]
        project: ProjectArgs,

        /// File holding the AI output ("-" or omitted for stdin)
        file: Option<PathBuf>,

        /// Skip actions, only apply updates and changelog entries
        #[arg(long)]
        no_actions: bool,
    },

    /// Print the saved conversation state
    Show {
        #[command(flatten)]
        project: ProjectArgs,
    },

    /// Delete the saved context
    Clear {
        #[command(flatten)]
        project: ProjectArgs,
    },

    /// Print the new-session prompt built from the saved context
    Prompt {
        #[command(flatten)]
        project: ProjectArgs,
    },

    /// Print the accumulated changelog
    Changelog {
        #[command(flatten)]
        project: ProjectArgs,

        /// Clear the changelog after printing it
        #[arg(long)]
        take: bool,
    },
}

/// Which project a command applies to.
#[derive(Args)]
#[group(required = true, multiple = false)]
pub(crate) struct ProjectArgs {
    /// Project identifier
    #[arg(short, long)]
    pub project: Option<String>,

    /// Studio URL to derive the project identifier from
    #[arg(short, long)]
    pub url: Option<String>,
}
