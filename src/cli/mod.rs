//! Command-line interface.

pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "loradex", version, about = "Overlay catalog: sync, search, recommend")]
pub struct Cli {
    /// Path to config file (overrides the global/project layering)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the overlay manifest exported by the generation backend
    #[arg(long, global = true)]
    pub manifest: Option<PathBuf>,

    /// Machine-readable JSON output
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all logging
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Synchronize the local catalog with the backend listing
    Sync,

    /// Search overlays by name, description, or trigger words
    Search {
        query: String,

        /// Restrict to one category
        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        limit: Option<usize>,
    },

    /// Recommend overlays for a generation prompt
    Suggest {
        /// The prompt; multiple words are joined
        #[arg(required = true)]
        prompt: Vec<String>,

        #[arg(long)]
        limit: Option<usize>,
    },

    /// Validate an overlay combination ("name" or "name:weight" per item)
    Validate {
        #[arg(required = true)]
        selections: Vec<String>,

        /// Apply a weight preset first: subtle, balanced, strong, extreme
        #[arg(long)]
        preset: Option<String>,
    },

    /// Show one overlay's catalog entry
    Info { name: String },

    /// Catalog totals by category and top trigger words
    Summary,

    /// Override derived metadata for one overlay
    Tag {
        name: String,

        /// Comma-separated trigger words
        #[arg(long)]
        triggers: Option<String>,

        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        description: Option<String>,
    },
}
