//! CLI Module
//!
//! Command-line front-end for trying commands without a host.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Sonara - describe the sound you want, get EQ, compression and reverb
#[derive(Parser, Debug)]
#[command(name = "sonara")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Map a command onto effect parameters
    #[command(name = "map")]
    Map {
        /// The request, e.g. "make it warmer"
        text: String,

        /// Base intensity (0.0 to 2.0)
        #[arg(short, long)]
        intensity: Option<f32>,

        /// Print parameters and changes as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the configured rewriter on a request, then map the result
    #[command(name = "rewrite")]
    Rewrite {
        /// The request to rewrite
        text: String,
    },

    /// List the vocabulary of every category
    #[command(name = "keywords")]
    Keywords,
}
