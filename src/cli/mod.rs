//! Command-line interface for the Vastra rental backend.
//!
//! The binary has one real job, running the API server; `init` exists so
//! a fresh install can write a config file to edit.

use clap::{Parser, Subcommand};

/// Vastra - clothing rental backend
#[derive(Parser)]
#[command(name = "vastra")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the API server (default when no command is given)
    Serve,

    /// Create a default config file if none exists
    #[command(alias = "--init")]
    Init,
}
