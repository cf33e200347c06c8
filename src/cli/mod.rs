//! Command-line interface for SVCA

mod commands;

use clap::{Parser, Subcommand};

/// SVCA - civic occurrence management backend
#[derive(Parser)]
#[command(name = "svca")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API server (default)
    #[command(alias = "daemon")]
    Serve,

    /// Apply migrations, reference data and the bootstrap administrator
    Seed,

    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// Create an administrator account
    CreateAdmin {
        /// Display name
        #[arg(long)]
        name: String,

        /// Login email
        #[arg(long)]
        email: String,

        /// Initial password
        #[arg(long)]
        password: String,
    },
}

pub use commands::*;
