use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "snippetbox", version, about = "Manage snippets stored in the snippetbox database")]
pub struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, env = "CONFIG_PATH", default_value = "config.yaml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create the snippets table if it does not exist.
    InitSchema,
    /// Store a new snippet and print its id.
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
        /// Days until the snippet expires.
        #[arg(long, default_value_t = 7)]
        expires: i32,
    },
    /// Print a live snippet by id.
    Show { id: i64 },
    /// Print the ten most recent live snippets.
    Latest,
}
