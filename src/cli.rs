//! Command-line interface for llm2048.

use clap::{Parser, Subcommand};
use llm2048::StrategyId;
use std::path::PathBuf;

/// llm2048 - 2048 played by a local language model
#[derive(Parser, Debug)]
#[command(name = "llm2048")]
#[command(about = "Watch a local LLM play 2048", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, global = true, default_value = "llm2048.toml")]
    pub config: PathBuf,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Let the AI play one or more games
    Play {
        /// Model name (overrides config and LLM2048_MODEL)
        #[arg(short, long)]
        model: Option<String>,

        /// Prompt strategy
        #[arg(short, long)]
        strategy: Option<StrategyId>,

        /// Model server address (overrides config and OLLAMA_HOST)
        #[arg(long)]
        base_url: Option<String>,

        /// Number of games to play
        #[arg(short, long, default_value = "1")]
        games: u32,

        /// Pause between moves in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Stop each game after this many moves
        #[arg(long)]
        max_moves: Option<u32>,

        /// Play uniformly random legal moves instead of asking a model
        #[arg(long)]
        random: bool,

        /// Print a JSON summary per game instead of text
        #[arg(long)]
        json: bool,
    },

    /// List models installed on the server
    Models {
        /// Model server address (overrides config and OLLAMA_HOST)
        #[arg(long)]
        base_url: Option<String>,
    },
}
