//! llm2048 - Unified CLI
//!
//! Plays 2048 with a local language model and lists installed models.

#![warn(missing_docs)]

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use llm2048::{
    AppConfig, Autoplay, ChatModel, DecisionCache, Game, GameEvent, GameSummary, LlmClient,
    LlmOracle, MoveOracle, Outcome, RandomOracle,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Play {
            model,
            strategy,
            base_url,
            games,
            delay_ms,
            max_moves,
            random,
            json,
        } => {
            let mut config = load_config(&cli.config)?;
            if let Some(model) = model {
                config.set_model(model);
            }
            if let Some(strategy) = strategy {
                config.set_strategy(strategy);
            }
            if let Some(base_url) = base_url {
                config.set_base_url(base_url);
            }
            if let Some(delay_ms) = delay_ms {
                config.set_move_delay_ms(delay_ms);
            }
            if max_moves.is_some() {
                config.set_max_moves(max_moves);
            }
            config.validate()?;
            run_play(config, games, random, json).await
        }
        Command::Models { base_url } => {
            let mut config = load_config(&cli.config)?;
            if let Some(base_url) = base_url {
                config.set_base_url(base_url);
            }
            run_models(config).await
        }
    }
}

/// Loads the config file (if present) and applies environment overrides.
#[instrument(fields(path = %path.display()))]
fn load_config(path: &Path) -> Result<AppConfig> {
    let mut config = AppConfig::load_or_default(path)
        .with_context(|| format!("loading {}", path.display()))?;
    config.apply_env();
    info!(model = %config.model(), base_url = %config.base_url(), "Configuration ready");
    Ok(config)
}

/// Builds the oracle for a run.
fn build_oracle(config: &AppConfig, random: bool) -> Result<Arc<dyn MoveOracle>> {
    if random {
        return Ok(Arc::new(RandomOracle));
    }
    let client = Arc::new(LlmClient::new(config.llm_config())?);
    let cache = Arc::new(DecisionCache::new(*config.cache_capacity()));
    Ok(Arc::new(LlmOracle::new(
        client,
        config.model(),
        *config.strategy(),
        cache,
        config.completion_options(),
    )))
}

/// Plays `games` games and prints a summary for each.
#[instrument(skip(config), fields(model = %config.model(), strategy = %config.strategy()))]
async fn run_play(config: AppConfig, games: u32, random: bool, json: bool) -> Result<()> {
    let oracle = build_oracle(&config, random)?;
    info!(mode = %oracle.name(), games, "Starting session");

    let mut summaries = Vec::new();
    for index in 1..=games {
        let game = Game::with_rng(
            *config.board_size(),
            *config.win_tile(),
            StdRng::from_rng(&mut rand::rng()),
        );
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut autoplay =
            Autoplay::new(game, Arc::clone(&oracle), config.autoplay_settings(), tx);

        if !json {
            println!("Game {} of {}\n{}\n", index, games, autoplay.game().board().render());
        }

        let printer = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                match event {
                    GameEvent::Thinking(message) => info!(%message, "Waiting on model"),
                    GameEvent::MoveMade {
                        direction,
                        moves,
                        score,
                    } => {
                        if !json {
                            println!("Move {}: {} (score {})", moves, direction, score);
                        }
                    }
                    GameEvent::BoardChanged(rendered) => {
                        if !json {
                            println!("{}\n", rendered);
                        }
                    }
                    GameEvent::GameOver(_) => break,
                }
            }
        });

        let stop = autoplay.stop_handle();
        let interrupt = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, stopping AI");
                stop.stop();
            }
        });

        let summary = autoplay.run().await;
        interrupt.abort();
        let _ = printer.await;

        print_summary(&summary, json)?;
        let interrupted = matches!(summary.outcome(), Outcome::Disengaged(_));
        summaries.push(summary);
        if interrupted {
            break;
        }
    }

    if summaries.len() > 1 && !json {
        let best = summaries.iter().map(|s| *s.max_tile()).max().unwrap_or(0);
        let mean =
            summaries.iter().map(|s| *s.score() as f64).sum::<f64>() / summaries.len() as f64;
        println!("Played {} games, best tile {}, mean score {:.1}", summaries.len(), best, mean);
    }
    Ok(())
}

fn print_summary(summary: &GameSummary, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(summary)?);
    } else {
        println!(
            "{}: {} | score {} | moves {} | max tile {} | {:.1}s",
            summary.mode(),
            summary.outcome(),
            summary.score(),
            summary.moves(),
            summary.max_tile(),
            summary.elapsed_secs()
        );
    }
    Ok(())
}

/// Lists installed models.
#[instrument(skip(config), fields(base_url = %config.base_url()))]
async fn run_models(config: AppConfig) -> Result<()> {
    let client = LlmClient::new(config.llm_config())?;
    let models = client
        .list_models()
        .await
        .with_context(|| format!("listing models on {}", config.base_url()))?;

    if models.is_empty() {
        println!("No models installed on {}", config.base_url());
    }
    for model in models {
        match model.size_bytes {
            Some(bytes) => println!("{:<40} {:>8.1} GB", model.name, bytes as f64 / 1e9),
            None => println!("{}", model.name),
        }
    }
    Ok(())
}
