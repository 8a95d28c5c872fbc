//! Tests for driving whole games with an oracle.

mod common;

use common::ScriptedModel;
use llm2048::{
    Autoplay, AutoplaySettings, Board, CacheKey, CompletionOptions, DecisionCache, Game,
    GameEvent, GameState, LlmErrorKind, LlmOracle, MoveOracle, Outcome, RandomOracle, StrategyId,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

fn llm_oracle(model: Arc<ScriptedModel>) -> Arc<dyn MoveOracle> {
    shared_cache_oracle(model, Arc::new(DecisionCache::default()))
}

fn shared_cache_oracle(
    model: Arc<ScriptedModel>,
    cache: Arc<DecisionCache>,
) -> Arc<dyn MoveOracle> {
    Arc::new(LlmOracle::new(
        model,
        "scripted",
        StrategyId::Snake,
        cache,
        CompletionOptions::default(),
    ))
}

/// Caches the first legal move for the game's current board.
fn prefill(cache: &DecisionCache, game: &Game) -> CacheKey {
    let legal = game.legal_moves();
    let key = CacheKey::new(game.board(), legal, StrategyId::Snake);
    let direction = legal.first().expect("game has moves");
    assert!(cache.put(key.clone(), direction));
    key
}

#[tokio::test]
async fn test_random_play_reaches_terminal_state() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let game = Game::seeded(4, 2048, 42);
    let mut autoplay = Autoplay::new(
        game,
        Arc::new(RandomOracle),
        AutoplaySettings::default(),
        tx,
    );

    let summary = autoplay.run().await;
    assert!(matches!(summary.outcome(), Outcome::Won | Outcome::Lost));
    assert!(summary.final_state().is_terminal());
    assert_eq!(*summary.moves(), autoplay.game().moves());
    assert_eq!(*summary.score(), summary.board().score());

    let mut moves = 0;
    let mut game_over = false;
    while let Ok(event) = rx.try_recv() {
        match event {
            GameEvent::MoveMade { .. } => moves += 1,
            GameEvent::GameOver(_) => game_over = true,
            _ => {}
        }
    }
    assert_eq!(moves, *summary.moves());
    assert!(game_over);
}

#[tokio::test]
async fn test_small_win_tile_wins() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let game = Game::seeded(4, 4, 7);
    let mut autoplay = Autoplay::new(game, Arc::new(RandomOracle), AutoplaySettings::default(), tx);

    let summary = autoplay.run().await;
    // A board holding only 2s always has a merge, so a 4 must appear.
    assert_eq!(*summary.outcome(), Outcome::Won);
    assert_eq!(*summary.final_state(), GameState::Win);
    assert_eq!(*summary.max_tile(), 4);
}

#[tokio::test]
async fn test_move_limit() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let model = Arc::new(ScriptedModel::always("LEFT"));
    let settings = AutoplaySettings::new(Duration::ZERO, Some(3));
    let mut autoplay = Autoplay::new(Game::seeded(4, 2048, 1), llm_oracle(model), settings, tx);

    let summary = autoplay.run().await;
    assert_eq!(*summary.outcome(), Outcome::MoveLimit);
    assert_eq!(*summary.moves(), 3);
    assert!(summary.mode().contains("scripted"));

    let mut thinking = 0;
    let mut first_move_after = None;
    while let Ok(event) = rx.try_recv() {
        match event {
            GameEvent::Thinking(_) => thinking += 1,
            GameEvent::MoveMade { .. } if first_move_after.is_none() => {
                first_move_after = Some(thinking);
            }
            _ => {}
        }
    }
    assert!(first_move_after.is_some_and(|seen| seen >= 1), "Thinking must precede MoveMade");
    assert_eq!(thinking, 3);
}

#[tokio::test]
async fn test_new_game_clears_shared_cache() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let model = Arc::new(ScriptedModel::always("LEFT"));
    let cache = Arc::new(DecisionCache::default());
    let game = Game::seeded(4, 2048, 21);
    prefill(&cache, &game);

    let settings = AutoplaySettings::new(Duration::ZERO, Some(1));
    let oracle = shared_cache_oracle(Arc::clone(&model), Arc::clone(&cache));
    let mut autoplay = Autoplay::new(game, oracle, settings, tx);
    autoplay.run().await;

    // The prefilled decision was dropped, so the model had to answer.
    assert_eq!(model.calls(), 1);
    assert!(cache.len() <= 1);
}

#[tokio::test]
async fn test_resumed_game_keeps_shared_cache() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let model = Arc::new(ScriptedModel::always("LEFT"));
    let cache = Arc::new(DecisionCache::default());
    let mut game = Game::seeded(4, 2048, 21);
    let opening = game.legal_moves().first().expect("fresh game has moves");
    assert!(game.play(opening));
    let key = prefill(&cache, &game);
    let cached = cache.get(&key);

    let settings = AutoplaySettings::new(Duration::ZERO, Some(2));
    let oracle = shared_cache_oracle(Arc::clone(&model), Arc::clone(&cache));
    let mut autoplay = Autoplay::new(game, oracle, settings, tx);
    let summary = autoplay.run().await;

    assert_eq!(*summary.moves(), 2);
    assert_eq!(model.calls(), 0);
    assert_eq!(cache.get(&key), cached);
}

#[tokio::test]
async fn test_model_failure_disengages() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let model = Arc::new(ScriptedModel::scripted(
        vec![Err(LlmErrorKind::Transport)],
        "LEFT",
    ));
    let mut autoplay = Autoplay::new(
        Game::seeded(4, 2048, 3),
        llm_oracle(Arc::clone(&model)),
        AutoplaySettings::default(),
        tx,
    );

    let summary = autoplay.run().await;
    assert!(matches!(summary.outcome(), Outcome::Disengaged(cause) if cause.contains("AI Error")));
    assert_eq!(*summary.moves(), 0);
    assert_eq!(model.calls(), 1);

    // Control returns to manual play on the same game.
    let mut game = autoplay.into_game();
    let direction = game.legal_moves().first().expect("fresh game has moves");
    assert!(game.play(direction));
}

#[tokio::test]
async fn test_lost_board_ends_immediately() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let board = Board::from_rows(vec![
        vec![2, 4, 2, 4],
        vec![4, 2, 4, 2],
        vec![2, 4, 2, 4],
        vec![4, 2, 4, 2],
    ])
    .expect("valid board");
    let game = Game::from_board(board, 2048, StdRng::seed_from_u64(5));
    let model = Arc::new(ScriptedModel::always("LEFT"));
    let oracle = llm_oracle(Arc::clone(&model));
    let mut autoplay = Autoplay::new(game, oracle, AutoplaySettings::default(), tx);

    let summary = autoplay.run().await;
    assert_eq!(*summary.outcome(), Outcome::Lost);
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_stop_cancels_pending_request() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let model = Arc::new(ScriptedModel::always("LEFT").with_delay(Duration::from_secs(30)));
    let mut autoplay = Autoplay::new(
        Game::seeded(4, 2048, 9),
        llm_oracle(model),
        AutoplaySettings::default(),
        tx,
    );
    let stop = autoplay.stop_handle();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        stop.stop();
    });

    let summary = tokio::time::timeout(Duration::from_secs(5), autoplay.run())
        .await
        .expect("stop should end the run");
    assert!(matches!(summary.outcome(), Outcome::Disengaged(_)));
    assert_eq!(*summary.moves(), 0);
}
