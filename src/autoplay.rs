//! AI mode: drives a game with an oracle until it ends or the AI disengages.

use crate::oracle::MoveOracle;
use crate::worker::{MoveWorker, WorkerEvent, WorkerFailure};
use derive_getters::Getters;
use derive_more::Display;
use derive_new::new;
use llm2048_board::{Board, Direction, Game, GameState};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, instrument, warn};

/// How a game run ended.
#[derive(Debug, Clone, PartialEq, Eq, Display, Serialize)]
pub enum Outcome {
    /// The winning tile appeared.
    #[display("won")]
    Won,
    /// No legal move remained.
    #[display("lost")]
    Lost,
    /// The configured move limit was reached.
    #[display("move limit reached")]
    MoveLimit,
    /// The AI stopped because of a failure or a stop request; control returns
    /// to manual play.
    #[display("AI disengaged: {}", _0)]
    Disengaged(String),
}

/// Statistics for one finished run.
#[derive(Debug, Clone, Serialize, Getters)]
pub struct GameSummary {
    /// How the run ended.
    outcome: Outcome,
    /// Classification of the final board.
    final_state: GameState,
    /// Sum of tiles on the final board.
    score: u64,
    /// Board-changing moves played.
    moves: u32,
    /// Largest tile reached.
    max_tile: u32,
    /// Wall-clock duration.
    elapsed_secs: f64,
    /// Player label, e.g. `AI (llama3.2, snake)`.
    mode: String,
    /// Final board.
    board: Board,
}

/// Messages sent from the driver to a front end.
#[derive(Debug, Clone)]
pub enum GameEvent {
    /// The oracle is working.
    Thinking(String),
    /// A move was applied.
    MoveMade {
        /// Direction played.
        direction: Direction,
        /// Moves played so far.
        moves: u32,
        /// Score after the move.
        score: u64,
    },
    /// Rendered board after a change.
    BoardChanged(String),
    /// The run ended.
    GameOver(GameSummary),
}

/// Pacing and limits for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Getters, new)]
pub struct AutoplaySettings {
    /// Pause after each applied move.
    move_delay: Duration,
    /// Stop after this many moves.
    max_moves: Option<u32>,
}

/// Requests that a running [`Autoplay`] stop.
#[derive(Debug, Clone)]
pub struct StopHandle(Arc<watch::Sender<bool>>);

impl StopHandle {
    /// Asks the driver to cancel its request and disengage.
    pub fn stop(&self) {
        self.0.send_replace(true);
    }
}

/// Plays a game with an oracle through a [`MoveWorker`].
pub struct Autoplay {
    game: Game,
    oracle: Arc<dyn MoveOracle>,
    settings: AutoplaySettings,
    event_tx: mpsc::UnboundedSender<GameEvent>,
    stop: Arc<watch::Sender<bool>>,
}

impl Autoplay {
    /// Creates a driver for `game`.
    pub fn new(
        game: Game,
        oracle: Arc<dyn MoveOracle>,
        settings: AutoplaySettings,
        event_tx: mpsc::UnboundedSender<GameEvent>,
    ) -> Self {
        let (stop, _) = watch::channel(false);
        Self {
            game,
            oracle,
            settings,
            event_tx,
            stop: Arc::new(stop),
        }
    }

    /// Handle for stopping the run from elsewhere.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(Arc::clone(&self.stop))
    }

    /// The game being played.
    pub fn game(&self) -> &Game {
        &self.game
    }

    /// Hands the game back, e.g. for manual play after the AI disengages.
    pub fn into_game(self) -> Game {
        self.game
    }

    fn emit(&self, event: GameEvent) {
        if self.event_tx.send(event).is_err() {
            debug!("No listener for game events");
        }
    }

    /// Runs until the game ends, the move limit is hit, or the AI disengages.
    ///
    /// Failures are never retried.
    #[instrument(skip(self), fields(mode = %self.oracle.name()))]
    pub async fn run(&mut self) -> GameSummary {
        info!("Starting AI play");
        if self.game.moves() == 0 {
            self.oracle.reset();
        }

        let started = Instant::now();
        let mut stop_rx = self.stop.subscribe();
        let mut worker = MoveWorker::new();

        let outcome = loop {
            match self.game.status() {
                GameState::Win => break Outcome::Won,
                GameState::Lose => break Outcome::Lost,
                GameState::Continue => {}
            }
            if self
                .settings
                .max_moves
                .is_some_and(|limit| self.game.moves() >= limit)
            {
                break Outcome::MoveLimit;
            }
            if *stop_rx.borrow_and_update() {
                break Outcome::Disengaged("stopped by user".to_string());
            }

            if let Err(e) = worker.start(self.game.board(), Arc::clone(&self.oracle)) {
                break Outcome::Disengaged(e.to_string());
            }

            match self.await_move(&mut worker, &mut stop_rx).await {
                Ok(direction) => {
                    if !self.game.play(direction) {
                        // Oracles only return legal moves, so the board always changes.
                        warn!(%direction, "Oracle returned a move that does not change the board");
                        break Outcome::Disengaged(format!("illegal move {}", direction));
                    }
                    self.emit(GameEvent::MoveMade {
                        direction,
                        moves: self.game.moves(),
                        score: self.game.score(),
                    });
                    self.emit(GameEvent::BoardChanged(self.game.board().render()));
                    if !self.settings.move_delay.is_zero() {
                        tokio::time::sleep(self.settings.move_delay).await;
                    }
                }
                Err(outcome) => break outcome,
            }
        };

        let (max_tile, _) = self.game.board().max_tile();
        let summary = GameSummary {
            outcome,
            final_state: self.game.status(),
            score: self.game.score(),
            moves: self.game.moves(),
            max_tile,
            elapsed_secs: started.elapsed().as_secs_f64(),
            mode: self.oracle.name(),
            board: self.game.board().clone(),
        };
        info!(
            outcome = %summary.outcome,
            score = summary.score,
            moves = summary.moves,
            max_tile = summary.max_tile,
            "AI play finished"
        );
        self.emit(GameEvent::GameOver(summary.clone()));
        summary
    }

    async fn await_move(
        &self,
        worker: &mut MoveWorker,
        stop_rx: &mut watch::Receiver<bool>,
    ) -> Result<Direction, Outcome> {
        enum Step {
            Event(Option<WorkerEvent>),
            Stop,
        }

        loop {
            let step = tokio::select! {
                event = worker.next_event() => Step::Event(event),
                Ok(()) = stop_rx.changed() => Step::Stop,
            };

            match step {
                Step::Event(Some(WorkerEvent::Thinking(message))) => {
                    self.emit(GameEvent::Thinking(message));
                }
                Step::Event(Some(WorkerEvent::Completed(direction))) => return Ok(direction),
                Step::Event(Some(WorkerEvent::Failed(WorkerFailure::NoLegalMoves))) => {
                    return Err(Outcome::Lost);
                }
                Step::Event(Some(WorkerEvent::Failed(failure))) => {
                    warn!(%failure, "AI disengaged");
                    return Err(Outcome::Disengaged(failure.to_string()));
                }
                Step::Event(Some(WorkerEvent::Cancelled)) => {
                    return Err(Outcome::Disengaged("cancelled".to_string()));
                }
                Step::Event(None) => {
                    return Err(Outcome::Disengaged("worker channel closed".to_string()));
                }
                Step::Stop => {
                    if *stop_rx.borrow_and_update() {
                        worker.cancel();
                        return Err(Outcome::Disengaged("stopped by user".to_string()));
                    }
                }
            }
        }
    }
}
