//! Background move worker.
//!
//! Runs one oracle call at a time on a tokio task and reports back over a
//! channel, so the game loop never waits on the model.
//!
//! ```text
//! Idle -> Requesting -> { Completed | Failed | Cancelled } -> Idle
//! ```
//!
//! Each [`MoveWorker::start`] yields exactly one terminal event. The state
//! returns to `Idle` once that event has been received.

use crate::cache::DecisionCache;
use crate::llm_client::{ChatModel, CompletionOptions};
use crate::oracle::{LlmOracle, MoveOracle, OracleError};
use crate::strategy::StrategyId;
use derive_more::{Display, Error};
use llm2048_board::{Board, Direction, legal_moves};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, instrument, warn};

/// Status line sent when a request begins.
pub const THINKING_MESSAGE: &str = "AI thinking...";

/// Where the worker is in its request cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum WorkerState {
    /// No request outstanding.
    #[display("idle")]
    Idle,
    /// Waiting on the oracle.
    #[display("requesting")]
    Requesting,
    /// A move was produced and is waiting to be received.
    #[display("completed")]
    Completed(Direction),
    /// The request failed and the failure is waiting to be received.
    #[display("failed")]
    Failed,
    /// The request was cancelled.
    #[display("cancelled")]
    Cancelled,
}

/// Why a request ended without a move.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum WorkerFailure {
    /// The board has no legal move. This is game over, not a fault.
    #[display("no legal moves")]
    NoLegalMoves,
    /// The model could not be reached or answered with an error.
    #[display("AI Error: {}", _0)]
    Model(String),
}

impl From<OracleError> for WorkerFailure {
    fn from(err: OracleError) -> Self {
        match err {
            OracleError::NoLegalMoves(_) => Self::NoLegalMoves,
            OracleError::Model(e) => Self::Model(format!("{}: {}", e.kind, e.message)),
        }
    }
}

/// Notification delivered to the game loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    /// A request started.
    Thinking(String),
    /// The chosen move.
    Completed(Direction),
    /// The request failed.
    Failed(WorkerFailure),
    /// The request was cancelled; any late result was discarded.
    Cancelled,
}

impl WorkerEvent {
    /// True for `Completed`, `Failed` and `Cancelled`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WorkerEvent::Thinking(_))
    }
}

/// Misuse of the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
pub enum WorkerError {
    /// `start` was called while a request is outstanding.
    #[display("a move request is already in flight")]
    Busy,
}

#[derive(Debug)]
struct Slot {
    state: WorkerState,
    /// Bumped by every `start`; a task may only settle its own request.
    generation: u64,
}

#[derive(Debug)]
struct Shared {
    slot: Mutex<Slot>,
    events: mpsc::UnboundedSender<WorkerEvent>,
}

impl Shared {
    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves request `generation` from Requesting to a terminal state and
    /// emits its event. Does nothing if that request was already settled,
    /// e.g. by a cancel, or has been superseded by a later `start`.
    fn settle(&self, generation: u64, next: WorkerState, event: WorkerEvent) -> bool {
        let mut slot = self.slot();
        if slot.generation != generation || slot.state != WorkerState::Requesting {
            debug!(generation, current = slot.generation, "Stale settle ignored");
            return false;
        }
        slot.state = next;
        // The receiver lives in the worker; a closed channel means nobody is
        // listening any more.
        let _ = self.events.send(event);
        true
    }
}

/// Schedules oracle calls off the caller's task.
#[derive(Debug)]
pub struct MoveWorker {
    shared: Arc<Shared>,
    events: mpsc::UnboundedReceiver<WorkerEvent>,
    cancel: Option<oneshot::Sender<()>>,
}

impl MoveWorker {
    /// Creates an idle worker.
    #[instrument]
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot {
                    state: WorkerState::Idle,
                    generation: 0,
                }),
                events: tx,
            }),
            events: rx,
            cancel: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> WorkerState {
        self.shared.slot().state
    }

    /// Begins choosing a move for a copy of `board`.
    ///
    /// Must be called inside a tokio runtime. Events left over from an
    /// earlier request are discarded.
    #[instrument(skip(self, board, oracle), fields(oracle = %oracle.name()))]
    pub fn start(&mut self, board: &Board, oracle: Arc<dyn MoveOracle>) -> Result<(), WorkerError> {
        {
            let mut slot = self.shared.slot();
            if slot.state == WorkerState::Requesting {
                warn!("Start rejected, request already in flight");
                return Err(WorkerError::Busy);
            }
            while self.events.try_recv().is_ok() {}
            slot.generation += 1;
            let generation = slot.generation;

            let legal = legal_moves(board);
            if legal.is_empty() {
                info!("No legal moves, failing immediately");
                slot.state = WorkerState::Failed;
                let _ = self
                    .shared
                    .events
                    .send(WorkerEvent::Failed(WorkerFailure::NoLegalMoves));
                return Ok(());
            }

            slot.state = WorkerState::Requesting;
            let _ = self
                .shared
                .events
                .send(WorkerEvent::Thinking(THINKING_MESSAGE.to_string()));

            let (cancel_tx, cancel_rx) = oneshot::channel();
            self.cancel = Some(cancel_tx);

            let shared = Arc::clone(&self.shared);
            let board = board.clone();
            tokio::spawn(async move {
                tokio::select! {
                    biased;
                    _ = cancel_rx => {
                        debug!("Request abandoned");
                    }
                    result = oracle.choose(&board, legal) => {
                        match result {
                            Ok(direction) => {
                                if shared.settle(
                                    generation,
                                    WorkerState::Completed(direction),
                                    WorkerEvent::Completed(direction),
                                ) {
                                    info!(%direction, "Move ready");
                                }
                            }
                            Err(e) => {
                                warn!(error = %e, "Move request failed");
                                shared.settle(
                                    generation,
                                    WorkerState::Failed,
                                    WorkerEvent::Failed(e.into()),
                                );
                            }
                        }
                    }
                }
            });
        }
        Ok(())
    }

    /// Cancels the outstanding request, if any.
    ///
    /// Best effort: the in-flight call is abandoned rather than stopped, and
    /// its result is never delivered. Emits `Cancelled` exactly once.
    #[instrument(skip(self))]
    pub fn cancel(&mut self) -> bool {
        let generation = self.shared.slot().generation;
        let cancelled = self
            .shared
            .settle(generation, WorkerState::Cancelled, WorkerEvent::Cancelled);
        if let Some(tx) = self.cancel.take() {
            let _ = tx.send(());
        }
        if cancelled {
            info!("Move request cancelled");
        }
        cancelled
    }

    /// Waits for the next event.
    pub async fn next_event(&mut self) -> Option<WorkerEvent> {
        let event = self.events.recv().await;
        self.observe(event.as_ref());
        event
    }

    /// Returns a pending event without waiting.
    pub fn try_next_event(&mut self) -> Option<WorkerEvent> {
        let event = self.events.try_recv().ok();
        self.observe(event.as_ref());
        event
    }

    /// Waits until the current request ends and returns its terminal event.
    pub async fn wait(&mut self) -> Option<WorkerEvent> {
        while let Some(event) = self.next_event().await {
            if event.is_terminal() {
                return Some(event);
            }
        }
        None
    }

    fn observe(&mut self, event: Option<&WorkerEvent>) {
        if event.is_some_and(WorkerEvent::is_terminal) {
            let mut slot = self.shared.slot();
            if slot.state != WorkerState::Requesting {
                slot.state = WorkerState::Idle;
            }
            self.cancel = None;
        }
    }
}

impl Default for MoveWorker {
    fn default() -> Self {
        Self::new()
    }
}

/// Starts a model-backed move request for `board`.
#[instrument(skip(board, model, cache), fields(model = %model_name, strategy = %strategy))]
pub fn start_ai_move(
    board: &Board,
    strategy: StrategyId,
    model: Arc<dyn ChatModel>,
    model_name: &str,
    cache: Arc<DecisionCache>,
    options: CompletionOptions,
) -> Result<MoveWorker, WorkerError> {
    let oracle: Arc<dyn MoveOracle> =
        Arc::new(LlmOracle::new(model, model_name, strategy, cache, options));
    let mut worker = MoveWorker::new();
    worker.start(board, oracle)?;
    Ok(worker)
}
