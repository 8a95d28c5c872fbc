//! Tests for the background move worker.

mod common;

use async_trait::async_trait;
use common::ScriptedModel;
use llm2048::{
    Board, CompletionOptions, DecisionCache, Direction, LegalMoves, LlmErrorKind, LlmOracle,
    MoveOracle, MoveWorker, OracleError, StrategyId, THINKING_MESSAGE, WorkerError, WorkerEvent,
    WorkerFailure, WorkerState, start_ai_move,
};
use std::sync::Arc;
use std::time::Duration;

fn open_board() -> Board {
    Board::from_rows(vec![
        vec![2, 0, 0, 0],
        vec![0, 0, 0, 0],
        vec![0, 0, 4, 0],
        vec![0, 0, 0, 0],
    ])
    .expect("valid board")
}

fn dead_board() -> Board {
    Board::from_rows(vec![
        vec![2, 4, 2, 4],
        vec![4, 2, 4, 2],
        vec![2, 4, 2, 4],
        vec![4, 2, 4, 2],
    ])
    .expect("valid board")
}

fn oracle(model: Arc<ScriptedModel>) -> Arc<dyn MoveOracle> {
    Arc::new(LlmOracle::new(
        model,
        "scripted",
        StrategyId::Snake,
        Arc::new(DecisionCache::default()),
        CompletionOptions::default(),
    ))
}

/// Blocks its thread inside the poll, so a cancel cannot interrupt it.
struct BlockingOracle(Duration);

#[async_trait]
impl MoveOracle for BlockingOracle {
    async fn choose(&self, _board: &Board, _legal: LegalMoves) -> Result<Direction, OracleError> {
        std::thread::sleep(self.0);
        Ok(Direction::Left)
    }

    fn name(&self) -> String {
        "blocking".to_string()
    }
}

/// Never answers.
struct SilentOracle;

#[async_trait]
impl MoveOracle for SilentOracle {
    async fn choose(&self, _board: &Board, _legal: LegalMoves) -> Result<Direction, OracleError> {
        std::future::pending::<Result<Direction, OracleError>>().await
    }

    fn name(&self) -> String {
        "silent".to_string()
    }
}

#[tokio::test]
async fn test_completed_move() {
    let model = Arc::new(ScriptedModel::always("LEFT"));
    let mut worker = MoveWorker::new();
    worker.start(&open_board(), oracle(model)).expect("idle worker");

    assert_eq!(
        worker.next_event().await,
        Some(WorkerEvent::Thinking(THINKING_MESSAGE.to_string()))
    );
    assert_eq!(worker.next_event().await, Some(WorkerEvent::Completed(Direction::Left)));
    assert_eq!(worker.state(), WorkerState::Idle);
}

#[tokio::test]
async fn test_model_failure_reports_cause() {
    let model = Arc::new(ScriptedModel::scripted(
        vec![Err(LlmErrorKind::Transport)],
        "LEFT",
    ));
    let mut worker = MoveWorker::new();
    worker.start(&open_board(), oracle(model)).expect("idle worker");

    match worker.wait().await {
        Some(WorkerEvent::Failed(WorkerFailure::Model(cause))) => {
            assert!(cause.contains("transport"), "{cause}");
        }
        other => panic!("expected model failure, got {other:?}"),
    }
    assert_eq!(worker.state(), WorkerState::Idle);
}

#[tokio::test]
async fn test_no_legal_moves_fails_without_model_call() {
    let model = Arc::new(ScriptedModel::always("LEFT"));
    let mut worker = MoveWorker::new();
    worker
        .start(&dead_board(), oracle(Arc::clone(&model)))
        .expect("idle worker");

    assert_eq!(
        worker.wait().await,
        Some(WorkerEvent::Failed(WorkerFailure::NoLegalMoves))
    );
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_cancel_emits_cancelled_and_drops_result() {
    let model = Arc::new(ScriptedModel::always("LEFT").with_delay(Duration::from_millis(200)));
    let mut worker = MoveWorker::new();
    worker.start(&open_board(), oracle(model)).expect("idle worker");
    assert!(matches!(worker.next_event().await, Some(WorkerEvent::Thinking(_))));

    assert!(worker.cancel());
    assert!(!worker.cancel());
    assert_eq!(worker.next_event().await, Some(WorkerEvent::Cancelled));
    assert_eq!(worker.state(), WorkerState::Idle);

    let late = tokio::time::timeout(Duration::from_millis(400), worker.next_event()).await;
    assert!(late.is_err(), "unexpected event after cancel: {late:?}");
}

#[tokio::test]
async fn test_start_while_requesting_is_busy() {
    let model = Arc::new(ScriptedModel::always("LEFT").with_delay(Duration::from_millis(200)));
    let oracle = oracle(model);
    let mut worker = MoveWorker::new();
    worker.start(&open_board(), Arc::clone(&oracle)).expect("idle worker");

    assert_eq!(
        worker.start(&open_board(), Arc::clone(&oracle)),
        Err(WorkerError::Busy)
    );
    assert_eq!(worker.state(), WorkerState::Requesting);

    assert_eq!(worker.wait().await, Some(WorkerEvent::Completed(Direction::Left)));
    worker.start(&open_board(), oracle).expect("idle again");
    assert_eq!(worker.wait().await, Some(WorkerEvent::Completed(Direction::Left)));
}

#[tokio::test]
async fn test_cancel_when_idle_is_noop() {
    let mut worker = MoveWorker::new();
    assert!(!worker.cancel());
    assert_eq!(worker.state(), WorkerState::Idle);
    assert_eq!(worker.try_next_event(), None);
}

#[tokio::test]
async fn test_start_ai_move() {
    let model = Arc::new(ScriptedModel::always("down please"));
    let mut worker = start_ai_move(
        &open_board(),
        StrategyId::CornerFocus,
        model,
        "scripted",
        Arc::new(DecisionCache::default()),
        CompletionOptions::default(),
    )
    .expect("new worker");
    assert_eq!(worker.wait().await, Some(WorkerEvent::Completed(Direction::Down)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancelled_result_never_reaches_next_request() {
    let mut worker = MoveWorker::new();
    worker
        .start(&open_board(), Arc::new(BlockingOracle(Duration::from_millis(300))))
        .expect("idle worker");
    assert!(matches!(worker.next_event().await, Some(WorkerEvent::Thinking(_))));

    // Let the first oracle call get stuck in its poll before cancelling.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(worker.cancel());
    assert_eq!(worker.next_event().await, Some(WorkerEvent::Cancelled));

    worker
        .start(&open_board(), Arc::new(SilentOracle))
        .expect("idle after cancel");
    assert!(matches!(worker.next_event().await, Some(WorkerEvent::Thinking(_))));

    let late = tokio::time::timeout(Duration::from_millis(600), worker.wait()).await;
    assert!(late.is_err(), "cancelled result delivered to the next request: {late:?}");
    assert_eq!(worker.state(), WorkerState::Requesting);
    assert!(worker.cancel());
}
