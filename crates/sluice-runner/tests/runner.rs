//! TaskRunner tests driving real operators through their deferrals.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sluice_exchange::{Exchange, InMemoryExchange};
use sluice_operator::{
  Operator, OperatorError, RunPhase, StartTransferRunsOperator, TaskContext, TaskOutcome,
};
use sluice_runner::{ChannelNotifier, RunnerError, TaskEvent, TaskRunner};
use sluice_transfer::{CallKind, InMemoryTransferClient, TransferRun, TransferState};
use sluice_trigger::TriggerStatus;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const RUN_NAME: &str = "projects/123abc/locations/321cba/transferConfig/1a2b3c/runs/123";

fn client(states: impl IntoIterator<Item = TransferState>) -> Arc<InMemoryTransferClient> {
  Arc::new(
    InMemoryTransferClient::new()
      .with_started_runs(vec![TransferRun {
        name: Some(RUN_NAME.to_string()),
        ..TransferRun::default()
      }])
      .with_run_states(states),
  )
}

fn deferred_operator(client: Arc<InMemoryTransferClient>) -> StartTransferRunsOperator {
  StartTransferRunsOperator::new("start", client, "id1234", "id")
    .deferrable(true)
    .with_poll_interval(Duration::from_millis(1))
}

#[tokio::test]
async fn test_deferred_run_resumes_and_publishes() {
  let exchange = Arc::new(InMemoryExchange::new());
  let (tx, mut rx) = mpsc::unbounded_channel();
  let runner =
    TaskRunner::new(exchange.clone()).with_notifier(Arc::new(ChannelNotifier::new(tx)));
  let client = client([TransferState::Running, TransferState::Succeeded]);
  let operator = deferred_operator(client.clone());

  let result = runner
    .run_in("exec-1", &operator, CancellationToken::new())
    .await
    .expect("run should succeed");

  assert_eq!(result.deferrals, 1);
  assert_eq!(result.output, None);
  assert_eq!(operator.phase(), RunPhase::Done);
  assert_eq!(client.count(CallKind::GetTransferRun).await, 2);
  assert_eq!(
    exchange.pull("exec-1", "start", "run_id").await.unwrap(),
    Some(serde_json::json!("123"))
  );

  let mut events = Vec::new();
  while let Ok(event) = rx.try_recv() {
    events.push(event);
  }
  assert_eq!(events.len(), 4);
  assert!(matches!(events[0], TaskEvent::TaskStarted { .. }));
  match &events[1] {
    TaskEvent::TaskDeferred { trigger, .. } => assert_eq!(trigger.kind, "transfer_run"),
    other => panic!("expected deferral event, got {:?}", other),
  }
  assert!(matches!(
    events[2],
    TaskEvent::TaskResumed {
      status: TriggerStatus::Success,
      ..
    }
  ));
  assert!(matches!(events[3], TaskEvent::TaskCompleted { .. }));
}

#[tokio::test]
async fn test_trigger_failure_fails_task() {
  let exchange = Arc::new(InMemoryExchange::new());
  let runner = TaskRunner::new(exchange.clone());
  let operator = deferred_operator(client([TransferState::Failed]));

  let result = runner
    .run_in("exec-1", &operator, CancellationToken::new())
    .await;

  match result {
    Err(RunnerError::Operator {
      task_id,
      source: OperatorError::TriggerFailed(message),
    }) => {
      assert_eq!(task_id, "start");
      assert_eq!(message, "Job has failed");
    }
    other => panic!("expected trigger failure, got {:?}", other),
  }
  assert_eq!(operator.phase(), RunPhase::Failed);
  assert!(exchange.records("exec-1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_trigger_timeout_fails_task() {
  let runner = TaskRunner::new(Arc::new(InMemoryExchange::new()));
  let operator = deferred_operator(client([TransferState::Running]))
    .with_trigger_timeout(Duration::from_millis(20));

  let result = runner.run(&operator, CancellationToken::new()).await;

  match result {
    Err(RunnerError::Operator {
      source: OperatorError::TriggerFailed(message),
      ..
    }) => assert!(message.starts_with("Trigger timed out")),
    other => panic!("expected timeout failure, got {:?}", other),
  }
}

#[tokio::test]
async fn test_cancel_while_deferred() {
  let runner = TaskRunner::new(Arc::new(InMemoryExchange::new()));
  let client = client([TransferState::Running]);
  let operator = StartTransferRunsOperator::new("start", client, "id1234", "id")
    .deferrable(true)
    .with_poll_interval(Duration::from_secs(60));
  let cancel = CancellationToken::new();

  let canceller = {
    let cancel = cancel.clone();
    tokio::spawn(async move {
      tokio::time::sleep(Duration::from_millis(20)).await;
      cancel.cancel();
    })
  };
  let result = runner.run(&operator, cancel).await;
  canceller.await.unwrap();

  assert!(matches!(result, Err(RunnerError::Cancelled)));
}

#[tokio::test]
async fn test_synchronous_run_has_no_deferrals() {
  let exchange = Arc::new(InMemoryExchange::new());
  let runner = TaskRunner::new(exchange.clone());
  let client = client([TransferState::Succeeded]);
  let operator = StartTransferRunsOperator::new("start", client, "id1234", "id")
    .with_poll_interval(Duration::from_millis(1));

  let result = runner
    .run_in("exec-2", &operator, CancellationToken::new())
    .await
    .expect("run should succeed");

  assert_eq!(result.deferrals, 0);
  assert_eq!(
    exchange.pull("exec-2", "start", "run_id").await.unwrap(),
    Some(serde_json::json!("123"))
  );
}

#[tokio::test]
async fn test_deferred_without_suspend() {
  struct Liar;

  #[async_trait]
  impl Operator for Liar {
    fn task_id(&self) -> &str {
      "liar"
    }

    async fn execute(&self, _ctx: &TaskContext) -> Result<TaskOutcome, OperatorError> {
      Ok(TaskOutcome::Deferred)
    }
  }

  let runner = TaskRunner::new(Arc::new(InMemoryExchange::new()));

  let result = runner.run(&Liar, CancellationToken::new()).await;

  assert!(matches!(
    result,
    Err(RunnerError::MissingDeferral { task_id }) if task_id == "liar"
  ));
}
