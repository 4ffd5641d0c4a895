//! Operators built from task files, driven through the runner.

use std::sync::Arc;
use std::time::Duration;

use sluice_config::TaskFile;
use sluice_exchange::{Exchange, InMemoryExchange};
use sluice_runner::TaskRunner;
use sluice_transfer::{
  InMemoryTransferClient, RecordedCall, RetryPolicy, TimeFilter, TimeRange, TransferConfig,
  TransferRun, TransferState,
};
use tokio_util::sync::CancellationToken;

fn build(json: &str, client: Arc<InMemoryTransferClient>) -> Box<dyn sluice_operator::Operator> {
  TaskFile::from_json(json)
    .expect("task file should parse")
    .task
    .build(client)
    .expect("operator should build")
}

#[tokio::test]
async fn test_create_task_publishes_config_id() {
  let client = Arc::new(InMemoryTransferClient::new().with_created_config(TransferConfig {
    name: Some("projects/123abc/locations/321cba/transferConfig/1a2b3c".to_string()),
    ..TransferConfig::default()
  }));
  let operator = build(
    r#"{
      "operator": "create_transfer_config",
      "task_id": "create",
      "project_id": "id",
      "location": "us",
      "transfer_config": {"display_name": "test"},
      "authorization_code": "code",
      "retry": "disabled"
    }"#,
    client.clone(),
  );
  let exchange = Arc::new(InMemoryExchange::new());

  TaskRunner::new(exchange.clone())
    .run_in("exec-1", operator.as_ref(), CancellationToken::new())
    .await
    .expect("run should succeed");

  assert_eq!(
    exchange
      .pull("exec-1", "create", "transfer_config_id")
      .await
      .unwrap(),
    Some(serde_json::json!("1a2b3c"))
  );
  match &client.calls().await[..] {
    [RecordedCall::CreateTransferConfig(request)] => {
      assert_eq!(request.project_id, "id");
      assert_eq!(request.location.as_deref(), Some("us"));
      assert_eq!(request.authorization_code.as_deref(), Some("code"));
      assert_eq!(request.transfer_config.display_name.as_deref(), Some("test"));
      assert_eq!(request.options.retry, RetryPolicy::Disabled);
    }
    calls => panic!("unexpected calls: {:?}", calls),
  }
}

#[tokio::test]
async fn test_deferred_start_task_round_trip() {
  let client = Arc::new(
    InMemoryTransferClient::new()
      .with_started_runs(vec![TransferRun {
        name: Some("projects/id/transferConfigs/id1234/runs/123".to_string()),
        ..TransferRun::default()
      }])
      .with_run_states([TransferState::Succeeded]),
  );
  let operator = build(
    r#"{
      "operator": "start_transfer_runs",
      "task_id": "start",
      "project_id": "id",
      "transfer_config_id": "id1234",
      "requested_time_range": {
        "start_time": "2024-01-01T00:00:00Z",
        "end_time": "2024-01-02T00:00:00Z"
      },
      "deferrable": true,
      "poll_interval_secs": 1,
      "timeout_ms": 5000
    }"#,
    client.clone(),
  );
  let exchange = Arc::new(InMemoryExchange::new());

  let result = TaskRunner::new(exchange.clone())
    .run_in("exec-1", operator.as_ref(), CancellationToken::new())
    .await
    .expect("run should succeed");

  assert_eq!(result.deferrals, 1);
  assert_eq!(
    exchange.pull("exec-1", "start", "run_id").await.unwrap(),
    Some(serde_json::json!("123"))
  );
  let expected = TimeFilter::Range(TimeRange {
    start_time: Some("2024-01-01T00:00:00Z".parse().unwrap()),
    end_time: Some("2024-01-02T00:00:00Z".parse().unwrap()),
  });
  match &client.calls().await[0] {
    RecordedCall::StartManualTransferRuns(request) => {
      assert_eq!(request.requested_time_range, expected.requested_time_range());
      assert_eq!(request.requested_run_time, None);
      assert_eq!(request.options.timeout, Some(Duration::from_millis(5000)));
    }
    other => panic!("unexpected call: {:?}", other),
  }
}

#[tokio::test]
async fn test_delete_task_publishes_nothing() {
  let client = Arc::new(InMemoryTransferClient::new());
  let operator = build(
    r#"{
      "operator": "delete_transfer_config",
      "task_id": "delete",
      "project_id": "id",
      "transfer_config_id": "id1234",
      "metadata": {"x-request-reason": "cleanup"}
    }"#,
    client.clone(),
  );
  let exchange = Arc::new(InMemoryExchange::new());

  TaskRunner::new(exchange.clone())
    .run_in("exec-1", operator.as_ref(), CancellationToken::new())
    .await
    .expect("run should succeed");

  assert!(exchange.records("exec-1").await.unwrap().is_empty());
  match &client.calls().await[..] {
    [RecordedCall::DeleteTransferConfig(request)] => {
      assert_eq!(request.transfer_config_id, "id1234");
      assert_eq!(
        request.options.metadata,
        vec![("x-request-reason".to_string(), "cleanup".to_string())]
      );
    }
    calls => panic!("unexpected calls: {:?}", calls),
  }
}
