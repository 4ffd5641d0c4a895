use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::client::TransferClient;
use crate::error::ClientError;
use crate::types::{GetRunRequest, TransferRun};

/// Poll a run every `interval` until it reaches a terminal state.
///
/// Returns the terminal run whether it succeeded or not; callers decide what a
/// failed or cancelled run means to them. Client errors end the wait.
pub async fn wait_for_terminal_run(
  client: &dyn TransferClient,
  request: &GetRunRequest,
  interval: Duration,
  cancel: &CancellationToken,
) -> Result<TransferRun, ClientError> {
  loop {
    if cancel.is_cancelled() {
      return Err(ClientError::Cancelled);
    }

    let run = client.get_transfer_run(request.clone()).await?;
    if run.state.is_terminal() {
      return Ok(run);
    }

    debug!(
      run_id = %request.run_id,
      state = %run.state,
      interval_ms = interval.as_millis() as u64,
      "transfer run still working"
    );

    tokio::select! {
      _ = cancel.cancelled() => return Err(ClientError::Cancelled),
      _ = tokio::time::sleep(interval) => {}
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::memory::{CallKind, InMemoryTransferClient};
  use crate::types::{CallOptions, TransferState};

  fn request() -> GetRunRequest {
    GetRunRequest {
      run_id: "123".to_string(),
      transfer_config_id: "id1234".to_string(),
      project_id: "id".to_string(),
      location: None,
      options: CallOptions::default(),
    }
  }

  #[tokio::test]
  async fn test_polls_until_terminal() {
    let client = InMemoryTransferClient::new().with_run_states([
      TransferState::Pending,
      TransferState::Running,
      TransferState::Succeeded,
    ]);

    let run = wait_for_terminal_run(
      &client,
      &request(),
      Duration::from_millis(1),
      &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(run.state, TransferState::Succeeded);
    assert_eq!(client.count(CallKind::GetTransferRun).await, 3);
  }

  #[tokio::test]
  async fn test_failed_run_is_returned() {
    let client = InMemoryTransferClient::new().with_run_states([TransferState::Failed]);

    let run = wait_for_terminal_run(
      &client,
      &request(),
      Duration::from_millis(1),
      &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(run.state, TransferState::Failed);
  }

  #[tokio::test]
  async fn test_cancelled_wait() {
    let client = InMemoryTransferClient::new().with_run_states([TransferState::Running]);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = wait_for_terminal_run(&client, &request(), Duration::from_millis(1), &cancel).await;

    assert!(matches!(result, Err(ClientError::Cancelled)));
    assert_eq!(client.count(CallKind::GetTransferRun).await, 0);
  }

  #[tokio::test]
  async fn test_client_error_ends_wait() {
    let client = InMemoryTransferClient::new().fail_call(
      CallKind::GetTransferRun,
      403,
      "permission denied",
    );

    let result = wait_for_terminal_run(
      &client,
      &request(),
      Duration::from_millis(1),
      &CancellationToken::new(),
    )
    .await;

    assert!(matches!(result, Err(ClientError::Status { status: 403, .. })));
  }
}
