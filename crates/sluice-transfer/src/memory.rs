use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::client::TransferClient;
use crate::error::ClientError;
use crate::resource::{parent, run_name};
use crate::types::{
  CreateConfigRequest, DeleteConfigRequest, GetRunRequest, StartRunsRequest, StartRunsResponse,
  TransferConfig, TransferRun, TransferState,
};

/// Which client method a call went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
  CreateTransferConfig,
  DeleteTransferConfig,
  StartManualTransferRuns,
  GetTransferRun,
}

/// A call received by [`InMemoryTransferClient`], with its exact arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
  CreateTransferConfig(CreateConfigRequest),
  DeleteTransferConfig(DeleteConfigRequest),
  StartManualTransferRuns(StartRunsRequest),
  GetTransferRun(GetRunRequest),
}

impl RecordedCall {
  pub fn kind(&self) -> CallKind {
    match self {
      RecordedCall::CreateTransferConfig(_) => CallKind::CreateTransferConfig,
      RecordedCall::DeleteTransferConfig(_) => CallKind::DeleteTransferConfig,
      RecordedCall::StartManualTransferRuns(_) => CallKind::StartManualTransferRuns,
      RecordedCall::GetTransferRun(_) => CallKind::GetTransferRun,
    }
  }
}

#[derive(Debug, Default)]
struct Inner {
  calls: Vec<RecordedCall>,
  created_config: Option<TransferConfig>,
  started_runs: Option<Vec<TransferRun>>,
  run_states: VecDeque<TransferState>,
  failures: HashMap<CallKind, (u16, String)>,
}

/// In-memory transfer client that records every call.
///
/// Responses are scripted with the `with_*` builders. Without a script:
/// - created configs echo the request with a generated resource name
/// - manual runs return no runs
/// - runs report `SUCCEEDED`
///
/// Suitable for testing.
#[derive(Debug, Default)]
pub struct InMemoryTransferClient {
  inner: Mutex<Inner>,
}

impl InMemoryTransferClient {
  pub fn new() -> Self {
    Self::default()
  }

  /// Respond to `create_transfer_config` with this config.
  pub fn with_created_config(mut self, config: TransferConfig) -> Self {
    self.inner.get_mut().created_config = Some(config);
    self
  }

  /// Respond to `start_manual_transfer_runs` with these runs.
  pub fn with_started_runs(mut self, runs: Vec<TransferRun>) -> Self {
    self.inner.get_mut().started_runs = Some(runs);
    self
  }

  /// States reported by successive `get_transfer_run` calls. The last state
  /// repeats once the sequence is exhausted.
  pub fn with_run_states(mut self, states: impl IntoIterator<Item = TransferState>) -> Self {
    self.inner.get_mut().run_states = states.into_iter().collect();
    self
  }

  /// Make every call of `kind` fail with the given status.
  pub fn fail_call(mut self, kind: CallKind, status: u16, message: impl Into<String>) -> Self {
    self
      .inner
      .get_mut()
      .failures
      .insert(kind, (status, message.into()));
    self
  }

  /// All calls received so far, in order.
  pub async fn calls(&self) -> Vec<RecordedCall> {
    self.inner.lock().await.calls.clone()
  }

  /// Number of calls of `kind` received so far.
  pub async fn count(&self, kind: CallKind) -> usize {
    self
      .inner
      .lock()
      .await
      .calls
      .iter()
      .filter(|call| call.kind() == kind)
      .count()
  }

  async fn record(
    &self,
    call: RecordedCall,
  ) -> Result<tokio::sync::MutexGuard<'_, Inner>, ClientError> {
    let kind = call.kind();
    let mut inner = self.inner.lock().await;
    inner.calls.push(call);
    if let Some((status, message)) = inner.failures.get(&kind) {
      return Err(ClientError::Status {
        status: *status,
        message: message.clone(),
      });
    }
    Ok(inner)
  }
}

#[async_trait]
impl TransferClient for InMemoryTransferClient {
  async fn create_transfer_config(
    &self,
    request: CreateConfigRequest,
  ) -> Result<TransferConfig, ClientError> {
    let inner = self
      .record(RecordedCall::CreateTransferConfig(request.clone()))
      .await?;

    if let Some(config) = &inner.created_config {
      return Ok(config.clone());
    }

    let mut config = request.transfer_config;
    config.name = Some(format!(
      "{}/transferConfigs/{}",
      parent(&request.project_id, request.location.as_deref()),
      uuid::Uuid::new_v4().simple()
    ));
    Ok(config)
  }

  async fn delete_transfer_config(&self, request: DeleteConfigRequest) -> Result<(), ClientError> {
    drop(
      self
        .record(RecordedCall::DeleteTransferConfig(request))
        .await?,
    );
    Ok(())
  }

  async fn start_manual_transfer_runs(
    &self,
    request: StartRunsRequest,
  ) -> Result<StartRunsResponse, ClientError> {
    let inner = self
      .record(RecordedCall::StartManualTransferRuns(request))
      .await?;

    Ok(StartRunsResponse {
      runs: inner.started_runs.clone().unwrap_or_default(),
    })
  }

  async fn get_transfer_run(&self, request: GetRunRequest) -> Result<TransferRun, ClientError> {
    let name = run_name(
      &request.project_id,
      request.location.as_deref(),
      &request.transfer_config_id,
      &request.run_id,
    );
    let mut inner = self.record(RecordedCall::GetTransferRun(request)).await?;

    let state = if inner.run_states.len() > 1 {
      inner.run_states.pop_front().unwrap_or_default()
    } else {
      inner
        .run_states
        .front()
        .copied()
        .unwrap_or(TransferState::Succeeded)
    };

    Ok(TransferRun {
      name: Some(name),
      state,
      ..TransferRun::default()
    })
  }
}
