use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sluice_transfer::{
  CallOptions, GetRunRequest, StartRunsRequest, StartRunsResponse, TimeFilter, TransferClient,
  object_id, wait_for_terminal_run,
};
use sluice_trigger::{TransferRunTrigger, TriggerEvent, TriggerStatus};
use tokio::sync::{Mutex, watch};
use tracing::{error, info, instrument};

use crate::context::{Deferral, TaskContext};
use crate::error::OperatorError;
use crate::operator::{Operator, TaskOutcome};

/// Exchange key holding the id of a started run.
pub const RUN_ID_KEY: &str = "run_id";

/// Resumption point used when the operator defers.
pub const RESUME_METHOD: &str = "execute_complete";

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Lifecycle of a start-runs execution.
///
/// ```text
/// NotStarted -> Dispatched -> SyncPolling     -> Done | Failed
///                          -> AwaitingTrigger -> Done | Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
  NotStarted,
  /// The start call succeeded.
  Dispatched,
  /// Blocking on the run in-process.
  SyncPolling,
  /// Suspended; a trigger is watching the run.
  AwaitingTrigger,
  Done,
  Failed,
}

/// Starts manual runs of a transfer configuration.
///
/// The id of the last started run is published under [`RUN_ID_KEY`] once the
/// run has succeeded. Without `deferrable` the operator polls the run itself;
/// with it, the operator hands a [`TransferRunTrigger`] to the scheduler and
/// publishes on resumption.
pub struct StartTransferRunsOperator {
  task_id: String,
  transfer_config_id: String,
  project_id: String,
  location: Option<String>,
  time_filter: TimeFilter,
  options: CallOptions,
  deferrable: bool,
  poll_interval: Duration,
  trigger_timeout: Option<Duration>,
  client: Arc<dyn TransferClient>,
  phase: watch::Sender<RunPhase>,
  /// Run handed to the trigger, cleared once a resumption settles it.
  deferred_run: Mutex<Option<String>>,
}

impl StartTransferRunsOperator {
  pub fn new(
    task_id: impl Into<String>,
    client: Arc<dyn TransferClient>,
    transfer_config_id: impl Into<String>,
    project_id: impl Into<String>,
  ) -> Self {
    let (phase, _) = watch::channel(RunPhase::NotStarted);
    Self {
      task_id: task_id.into(),
      transfer_config_id: transfer_config_id.into(),
      project_id: project_id.into(),
      location: None,
      time_filter: TimeFilter::None,
      options: CallOptions::default(),
      deferrable: false,
      poll_interval: DEFAULT_POLL_INTERVAL,
      trigger_timeout: None,
      client,
      phase,
      deferred_run: Mutex::new(None),
    }
  }

  pub fn with_location(mut self, location: impl Into<String>) -> Self {
    self.location = Some(location.into());
    self
  }

  pub fn with_time_filter(mut self, time_filter: TimeFilter) -> Self {
    self.time_filter = time_filter;
    self
  }

  pub fn with_options(mut self, options: CallOptions) -> Self {
    self.options = options;
    self
  }

  /// Suspend on a trigger instead of polling in-process.
  pub fn deferrable(mut self, deferrable: bool) -> Self {
    self.deferrable = deferrable;
    self
  }

  pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
    self.poll_interval = poll_interval;
    self
  }

  /// Bound how long the scheduler lets the trigger run.
  pub fn with_trigger_timeout(mut self, timeout: Duration) -> Self {
    self.trigger_timeout = Some(timeout);
    self
  }

  pub fn phase(&self) -> RunPhase {
    *self.phase.borrow()
  }

  /// Observe phase transitions.
  pub fn subscribe_phase(&self) -> watch::Receiver<RunPhase> {
    self.phase.subscribe()
  }

  fn set_phase(&self, phase: RunPhase) {
    self.phase.send_replace(phase);
  }

  fn fail<T>(&self, e: impl Into<OperatorError>) -> Result<T, OperatorError> {
    self.set_phase(RunPhase::Failed);
    Err(e.into())
  }

  fn run_request(&self, run_id: &str) -> GetRunRequest {
    GetRunRequest {
      run_id: run_id.to_string(),
      transfer_config_id: self.transfer_config_id.clone(),
      project_id: self.project_id.clone(),
      location: self.location.clone(),
      options: self.options.clone(),
    }
  }

  async fn execute_inner(&self, ctx: &TaskContext) -> Result<TaskOutcome, OperatorError> {
    let response = match self
      .client
      .start_manual_transfer_runs(StartRunsRequest {
        transfer_config_id: self.transfer_config_id.clone(),
        project_id: self.project_id.clone(),
        location: self.location.clone(),
        requested_time_range: self.time_filter.requested_time_range(),
        requested_run_time: self.time_filter.requested_run_time(),
        options: self.options.clone(),
      })
      .await
    {
      Ok(response) => response,
      Err(e) => return self.fail(e),
    };

    let run_id = match last_run_id(&response) {
      Some(run_id) => run_id,
      None => return self.fail(OperatorError::missing("run name")),
    };

    self.set_phase(RunPhase::Dispatched);
    info!(%run_id, runs = response.runs.len(), "transfer runs started");

    if self.deferrable {
      self.defer(ctx, run_id).await
    } else {
      self.wait_for_run(ctx, run_id).await
    }
  }

  async fn wait_for_run(
    &self,
    ctx: &TaskContext,
    run_id: String,
  ) -> Result<TaskOutcome, OperatorError> {
    self.set_phase(RunPhase::SyncPolling);

    let run = match wait_for_terminal_run(
      self.client.as_ref(),
      &self.run_request(&run_id),
      self.poll_interval,
      ctx.cancellation(),
    )
    .await
    {
      Ok(run) => run,
      Err(e) => return self.fail(e),
    };

    if run.state.is_failure() {
      return self.fail(OperatorError::RunFailed {
        run_id,
        state: run.state,
      });
    }

    if let Err(e) = ctx.publish(RUN_ID_KEY, run_id.clone()).await {
      return self.fail(e);
    }

    self.set_phase(RunPhase::Done);
    info!(%run_id, "transfer run finished");
    Ok(TaskOutcome::Complete(None))
  }

  async fn defer(&self, ctx: &TaskContext, run_id: String) -> Result<TaskOutcome, OperatorError> {
    let trigger = TransferRunTrigger::new(
      self.client.clone(),
      self.project_id.clone(),
      self.location.clone(),
      self.transfer_config_id.clone(),
      run_id.clone(),
      self.poll_interval,
    );

    // Set before handing off; a scheduler may resume as soon as it holds the deferral.
    *self.deferred_run.lock().await = Some(run_id.clone());
    self.set_phase(RunPhase::AwaitingTrigger);

    let deferral = Deferral {
      task_id: ctx.task_id().to_string(),
      trigger: Arc::new(trigger),
      resume_method: RESUME_METHOD.to_string(),
      timeout: self.trigger_timeout,
    };
    if let Err(e) = ctx.scheduler().suspend(deferral).await {
      return self.fail(e);
    }

    info!(%run_id, "deferred to trigger");
    Ok(TaskOutcome::Deferred)
  }

  async fn complete(
    &self,
    ctx: &TaskContext,
    event: TriggerEvent,
  ) -> Result<TaskOutcome, OperatorError> {
    info!(status = ?event.status, message = %event.message, "trigger fired");

    // Held until the phase settles so a concurrent resumption sees the outcome.
    let mut deferred_run = self.deferred_run.lock().await;
    let phase = self.phase();
    let run_id = match (phase, deferred_run.as_deref()) {
      (RunPhase::AwaitingTrigger, Some(run_id)) => run_id.to_string(),
      _ => return Err(OperatorError::NotAwaitingTrigger { phase }),
    };
    if let Some(reported) = &event.run_id {
      if *reported != run_id {
        return Err(OperatorError::RunMismatch {
          expected: run_id,
          reported: reported.clone(),
        });
      }
    }
    *deferred_run = None;

    match event.status {
      TriggerStatus::Failed => self.fail(OperatorError::TriggerFailed(event.message)),
      TriggerStatus::Success => {
        if let Err(e) = ctx.publish(RUN_ID_KEY, run_id).await {
          return self.fail(e);
        }

        self.set_phase(RunPhase::Done);
        Ok(TaskOutcome::Complete(None))
      }
    }
  }
}

/// Id of the last run in a start response.
fn last_run_id(response: &StartRunsResponse) -> Option<String> {
  response
    .runs
    .last()
    .and_then(|run| run.name.as_deref())
    .and_then(object_id)
    .map(str::to_string)
}

#[async_trait]
impl Operator for StartTransferRunsOperator {
  fn task_id(&self) -> &str {
    &self.task_id
  }

  #[instrument(
    name = "start_transfer_runs",
    skip(self, ctx),
    fields(
      task_id = %self.task_id,
      transfer_config_id = %self.transfer_config_id,
      deferrable = self.deferrable,
    )
  )]
  async fn execute(&self, ctx: &TaskContext) -> Result<TaskOutcome, OperatorError> {
    info!("starting transfer runs");

    let result = self.execute_inner(ctx).await;
    if let Err(e) = &result {
      error!(error = %e, "start transfer runs failed");
    }
    result
  }

  #[instrument(
    name = "start_transfer_runs_resume",
    skip(self, ctx, event),
    fields(task_id = %self.task_id, method = %method)
  )]
  async fn resume(
    &self,
    ctx: &TaskContext,
    method: &str,
    event: TriggerEvent,
  ) -> Result<TaskOutcome, OperatorError> {
    if method != RESUME_METHOD {
      return Err(OperatorError::UnknownResumeMethod(method.to_string()));
    }

    let result = self.complete(ctx, event).await;
    if let Err(e) = &result {
      error!(error = %e, "transfer run did not complete");
    }
    result
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use sluice_transfer::TransferRun;

  fn run(name: &str) -> TransferRun {
    TransferRun {
      name: Some(name.to_string()),
      ..TransferRun::default()
    }
  }

  #[test]
  fn test_last_run_id_takes_last_run() {
    let response = StartRunsResponse {
      runs: vec![
        run("projects/p/transferConfigs/c/runs/1"),
        run("projects/p/transferConfigs/c/runs/2"),
      ],
    };

    assert_eq!(last_run_id(&response).as_deref(), Some("2"));
  }

  #[test]
  fn test_last_run_id_missing() {
    assert_eq!(last_run_id(&StartRunsResponse::default()), None);
    assert_eq!(
      last_run_id(&StartRunsResponse {
        runs: vec![TransferRun::default()],
      }),
      None
    );
  }
}
