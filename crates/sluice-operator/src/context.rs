use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sluice_exchange::{Exchange, ExchangeRecord};
use sluice_trigger::Trigger;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::OperatorError;

/// Error type for scheduler suspension.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
  /// The scheduler is no longer accepting deferrals.
  #[error("scheduler closed")]
  Closed,

  #[error("deferral rejected: {0}")]
  Rejected(String),
}

/// A request to suspend a task until a trigger fires.
pub struct Deferral {
  /// Task being suspended.
  pub task_id: String,
  /// Watches the remote operation out-of-band.
  pub trigger: Arc<dyn Trigger>,
  /// Name of the operator's resumption point.
  pub resume_method: String,
  /// Upper bound on how long the trigger may run.
  pub timeout: Option<Duration>,
}

impl std::fmt::Debug for Deferral {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Deferral")
      .field("task_id", &self.task_id)
      .field("trigger", &self.trigger.descriptor())
      .field("resume_method", &self.resume_method)
      .field("timeout", &self.timeout)
      .finish()
  }
}

/// Suspension capability of the scheduling layer.
///
/// The scheduler takes over the trigger and later resumes the task by calling
/// [`Operator::resume`](crate::Operator::resume) with the named method and the
/// trigger's event.
#[async_trait]
pub trait Scheduler: Send + Sync {
  async fn suspend(&self, deferral: Deferral) -> Result<(), SchedulerError>;
}

/// Context provided to an operator during execution.
#[derive(Clone)]
pub struct TaskContext {
  execution_id: String,
  task_id: String,
  exchange: Arc<dyn Exchange>,
  scheduler: Arc<dyn Scheduler>,
  cancel: CancellationToken,
}

impl TaskContext {
  pub fn new(
    execution_id: impl Into<String>,
    task_id: impl Into<String>,
    exchange: Arc<dyn Exchange>,
    scheduler: Arc<dyn Scheduler>,
  ) -> Self {
    Self {
      execution_id: execution_id.into(),
      task_id: task_id.into(),
      exchange,
      scheduler,
      cancel: CancellationToken::new(),
    }
  }

  /// Use `cancel` to abort blocking waits.
  pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
    self.cancel = cancel;
    self
  }

  pub fn execution_id(&self) -> &str {
    &self.execution_id
  }

  pub fn task_id(&self) -> &str {
    &self.task_id
  }

  pub fn cancellation(&self) -> &CancellationToken {
    &self.cancel
  }

  pub fn scheduler(&self) -> &dyn Scheduler {
    self.scheduler.as_ref()
  }

  /// Publish a value under `key` for this task.
  pub async fn publish(
    &self,
    key: &str,
    value: impl Into<serde_json::Value>,
  ) -> Result<(), OperatorError> {
    let value = value.into();
    debug!(task_id = %self.task_id, key, value = %value, "publishing to exchange");

    self
      .exchange
      .push(ExchangeRecord {
        execution_id: self.execution_id.clone(),
        task_id: self.task_id.clone(),
        key: key.to_string(),
        value,
      })
      .await?;
    Ok(())
  }
}
