//! Task runner that drives operators through their deferrals.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sluice_exchange::Exchange;
use sluice_operator::{Deferral, Operator, OperatorError, TaskContext, TaskOutcome};
use sluice_trigger::TriggerEvent;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use crate::error::RunnerError;
use crate::events::{ExecutionNotifier, NoopNotifier, TaskEvent};
use crate::queue::DeferralQueue;

/// Result of a task run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRunResult {
  pub execution_id: String,
  pub task_id: String,
  /// Value returned by the operator, if any.
  pub output: Option<serde_json::Value>,
  /// How many times the operator deferred before completing.
  pub deferrals: usize,
}

/// Runs operators to completion.
///
/// # Usage
///
/// ```ignore
/// let runner = TaskRunner::new(exchange);
/// let result = runner.run(&operator, CancellationToken::new()).await?;
/// ```
pub struct TaskRunner {
  exchange: Arc<dyn Exchange>,
  notifier: Arc<dyn ExecutionNotifier>,
}

impl TaskRunner {
  pub fn new(exchange: Arc<dyn Exchange>) -> Self {
    Self {
      exchange,
      notifier: Arc::new(NoopNotifier),
    }
  }

  pub fn with_notifier(mut self, notifier: Arc<dyn ExecutionNotifier>) -> Self {
    self.notifier = notifier;
    self
  }

  /// Run an operator under a fresh execution id.
  pub async fn run(
    &self,
    operator: &dyn Operator,
    cancel: CancellationToken,
  ) -> Result<TaskRunResult, RunnerError> {
    let execution_id = uuid::Uuid::new_v4().to_string();
    self.run_in(&execution_id, operator, cancel).await
  }

  /// Run an operator as part of an existing execution.
  #[instrument(
    name = "task_run",
    skip(self, operator, cancel),
    fields(task_id = %operator.task_id())
  )]
  pub async fn run_in(
    &self,
    execution_id: &str,
    operator: &dyn Operator,
    cancel: CancellationToken,
  ) -> Result<TaskRunResult, RunnerError> {
    let task_id = operator.task_id().to_string();
    self.notifier.notify(TaskEvent::TaskStarted {
      execution_id: execution_id.to_string(),
      task_id: task_id.clone(),
    });

    let result = self
      .run_inner(execution_id, &task_id, operator, cancel)
      .await;

    match &result {
      Ok(run) => {
        info!(deferrals = run.deferrals, "task completed");
        self.notifier.notify(TaskEvent::TaskCompleted {
          execution_id: execution_id.to_string(),
          task_id,
          output: run.output.clone(),
        });
      }
      Err(e) => {
        error!(error = %e, "task failed");
        self.notifier.notify(TaskEvent::TaskFailed {
          execution_id: execution_id.to_string(),
          task_id,
          error: e.to_string(),
        });
      }
    }

    result
  }

  async fn run_inner(
    &self,
    execution_id: &str,
    task_id: &str,
    operator: &dyn Operator,
    cancel: CancellationToken,
  ) -> Result<TaskRunResult, RunnerError> {
    if cancel.is_cancelled() {
      return Err(RunnerError::Cancelled);
    }

    let (queue, mut deferrals) = DeferralQueue::channel(1);
    let ctx = TaskContext::new(
      execution_id,
      task_id,
      self.exchange.clone(),
      Arc::new(queue),
    )
    .with_cancellation(cancel.clone());

    let operator_error = |source: OperatorError| match source {
      OperatorError::Cancelled => RunnerError::Cancelled,
      source => RunnerError::Operator {
        task_id: task_id.to_string(),
        source,
      },
    };

    let mut outcome = operator.execute(&ctx).await.map_err(operator_error)?;
    let mut deferral_count = 0;

    loop {
      match outcome {
        TaskOutcome::Complete(output) => {
          return Ok(TaskRunResult {
            execution_id: execution_id.to_string(),
            task_id: task_id.to_string(),
            output,
            deferrals: deferral_count,
          });
        }
        TaskOutcome::Deferred => {
          let deferral = deferrals
            .try_recv()
            .map_err(|_| RunnerError::MissingDeferral {
              task_id: task_id.to_string(),
            })?;
          deferral_count += 1;

          let method = deferral.resume_method.clone();
          let event = self
            .await_trigger(execution_id, task_id, deferral, &cancel)
            .await?;

          self.notifier.notify(TaskEvent::TaskResumed {
            execution_id: execution_id.to_string(),
            task_id: task_id.to_string(),
            status: event.status,
          });

          outcome = operator
            .resume(&ctx, &method, event)
            .await
            .map_err(operator_error)?;
        }
      }
    }
  }

  /// Run the deferral's trigger on its own task and wait for its event.
  async fn await_trigger(
    &self,
    execution_id: &str,
    task_id: &str,
    deferral: Deferral,
    cancel: &CancellationToken,
  ) -> Result<TriggerEvent, RunnerError> {
    self.notifier.notify(TaskEvent::TaskDeferred {
      execution_id: execution_id.to_string(),
      task_id: task_id.to_string(),
      trigger: deferral.trigger.descriptor(),
    });
    info!(resume_method = %deferral.resume_method, "task deferred");

    let trigger_cancel = cancel.child_token();
    let trigger = deferral.trigger.clone();
    let token = trigger_cancel.clone();
    let mut handle = tokio::spawn(async move { trigger.run(token).await });

    let joined = match deferral.timeout {
      Some(timeout) => match tokio::time::timeout(timeout, &mut handle).await {
        Ok(joined) => joined,
        Err(_) => {
          trigger_cancel.cancel();
          handle.abort();
          return Ok(TriggerEvent::failed(
            None,
            format!("Trigger timed out after {}ms", timeout.as_millis()),
          ));
        }
      },
      None => handle.await,
    };

    if cancel.is_cancelled() {
      return Err(RunnerError::Cancelled);
    }

    joined.map_err(|e| RunnerError::TriggerAborted {
      task_id: task_id.to_string(),
      message: e.to_string(),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use sluice_exchange::InMemoryExchange;

  #[tokio::test]
  async fn test_cancelled_before_start() {
    struct Never;

    #[async_trait::async_trait]
    impl Operator for Never {
      fn task_id(&self) -> &str {
        "never"
      }

      async fn execute(&self, _ctx: &TaskContext) -> Result<TaskOutcome, OperatorError> {
        panic!("should not execute");
      }
    }

    let runner = TaskRunner::new(Arc::new(InMemoryExchange::new()));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = runner.run(&Never, cancel).await;

    assert!(matches!(result, Err(RunnerError::Cancelled)));
  }
}
