//! Runner error types.

use sluice_operator::OperatorError;

/// Errors that can occur while running a task.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
  /// The operator failed during execution or resumption.
  #[error("task '{task_id}' failed: {source}")]
  Operator {
    task_id: String,
    #[source]
    source: OperatorError,
  },

  /// The operator reported a deferral without suspending.
  #[error("task '{task_id}' deferred without handing over a trigger")]
  MissingDeferral { task_id: String },

  /// The trigger task panicked or was aborted.
  #[error("trigger for task '{task_id}' did not finish: {message}")]
  TriggerAborted { task_id: String, message: String },

  /// Execution was cancelled.
  #[error("execution cancelled")]
  Cancelled,
}
