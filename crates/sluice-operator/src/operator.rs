use async_trait::async_trait;
use sluice_trigger::TriggerEvent;

use crate::context::TaskContext;
use crate::error::OperatorError;

/// How an execution (or resumption) ended.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
  /// Finished, optionally returning a result to the caller.
  Complete(Option<serde_json::Value>),
  /// Suspended; the scheduler holds a deferral for this task.
  Deferred,
}

/// A unit of work executed once per task run.
#[async_trait]
pub trait Operator: Send + Sync {
  /// Identifier of the task within its workflow.
  fn task_id(&self) -> &str;

  /// Run the operator.
  async fn execute(&self, ctx: &TaskContext) -> Result<TaskOutcome, OperatorError>;

  /// Continue a deferred execution once its trigger has fired.
  ///
  /// Operators that never defer keep the default, which rejects every method.
  async fn resume(
    &self,
    _ctx: &TaskContext,
    method: &str,
    _event: TriggerEvent,
  ) -> Result<TaskOutcome, OperatorError> {
    Err(OperatorError::UnknownResumeMethod(method.to_string()))
  }
}
