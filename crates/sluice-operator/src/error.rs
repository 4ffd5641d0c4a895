use sluice_transfer::{ClientError, TransferState};

use crate::context::SchedulerError;
use crate::start_runs::RunPhase;

/// Errors that fail an operator execution.
#[derive(Debug, thiserror::Error)]
pub enum OperatorError {
  /// The transfer service call failed.
  #[error("transfer service call failed: {0}")]
  Client(#[source] ClientError),

  /// Publishing to the exchange failed.
  #[error("exchange publish failed: {0}")]
  Exchange(#[from] sluice_exchange::Error),

  /// The scheduler refused the deferral.
  #[error("failed to defer task: {0}")]
  Scheduler(#[from] SchedulerError),

  /// The service response lacked an identifier the operator needs.
  #[error("response is missing {what}")]
  MissingIdentifier { what: String },

  /// A polled run ended in a failure state.
  #[error("transfer run {run_id} finished with {state} status")]
  RunFailed { run_id: String, state: TransferState },

  /// The trigger resumed the task with a failure.
  #[error("trigger reported failure: {0}")]
  TriggerFailed(String),

  /// A resumption arrived while no trigger was outstanding.
  #[error("cannot resume while the run is {phase:?}")]
  NotAwaitingTrigger { phase: RunPhase },

  /// The trigger reported on a different run than the one dispatched.
  #[error("trigger reported run {reported}, expected {expected}")]
  RunMismatch { expected: String, reported: String },

  /// The task was resumed at a point this operator does not define.
  #[error("unknown resume method: {0}")]
  UnknownResumeMethod(String),

  /// The result could not be converted to JSON.
  #[error("failed to serialize result: {0}")]
  Serialization(#[from] serde_json::Error),

  /// Execution was cancelled.
  #[error("execution cancelled")]
  Cancelled,
}

impl From<ClientError> for OperatorError {
  fn from(e: ClientError) -> Self {
    match e {
      ClientError::Cancelled => OperatorError::Cancelled,
      other => OperatorError::Client(other),
    }
  }
}

impl OperatorError {
  pub(crate) fn missing(what: impl Into<String>) -> Self {
    OperatorError::MissingIdentifier { what: what.into() }
  }
}
