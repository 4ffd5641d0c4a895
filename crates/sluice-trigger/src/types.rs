use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Error type for trigger operations.
#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
  #[error("unknown trigger kind: {0}")]
  UnknownKind(String),

  #[error("invalid trigger configuration: {0}")]
  InvalidConfig(String),
}

/// Outcome reported by a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerStatus {
  Success,
  Failed,
}

/// Terminal event emitted by a trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerEvent {
  pub status: TriggerStatus,

  /// The run the trigger watched, when known.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub run_id: Option<String>,

  pub message: String,
}

impl TriggerEvent {
  pub fn success(run_id: impl Into<String>, message: impl Into<String>) -> Self {
    Self {
      status: TriggerStatus::Success,
      run_id: Some(run_id.into()),
      message: message.into(),
    }
  }

  pub fn failed(run_id: Option<String>, message: impl Into<String>) -> Self {
    Self {
      status: TriggerStatus::Failed,
      run_id,
      message: message.into(),
    }
  }

  pub fn is_success(&self) -> bool {
    self.status == TriggerStatus::Success
  }
}

/// Serializable description of a trigger, so a scheduler can persist a
/// deferral and rebuild the trigger later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerDescriptor {
  /// Trigger type name.
  pub kind: String,
  /// Constructor arguments.
  pub kwargs: serde_json::Value,
}

/// A watcher for a remote operation.
#[async_trait]
pub trait Trigger: Send + Sync {
  /// Describe this trigger for persistence.
  fn descriptor(&self) -> TriggerDescriptor;

  /// Watch until the operation is terminal and report its outcome.
  ///
  /// Never returns an error: failures, including cancellation, are reported
  /// as a [`TriggerStatus::Failed`] event.
  async fn run(&self, cancel: CancellationToken) -> TriggerEvent;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_trigger_event_wire_format() {
    let event = TriggerEvent::success("123", "Job completed");
    let value = serde_json::to_value(&event).unwrap();

    assert_eq!(
      value,
      serde_json::json!({"status": "success", "run_id": "123", "message": "Job completed"})
    );
  }

  #[test]
  fn test_failed_event_without_run() {
    let event: TriggerEvent =
      serde_json::from_value(serde_json::json!({"status": "failed", "message": "boom"})).unwrap();

    assert!(!event.is_success());
    assert_eq!(event.run_id, None);
  }
}
