//! Task events and notifiers for observability.
//!
//! Events are emitted while a task runs so consumers can observe progress,
//! persist state, stream to UIs, etc.

use serde::{Deserialize, Serialize};
use sluice_trigger::{TriggerDescriptor, TriggerStatus};
use tokio::sync::mpsc;

/// Events emitted while running a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TaskEvent {
  /// The operator started executing.
  TaskStarted {
    execution_id: String,
    task_id: String,
  },

  /// The operator suspended on a trigger.
  TaskDeferred {
    execution_id: String,
    task_id: String,
    trigger: TriggerDescriptor,
  },

  /// The trigger fired and the operator is being resumed.
  TaskResumed {
    execution_id: String,
    task_id: String,
    status: TriggerStatus,
  },

  /// The task completed successfully.
  TaskCompleted {
    execution_id: String,
    task_id: String,
    output: Option<serde_json::Value>,
  },

  /// The task failed.
  TaskFailed {
    execution_id: String,
    task_id: String,
    error: String,
  },
}

/// Trait for receiving task events.
///
/// The runner calls `notify` for each event; implementations decide what to do
/// with them (persist, broadcast, log, ignore, etc.).
pub trait ExecutionNotifier: Send + Sync {
  fn notify(&self, event: TaskEvent);
}

/// A no-op notifier that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl ExecutionNotifier for NoopNotifier {
  fn notify(&self, _event: TaskEvent) {}
}

/// A notifier that sends events to an unbounded channel.
///
/// Event volume is a handful per task, so the channel is left unbounded to
/// keep a slow consumer from stalling the runner.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  sender: mpsc::UnboundedSender<TaskEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<TaskEvent>) -> Self {
    Self { sender }
  }
}

impl ExecutionNotifier for ChannelNotifier {
  fn notify(&self, event: TaskEvent) {
    // Receiver may have been dropped
    let _ = self.sender.send(event);
  }
}
