use async_trait::async_trait;
use sluice_operator::{Deferral, Scheduler, SchedulerError};
use tokio::sync::mpsc;
use tracing::debug;

/// Scheduler that queues deferrals on a channel for the runner to pick up.
#[derive(Debug, Clone)]
pub struct DeferralQueue {
  sender: mpsc::Sender<Deferral>,
}

impl DeferralQueue {
  /// Create a queue and the receiver the runner drains.
  pub fn channel(buffer_size: usize) -> (Self, mpsc::Receiver<Deferral>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (Self { sender }, receiver)
  }
}

#[async_trait]
impl Scheduler for DeferralQueue {
  async fn suspend(&self, deferral: Deferral) -> Result<(), SchedulerError> {
    debug!(
      task_id = %deferral.task_id,
      resume_method = %deferral.resume_method,
      "queueing deferral"
    );
    self
      .sender
      .send(deferral)
      .await
      .map_err(|_| SchedulerError::Closed)
  }
}
