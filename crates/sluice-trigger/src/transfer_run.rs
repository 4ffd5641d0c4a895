use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sluice_transfer::{
  CallOptions, ClientError, GetRunRequest, TransferClient, TransferState, wait_for_terminal_run,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::types::{Trigger, TriggerDescriptor, TriggerError, TriggerEvent};

/// Constructor arguments of a [`TransferRunTrigger`], as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct TransferRunArgs {
  project_id: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  location: Option<String>,
  transfer_config_id: String,
  run_id: String,
  poll_interval_ms: u64,
}

/// Watches a transfer run until it is terminal.
pub struct TransferRunTrigger {
  args: TransferRunArgs,
  client: Arc<dyn TransferClient>,
}

impl TransferRunTrigger {
  pub const KIND: &'static str = "transfer_run";

  pub fn new(
    client: Arc<dyn TransferClient>,
    project_id: impl Into<String>,
    location: Option<String>,
    transfer_config_id: impl Into<String>,
    run_id: impl Into<String>,
    poll_interval: Duration,
  ) -> Self {
    Self {
      args: TransferRunArgs {
        project_id: project_id.into(),
        location,
        transfer_config_id: transfer_config_id.into(),
        run_id: run_id.into(),
        poll_interval_ms: poll_interval.as_millis() as u64,
      },
      client,
    }
  }

  /// Rebuild a trigger from its descriptor.
  pub fn from_descriptor(
    descriptor: &TriggerDescriptor,
    client: Arc<dyn TransferClient>,
  ) -> Result<Self, TriggerError> {
    if descriptor.kind != Self::KIND {
      return Err(TriggerError::UnknownKind(descriptor.kind.clone()));
    }
    let args = serde_json::from_value(descriptor.kwargs.clone())
      .map_err(|e| TriggerError::InvalidConfig(e.to_string()))?;
    Ok(Self { args, client })
  }

  pub fn run_id(&self) -> &str {
    &self.args.run_id
  }

  pub fn poll_interval(&self) -> Duration {
    Duration::from_millis(self.args.poll_interval_ms)
  }

  fn request(&self) -> GetRunRequest {
    GetRunRequest {
      run_id: self.args.run_id.clone(),
      transfer_config_id: self.args.transfer_config_id.clone(),
      project_id: self.args.project_id.clone(),
      location: self.args.location.clone(),
      options: CallOptions::default(),
    }
  }
}

#[async_trait]
impl Trigger for TransferRunTrigger {
  fn descriptor(&self) -> TriggerDescriptor {
    TriggerDescriptor {
      kind: Self::KIND.to_string(),
      // Plain strings and integers; serialization cannot fail.
      kwargs: serde_json::to_value(&self.args).unwrap_or_default(),
    }
  }

  #[instrument(
    name = "transfer_run_trigger",
    skip(self, cancel),
    fields(
      run_id = %self.args.run_id,
      transfer_config_id = %self.args.transfer_config_id,
    )
  )]
  async fn run(&self, cancel: CancellationToken) -> TriggerEvent {
    let run_id = self.args.run_id.clone();
    let result = wait_for_terminal_run(
      self.client.as_ref(),
      &self.request(),
      self.poll_interval(),
      &cancel,
    )
    .await;

    let event = match result {
      Ok(run) => match run.state {
        TransferState::Succeeded => TriggerEvent::success(run_id, "Job completed"),
        TransferState::Cancelled => TriggerEvent::failed(Some(run_id), "Job was cancelled"),
        _ => {
          let detail = run
            .error_status
            .map(|status| format!(": {}", status.message))
            .unwrap_or_default();
          TriggerEvent::failed(Some(run_id), format!("Job has failed{}", detail))
        }
      },
      Err(ClientError::Cancelled) => TriggerEvent::failed(Some(run_id), "Trigger cancelled"),
      Err(e) => {
        TriggerEvent::failed(Some(run_id), format!("Trigger failed with exception: {}", e))
      }
    };

    if event.is_success() {
      info!("transfer run completed");
    } else {
      warn!(message = %event.message, "transfer run did not succeed");
    }

    event
  }
}
