use std::sync::Arc;

use async_trait::async_trait;
use sluice_transfer::{CallOptions, DeleteConfigRequest, TransferClient};
use tracing::{error, info, instrument};

use crate::context::TaskContext;
use crate::error::OperatorError;
use crate::operator::{Operator, TaskOutcome};

/// Deletes a transfer configuration. Publishes nothing.
pub struct DeleteTransferConfigOperator {
  task_id: String,
  transfer_config_id: String,
  project_id: String,
  location: Option<String>,
  options: CallOptions,
  client: Arc<dyn TransferClient>,
}

impl DeleteTransferConfigOperator {
  pub fn new(
    task_id: impl Into<String>,
    client: Arc<dyn TransferClient>,
    transfer_config_id: impl Into<String>,
    project_id: impl Into<String>,
  ) -> Self {
    Self {
      task_id: task_id.into(),
      transfer_config_id: transfer_config_id.into(),
      project_id: project_id.into(),
      location: None,
      options: CallOptions::default(),
      client,
    }
  }

  pub fn with_location(mut self, location: impl Into<String>) -> Self {
    self.location = Some(location.into());
    self
  }

  pub fn with_options(mut self, options: CallOptions) -> Self {
    self.options = options;
    self
  }
}

#[async_trait]
impl Operator for DeleteTransferConfigOperator {
  fn task_id(&self) -> &str {
    &self.task_id
  }

  #[instrument(
    name = "delete_transfer_config",
    skip(self, _ctx),
    fields(task_id = %self.task_id, transfer_config_id = %self.transfer_config_id)
  )]
  async fn execute(&self, _ctx: &TaskContext) -> Result<TaskOutcome, OperatorError> {
    info!("deleting transfer config");

    let result = self
      .client
      .delete_transfer_config(DeleteConfigRequest {
        transfer_config_id: self.transfer_config_id.clone(),
        project_id: self.project_id.clone(),
        location: self.location.clone(),
        options: self.options.clone(),
      })
      .await;

    match result {
      Ok(()) => {
        info!("transfer config deleted");
        Ok(TaskOutcome::Complete(None))
      }
      Err(e) => {
        error!(error = %e, "delete transfer config failed");
        Err(e.into())
      }
    }
  }
}
