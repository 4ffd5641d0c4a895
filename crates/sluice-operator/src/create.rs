use std::sync::Arc;

use async_trait::async_trait;
use sluice_transfer::{CallOptions, CreateConfigRequest, TransferClient, TransferConfig, object_id};
use tracing::{error, info, instrument};

use crate::context::TaskContext;
use crate::error::OperatorError;
use crate::operator::{Operator, TaskOutcome};
use crate::sanitize::strip_sensitive;

/// Exchange key holding the id of a created transfer config.
pub const TRANSFER_CONFIG_ID_KEY: &str = "transfer_config_id";

/// Creates a transfer configuration.
///
/// Publishes the new config's id under [`TRANSFER_CONFIG_ID_KEY`] and returns
/// the created config as JSON with credentials removed.
pub struct CreateTransferConfigOperator {
  task_id: String,
  transfer_config: TransferConfig,
  project_id: String,
  location: Option<String>,
  authorization_code: Option<String>,
  options: CallOptions,
  client: Arc<dyn TransferClient>,
}

impl CreateTransferConfigOperator {
  pub fn new(
    task_id: impl Into<String>,
    client: Arc<dyn TransferClient>,
    transfer_config: TransferConfig,
    project_id: impl Into<String>,
  ) -> Self {
    Self {
      task_id: task_id.into(),
      transfer_config,
      project_id: project_id.into(),
      location: None,
      authorization_code: None,
      options: CallOptions::default(),
      client,
    }
  }

  pub fn with_location(mut self, location: impl Into<String>) -> Self {
    self.location = Some(location.into());
    self
  }

  /// Authorization code for data sources that need user consent.
  pub fn with_authorization_code(mut self, code: impl Into<String>) -> Self {
    self.authorization_code = Some(code.into());
    self
  }

  pub fn with_options(mut self, options: CallOptions) -> Self {
    self.options = options;
    self
  }

  async fn execute_inner(&self, ctx: &TaskContext) -> Result<TaskOutcome, OperatorError> {
    let config = self
      .client
      .create_transfer_config(CreateConfigRequest {
        transfer_config: self.transfer_config.clone(),
        project_id: self.project_id.clone(),
        location: self.location.clone(),
        authorization_code: self.authorization_code.clone(),
        options: self.options.clone(),
      })
      .await?;

    let transfer_config_id = config
      .name
      .as_deref()
      .and_then(object_id)
      .ok_or_else(|| OperatorError::missing("transfer config name"))?
      .to_string();

    let mut result = serde_json::to_value(&config)?;
    strip_sensitive(&mut result);

    ctx
      .publish(TRANSFER_CONFIG_ID_KEY, transfer_config_id.clone())
      .await?;
    info!(%transfer_config_id, "transfer config created");

    Ok(TaskOutcome::Complete(Some(result)))
  }
}

#[async_trait]
impl Operator for CreateTransferConfigOperator {
  fn task_id(&self) -> &str {
    &self.task_id
  }

  #[instrument(
    name = "create_transfer_config",
    skip(self, ctx),
    fields(task_id = %self.task_id, project_id = %self.project_id)
  )]
  async fn execute(&self, ctx: &TaskContext) -> Result<TaskOutcome, OperatorError> {
    info!("creating transfer config");

    let result = self.execute_inner(ctx).await;
    if let Err(e) = &result {
      error!(error = %e, "create transfer config failed");
    }
    result
  }
}
