use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sluice_operator::{
  CreateTransferConfigOperator, DeleteTransferConfigOperator, Operator,
  StartTransferRunsOperator,
};
use sluice_transfer::{TimeFilter, TimeRange, TransferClient, TransferConfig};

use crate::call::{CallDef, RetryDef};
use crate::error::ConfigError;
use crate::settings::ClientSettings;

/// A task file: one operator definition plus client settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskFile {
  #[serde(default)]
  pub client: ClientSettings,
  #[serde(flatten)]
  pub task: TaskDef,
}

impl TaskFile {
  /// Parse and validate a task file.
  pub fn from_json(content: &str) -> Result<Self, ConfigError> {
    let file: TaskFile = serde_json::from_str(content)?;
    file.task.validate()?;
    Ok(file)
  }
}

/// Definition of a single operator task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operator", rename_all = "snake_case")]
pub enum TaskDef {
  CreateTransferConfig(CreateConfigDef),
  DeleteTransferConfig(DeleteConfigDef),
  StartTransferRuns(StartRunsDef),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateConfigDef {
  pub task_id: String,
  pub project_id: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub location: Option<String>,
  pub transfer_config: TransferConfig,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub authorization_code: Option<String>,
  #[serde(flatten)]
  pub call: CallDef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteConfigDef {
  pub task_id: String,
  pub project_id: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub location: Option<String>,
  pub transfer_config_id: String,
  #[serde(flatten)]
  pub call: CallDef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartRunsDef {
  pub task_id: String,
  pub project_id: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub location: Option<String>,
  pub transfer_config_id: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub requested_time_range: Option<TimeRange>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub requested_run_time: Option<DateTime<Utc>>,
  /// Hand the wait over to a trigger instead of polling in place.
  #[serde(default)]
  pub deferrable: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub poll_interval_secs: Option<u64>,
  /// Upper bound on how long a deferred trigger may wait.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub trigger_timeout_secs: Option<u64>,
  #[serde(flatten)]
  pub call: CallDef,
}

impl StartRunsDef {
  fn time_filter(&self) -> Result<TimeFilter, ConfigError> {
    match (&self.requested_time_range, self.requested_run_time) {
      (Some(_), Some(_)) => Err(ConfigError::ConflictingTimeFilters {
        task_id: self.task_id.clone(),
      }),
      (Some(range), None) => Ok(TimeFilter::Range(range.clone())),
      (None, Some(time)) => Ok(TimeFilter::Point(time)),
      (None, None) => Ok(TimeFilter::None),
    }
  }
}

impl TaskDef {
  pub fn task_id(&self) -> &str {
    match self {
      TaskDef::CreateTransferConfig(def) => &def.task_id,
      TaskDef::DeleteTransferConfig(def) => &def.task_id,
      TaskDef::StartTransferRuns(def) => &def.task_id,
    }
  }

  fn project_id(&self) -> &str {
    match self {
      TaskDef::CreateTransferConfig(def) => &def.project_id,
      TaskDef::DeleteTransferConfig(def) => &def.project_id,
      TaskDef::StartTransferRuns(def) => &def.project_id,
    }
  }

  fn call(&self) -> &CallDef {
    match self {
      TaskDef::CreateTransferConfig(def) => &def.call,
      TaskDef::DeleteTransferConfig(def) => &def.call,
      TaskDef::StartTransferRuns(def) => &def.call,
    }
  }

  /// Check the definition for values no operator can run with.
  pub fn validate(&self) -> Result<(), ConfigError> {
    let invalid = |message: &str| ConfigError::Invalid {
      task_id: self.task_id().to_string(),
      message: message.to_string(),
    };

    if self.task_id().is_empty() {
      return Err(invalid("task_id must not be empty"));
    }
    if self.project_id().is_empty() {
      return Err(invalid("project_id must not be empty"));
    }
    if let RetryDef::Custom {
      max_attempts,
      multiplier,
      ..
    } = &self.call().retry
    {
      if *max_attempts == 0 {
        return Err(invalid("retry max_attempts must be at least 1"));
      }
      if !multiplier.is_finite() || *multiplier < 1.0 {
        return Err(invalid("retry multiplier must be a finite number of at least 1"));
      }
    }

    match self {
      TaskDef::CreateTransferConfig(_) => Ok(()),
      TaskDef::DeleteTransferConfig(def) => {
        if def.transfer_config_id.is_empty() {
          return Err(invalid("transfer_config_id must not be empty"));
        }
        Ok(())
      }
      TaskDef::StartTransferRuns(def) => {
        if def.transfer_config_id.is_empty() {
          return Err(invalid("transfer_config_id must not be empty"));
        }
        if def.poll_interval_secs == Some(0) {
          return Err(invalid("poll_interval_secs must be positive"));
        }
        def.time_filter().map(|_| ())
      }
    }
  }

  /// Build the operator this definition describes.
  pub fn build(self, client: Arc<dyn TransferClient>) -> Result<Box<dyn Operator>, ConfigError> {
    self.validate()?;

    let operator: Box<dyn Operator> = match self {
      TaskDef::CreateTransferConfig(def) => {
        let mut operator = CreateTransferConfigOperator::new(
          def.task_id,
          client,
          def.transfer_config,
          def.project_id,
        )
        .with_options(def.call.into());
        if let Some(location) = def.location {
          operator = operator.with_location(location);
        }
        if let Some(code) = def.authorization_code {
          operator = operator.with_authorization_code(code);
        }
        Box::new(operator)
      }
      TaskDef::DeleteTransferConfig(def) => {
        let mut operator = DeleteTransferConfigOperator::new(
          def.task_id,
          client,
          def.transfer_config_id,
          def.project_id,
        )
        .with_options(def.call.into());
        if let Some(location) = def.location {
          operator = operator.with_location(location);
        }
        Box::new(operator)
      }
      TaskDef::StartTransferRuns(def) => {
        let time_filter = def.time_filter()?;
        let mut operator = StartTransferRunsOperator::new(
          def.task_id,
          client,
          def.transfer_config_id,
          def.project_id,
        )
        .with_time_filter(time_filter)
        .with_options(def.call.into())
        .deferrable(def.deferrable);
        if let Some(location) = def.location {
          operator = operator.with_location(location);
        }
        if let Some(secs) = def.poll_interval_secs {
          operator = operator.with_poll_interval(Duration::from_secs(secs));
        }
        if let Some(secs) = def.trigger_timeout_secs {
          operator = operator.with_trigger_timeout(Duration::from_secs(secs));
        }
        Box::new(operator)
      }
    };

    Ok(operator)
  }
}
