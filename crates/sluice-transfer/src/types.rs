use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A scheduled data transfer configuration.
///
/// Serializes with snake_case field names. Deserialization also accepts the
/// service's lowerCamelCase JSON mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransferConfig {
  /// Resource name, assigned by the service on creation.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,

  #[serde(default, alias = "displayName", skip_serializing_if = "Option::is_none")]
  pub display_name: Option<String>,

  #[serde(default, alias = "dataSourceId", skip_serializing_if = "Option::is_none")]
  pub data_source_id: Option<String>,

  #[serde(
    default,
    alias = "destinationDatasetId",
    skip_serializing_if = "Option::is_none"
  )]
  pub destination_dataset_id: Option<String>,

  /// Data source specific parameters. May carry credentials.
  #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
  pub params: serde_json::Map<String, serde_json::Value>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub schedule: Option<String>,

  #[serde(default, alias = "scheduleOptions", skip_serializing_if = "Option::is_none")]
  pub schedule_options: Option<ScheduleOptions>,

  #[serde(
    default,
    alias = "dataRefreshWindowDays",
    skip_serializing_if = "Option::is_none"
  )]
  pub data_refresh_window_days: Option<i32>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub disabled: Option<bool>,

  #[serde(default, alias = "updateTime", skip_serializing_if = "Option::is_none")]
  pub update_time: Option<DateTime<Utc>>,

  #[serde(default, alias = "nextRunTime", skip_serializing_if = "Option::is_none")]
  pub next_run_time: Option<DateTime<Utc>>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub state: Option<TransferState>,

  #[serde(default, alias = "datasetRegion", skip_serializing_if = "Option::is_none")]
  pub dataset_region: Option<String>,

  #[serde(
    default,
    alias = "notificationPubsubTopic",
    skip_serializing_if = "Option::is_none"
  )]
  pub notification_pubsub_topic: Option<String>,
}

/// Scheduling options of a transfer configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleOptions {
  #[serde(
    default,
    alias = "disableAutoScheduling",
    skip_serializing_if = "Option::is_none"
  )]
  pub disable_auto_scheduling: Option<bool>,

  #[serde(default, alias = "startTime", skip_serializing_if = "Option::is_none")]
  pub start_time: Option<DateTime<Utc>>,

  #[serde(default, alias = "endTime", skip_serializing_if = "Option::is_none")]
  pub end_time: Option<DateTime<Utc>>,
}

/// State of a transfer run (or of a configuration's latest run).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferState {
  #[default]
  #[serde(rename = "TRANSFER_STATE_UNSPECIFIED")]
  Unspecified,
  Pending,
  Running,
  Succeeded,
  Failed,
  Cancelled,
}

impl TransferState {
  /// No further transitions happen from a terminal state.
  pub fn is_terminal(self) -> bool {
    matches!(
      self,
      TransferState::Succeeded | TransferState::Failed | TransferState::Cancelled
    )
  }

  /// Terminal but not successful.
  pub fn is_failure(self) -> bool {
    matches!(self, TransferState::Failed | TransferState::Cancelled)
  }
}

impl std::fmt::Display for TransferState {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let s = match self {
      TransferState::Unspecified => "TRANSFER_STATE_UNSPECIFIED",
      TransferState::Pending => "PENDING",
      TransferState::Running => "RUNNING",
      TransferState::Succeeded => "SUCCEEDED",
      TransferState::Failed => "FAILED",
      TransferState::Cancelled => "CANCELLED",
    };
    f.write_str(s)
  }
}

/// A single run of a transfer configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransferRun {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,

  #[serde(default)]
  pub state: TransferState,

  #[serde(default, alias = "scheduleTime", skip_serializing_if = "Option::is_none")]
  pub schedule_time: Option<DateTime<Utc>>,

  #[serde(default, alias = "runTime", skip_serializing_if = "Option::is_none")]
  pub run_time: Option<DateTime<Utc>>,

  #[serde(default, alias = "startTime", skip_serializing_if = "Option::is_none")]
  pub start_time: Option<DateTime<Utc>>,

  #[serde(default, alias = "endTime", skip_serializing_if = "Option::is_none")]
  pub end_time: Option<DateTime<Utc>>,

  #[serde(default, alias = "errorStatus", skip_serializing_if = "Option::is_none")]
  pub error_status: Option<RunStatus>,

  #[serde(default, alias = "dataSourceId", skip_serializing_if = "Option::is_none")]
  pub data_source_id: Option<String>,

  #[serde(
    default,
    alias = "destinationDatasetId",
    skip_serializing_if = "Option::is_none"
  )]
  pub destination_dataset_id: Option<String>,
}

/// Error details reported for a failed run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatus {
  #[serde(default)]
  pub code: i32,
  #[serde(default)]
  pub message: String,
}

/// Response of a manual run request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StartRunsResponse {
  #[serde(default)]
  pub runs: Vec<TransferRun>,
}

/// A range of data times to backfill.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
  #[serde(default, alias = "startTime", skip_serializing_if = "Option::is_none")]
  pub start_time: Option<DateTime<Utc>>,
  #[serde(default, alias = "endTime", skip_serializing_if = "Option::is_none")]
  pub end_time: Option<DateTime<Utc>>,
}

/// Which data time(s) a manual run targets.
///
/// Exactly one form is active at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TimeFilter {
  /// Let the service pick the current run time.
  #[default]
  None,
  /// Start one run per scheduled time in the range.
  Range(TimeRange),
  /// Start a single run for this data time.
  Point(DateTime<Utc>),
}

impl TimeFilter {
  pub fn requested_time_range(&self) -> Option<TimeRange> {
    match self {
      TimeFilter::Range(range) => Some(range.clone()),
      _ => None,
    }
  }

  pub fn requested_run_time(&self) -> Option<DateTime<Utc>> {
    match self {
      TimeFilter::Point(at) => Some(*at),
      _ => None,
    }
  }
}

/// Retry behaviour of a single client call.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RetryPolicy {
  /// The client's built-in policy.
  #[default]
  Default,
  /// Make exactly one attempt.
  Disabled,
  Custom(RetryConfig),
}

impl RetryPolicy {
  /// Resolve to concrete settings.
  pub fn config(&self) -> RetryConfig {
    match self {
      RetryPolicy::Default => RetryConfig::default(),
      RetryPolicy::Disabled => RetryConfig {
        max_attempts: 1,
        ..RetryConfig::default()
      },
      RetryPolicy::Custom(config) => config.clone(),
    }
  }
}

/// Exponential backoff settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
  pub max_attempts: u32,
  pub initial_backoff: Duration,
  pub max_backoff: Duration,
  pub multiplier: f64,
}

impl Default for RetryConfig {
  fn default() -> Self {
    Self {
      max_attempts: 3,
      initial_backoff: Duration::from_secs(1),
      max_backoff: Duration::from_secs(30),
      multiplier: 2.0,
    }
  }
}

impl RetryConfig {
  /// Delay before retry number `retry` (1-based).
  pub fn backoff(&self, retry: u32) -> Duration {
    let exponent = i32::try_from(retry.saturating_sub(1)).unwrap_or(i32::MAX);
    let factor = self.multiplier.powi(exponent);
    let secs = (self.initial_backoff.as_secs_f64() * factor)
      .min(self.max_backoff.as_secs_f64());
    // Negative or NaN delays come from a nonsensical multiplier; wait the maximum instead.
    Duration::try_from_secs_f64(secs).unwrap_or(self.max_backoff)
  }
}

/// Per-call policy passed through to the client.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallOptions {
  pub retry: RetryPolicy,
  pub timeout: Option<Duration>,
  /// Extra request headers.
  pub metadata: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateConfigRequest {
  pub transfer_config: TransferConfig,
  pub project_id: String,
  pub location: Option<String>,
  pub authorization_code: Option<String>,
  pub options: CallOptions,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteConfigRequest {
  pub transfer_config_id: String,
  pub project_id: String,
  pub location: Option<String>,
  pub options: CallOptions,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StartRunsRequest {
  pub transfer_config_id: String,
  pub project_id: String,
  pub location: Option<String>,
  pub requested_time_range: Option<TimeRange>,
  pub requested_run_time: Option<DateTime<Utc>>,
  pub options: CallOptions,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GetRunRequest {
  pub run_id: String,
  pub transfer_config_id: String,
  pub project_id: String,
  pub location: Option<String>,
  pub options: CallOptions,
}
