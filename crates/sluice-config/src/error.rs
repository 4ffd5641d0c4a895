/// Errors raised while loading a task definition.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("failed to parse task definition: {0}")]
  Parse(#[from] serde_json::Error),

  #[error("task '{task_id}' sets both requested_time_range and requested_run_time")]
  ConflictingTimeFilters { task_id: String },

  #[error("task '{task_id}' is invalid: {message}")]
  Invalid { task_id: String, message: String },
}
