use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sluice_transfer::{CallOptions, RetryConfig, RetryPolicy};

/// Retry behaviour as written in a task file.
///
/// `"default"` and `"disabled"` are plain strings; a custom policy is an
/// object under the `custom` key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryDef {
  #[default]
  Default,
  Disabled,
  Custom {
    max_attempts: u32,
    initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    max_backoff_ms: u64,
    #[serde(default = "default_multiplier")]
    multiplier: f64,
  },
}

fn default_max_backoff_ms() -> u64 {
  RetryConfig::default().max_backoff.as_millis() as u64
}

fn default_multiplier() -> f64 {
  RetryConfig::default().multiplier
}

impl From<RetryDef> for RetryPolicy {
  fn from(def: RetryDef) -> Self {
    match def {
      RetryDef::Default => RetryPolicy::Default,
      RetryDef::Disabled => RetryPolicy::Disabled,
      RetryDef::Custom {
        max_attempts,
        initial_backoff_ms,
        max_backoff_ms,
        multiplier,
      } => RetryPolicy::Custom(RetryConfig {
        max_attempts,
        initial_backoff: Duration::from_millis(initial_backoff_ms),
        max_backoff: Duration::from_millis(max_backoff_ms),
        multiplier,
      }),
    }
  }
}

/// Per-call options shared by every operator definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallDef {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub timeout_ms: Option<u64>,
  #[serde(default)]
  pub retry: RetryDef,
  /// Extra request headers.
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub metadata: BTreeMap<String, String>,
}

impl From<CallDef> for CallOptions {
  fn from(def: CallDef) -> Self {
    CallOptions {
      retry: def.retry.into(),
      timeout: def.timeout_ms.map(Duration::from_millis),
      metadata: def.metadata.into_iter().collect(),
    }
  }
}
