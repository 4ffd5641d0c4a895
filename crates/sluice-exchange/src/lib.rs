//! Sluice Exchange
//!
//! This crate provides the run-scoped key-value exchange operators publish
//! small results into (config ids, run ids) so downstream tasks can read them.
//!
//! The [`Exchange`] trait is the storage seam. Implementations:
//! - [`InMemoryExchange`] keeps records in memory and logs every push
//! - [`FsExchange`] persists one JSON document per execution
//!
//! Records are keyed by `(execution_id, task_id, key)`. A later push to the
//! same key replaces the earlier value.

mod fs;
mod memory;

pub use fs::FsExchange;
pub use memory::InMemoryExchange;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Error type for exchange operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// An I/O error occurred.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  /// The execution id cannot name a file inside the exchange directory.
  #[error("invalid execution id: {0:?}")]
  InvalidExecutionId(String),

  /// A record could not be encoded or decoded.
  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

/// A value published by a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRecord {
  pub execution_id: String,
  pub task_id: String,
  pub key: String,
  pub value: serde_json::Value,
}

impl ExchangeRecord {
  fn same_slot(&self, other: &ExchangeRecord) -> bool {
    self.execution_id == other.execution_id && self.task_id == other.task_id && self.key == other.key
  }
}

/// Run-scoped key-value exchange.
#[async_trait]
pub trait Exchange: Send + Sync {
  /// Publish a record.
  async fn push(&self, record: ExchangeRecord) -> Result<(), Error>;

  /// Read the current value of a key, if any.
  async fn pull(
    &self,
    execution_id: &str,
    task_id: &str,
    key: &str,
  ) -> Result<Option<serde_json::Value>, Error>;

  /// All current records of an execution.
  async fn records(&self, execution_id: &str) -> Result<Vec<ExchangeRecord>, Error>;
}
