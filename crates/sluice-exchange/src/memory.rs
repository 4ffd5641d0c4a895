use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{Error, Exchange, ExchangeRecord};

/// In-memory exchange.
///
/// Besides the current records it keeps the full push log, so tests can
/// assert how many times a task published. Suitable for single-process use or
/// testing.
#[derive(Debug, Default)]
pub struct InMemoryExchange {
  state: RwLock<State>,
}

#[derive(Debug, Default)]
struct State {
  records: Vec<ExchangeRecord>,
  pushes: Vec<ExchangeRecord>,
}

impl InMemoryExchange {
  pub fn new() -> Self {
    Self::default()
  }

  /// Every push received, in order, including overwritten ones.
  pub async fn pushes(&self) -> Vec<ExchangeRecord> {
    self.state.read().await.pushes.clone()
  }
}

#[async_trait]
impl Exchange for InMemoryExchange {
  async fn push(&self, record: ExchangeRecord) -> Result<(), Error> {
    let mut state = self.state.write().await;
    state.pushes.push(record.clone());
    state.records.retain(|existing| !existing.same_slot(&record));
    state.records.push(record);
    Ok(())
  }

  async fn pull(
    &self,
    execution_id: &str,
    task_id: &str,
    key: &str,
  ) -> Result<Option<serde_json::Value>, Error> {
    let state = self.state.read().await;
    Ok(
      state
        .records
        .iter()
        .find(|r| r.execution_id == execution_id && r.task_id == task_id && r.key == key)
        .map(|r| r.value.clone()),
    )
  }

  async fn records(&self, execution_id: &str) -> Result<Vec<ExchangeRecord>, Error> {
    let state = self.state.read().await;
    Ok(
      state
        .records
        .iter()
        .filter(|r| r.execution_id == execution_id)
        .cloned()
        .collect(),
    )
  }
}
