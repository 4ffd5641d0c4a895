use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use crate::{Error, Exchange, ExchangeRecord};

/// Filesystem-based exchange.
///
/// Each execution's records live in `{base_path}/{execution_id}.json` as a JSON
/// array. Writes within one process are serialized; the base directory is
/// created on first push.
pub struct FsExchange {
  base_path: PathBuf,
  write_lock: Mutex<()>,
}

impl FsExchange {
  /// Create a new filesystem exchange rooted at `base_path`.
  pub fn new(base_path: impl Into<PathBuf>) -> Self {
    Self {
      base_path: base_path.into(),
      write_lock: Mutex::new(()),
    }
  }

  /// File holding an execution's records. Ids that could escape the base
  /// directory are rejected.
  fn execution_path(&self, execution_id: &str) -> Result<PathBuf, Error> {
    if execution_id.is_empty()
      || execution_id.contains(['/', '\\'])
      || execution_id.contains("..")
    {
      return Err(Error::InvalidExecutionId(execution_id.to_string()));
    }
    Ok(self.base_path.join(format!("{}.json", execution_id)))
  }

  async fn load(&self, execution_id: &str) -> Result<Vec<ExchangeRecord>, Error> {
    match fs::read(self.execution_path(execution_id)?).await {
      Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
      Err(e) => Err(Error::Io(e)),
    }
  }
}

#[async_trait]
impl Exchange for FsExchange {
  async fn push(&self, record: ExchangeRecord) -> Result<(), Error> {
    let _guard = self.write_lock.lock().await;

    let path = self.execution_path(&record.execution_id)?;
    let mut records = self.load(&record.execution_id).await?;
    records.retain(|existing| !existing.same_slot(&record));
    debug!(path = %path.display(), key = %record.key, "writing exchange record");
    records.push(record);

    fs::create_dir_all(&self.base_path).await?;
    fs::write(&path, serde_json::to_vec_pretty(&records)?).await?;
    Ok(())
  }

  async fn pull(
    &self,
    execution_id: &str,
    task_id: &str,
    key: &str,
  ) -> Result<Option<serde_json::Value>, Error> {
    let records = self.load(execution_id).await?;
    Ok(
      records
        .into_iter()
        .find(|r| r.task_id == task_id && r.key == key)
        .map(|r| r.value),
    )
  }

  async fn records(&self, execution_id: &str) -> Result<Vec<ExchangeRecord>, Error> {
    self.load(execution_id).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_fs_exchange_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let exchange = FsExchange::new(dir.path().join("exchange"));

    assert_eq!(exchange.records("exec-1").await.unwrap(), vec![]);

    exchange
      .push(ExchangeRecord {
        execution_id: "exec-1".to_string(),
        task_id: "create".to_string(),
        key: "transfer_config_id".to_string(),
        value: serde_json::json!("1a2b3c"),
      })
      .await
      .unwrap();
    exchange
      .push(ExchangeRecord {
        execution_id: "exec-1".to_string(),
        task_id: "start".to_string(),
        key: "run_id".to_string(),
        value: serde_json::json!("123"),
      })
      .await
      .unwrap();

    // A fresh handle sees what the first one wrote.
    let reopened = FsExchange::new(dir.path().join("exchange"));
    assert_eq!(
      reopened
        .pull("exec-1", "create", "transfer_config_id")
        .await
        .unwrap(),
      Some(serde_json::json!("1a2b3c"))
    );
    assert_eq!(reopened.records("exec-1").await.unwrap().len(), 2);
    assert!(dir.path().join("exchange/exec-1.json").exists());
  }

  #[tokio::test]
  async fn test_fs_exchange_rejects_escaping_ids() {
    let dir = tempfile::tempdir().unwrap();
    let exchange = FsExchange::new(dir.path().join("exchange"));

    for id in ["../outside", "nested/id", "nested\\id", "..", ""] {
      let result = exchange
        .push(ExchangeRecord {
          execution_id: id.to_string(),
          task_id: "start".to_string(),
          key: "run_id".to_string(),
          value: serde_json::json!("123"),
        })
        .await;
      assert!(
        matches!(result, Err(Error::InvalidExecutionId(_))),
        "push with {:?} should be rejected",
        id
      );
      assert!(matches!(
        exchange.records(id).await,
        Err(Error::InvalidExecutionId(_))
      ));
    }

    assert!(!dir.path().join("outside.json").exists());
  }

  #[tokio::test]
  async fn test_fs_exchange_overwrites_key() {
    let dir = tempfile::tempdir().unwrap();
    let exchange = FsExchange::new(dir.path());

    for value in ["1", "2"] {
      exchange
        .push(ExchangeRecord {
          execution_id: "exec".to_string(),
          task_id: "start".to_string(),
          key: "run_id".to_string(),
          value: serde_json::json!(value),
        })
        .await
        .unwrap();
    }

    let records = exchange.records("exec").await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].value, "2");
  }
}
