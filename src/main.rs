use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sluice_config::TaskFile;
use sluice_exchange::{Exchange, FsExchange};
use sluice_runner::TaskRunner;
use sluice_transfer::HttpTransferClient;

/// Sluice - deferred operators for a managed data transfer service
#[derive(Parser)]
#[command(name = "sluice")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.sluice)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Run a single task
  Run {
    /// Path to the task file (JSON)
    task_file: PathBuf,

    /// Execution to publish under (default: a fresh id)
    #[arg(long)]
    execution_id: Option<String>,
  },

  /// Print the values published by an execution
  Exchange {
    /// The execution to inspect
    execution_id: String,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  let data_dir = match cli.data_dir {
    Some(dir) => dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".sluice"),
  };

  match cli.command {
    Some(Commands::Run {
      task_file,
      execution_id,
    }) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(run_task(task_file, execution_id, data_dir))?;
    }
    Some(Commands::Exchange { execution_id }) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(show_exchange(execution_id, data_dir))?;
    }
    None => {
      println!("sluice - use --help to see available commands");
    }
  }

  Ok(())
}

async fn run_task(
  task_file: PathBuf,
  execution_id: Option<String>,
  data_dir: PathBuf,
) -> Result<()> {
  let content = tokio::fs::read_to_string(&task_file)
    .await
    .with_context(|| format!("failed to read task file: {}", task_file.display()))?;

  let TaskFile { client, task } = TaskFile::from_json(&content)
    .with_context(|| format!("invalid task file: {}", task_file.display()))?;

  let mut transfer = HttpTransferClient::new(&client.endpoint);
  match client.access_token() {
    Some(token) => transfer = transfer.with_access_token(token),
    None => warn!(
      env = %client.access_token_env,
      "no access token set, sending unauthenticated requests"
    ),
  }

  let task_id = task.task_id().to_string();
  let operator = task
    .build(Arc::new(transfer))
    .context("failed to build operator")?;

  let exchange = Arc::new(FsExchange::new(data_dir.join("exchange")));
  let runner = TaskRunner::new(exchange);

  let cancel = CancellationToken::new();
  let on_interrupt = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      warn!("interrupted, cancelling task");
      on_interrupt.cancel();
    }
  });

  info!(task_id = %task_id, endpoint = %client.endpoint, "running task");

  let result = match execution_id {
    Some(id) => runner.run_in(&id, operator.as_ref(), cancel).await,
    None => runner.run(operator.as_ref(), cancel).await,
  }
  .with_context(|| format!("task '{}' failed", task_id))?;

  eprintln!("Execution completed: {}", result.execution_id);

  println!("{}", serde_json::to_string_pretty(&result)?);

  Ok(())
}

async fn show_exchange(execution_id: String, data_dir: PathBuf) -> Result<()> {
  let exchange = FsExchange::new(data_dir.join("exchange"));
  let records = exchange
    .records(&execution_id)
    .await
    .with_context(|| format!("failed to read exchange for execution '{}'", execution_id))?;

  println!("{}", serde_json::to_string_pretty(&records)?);

  Ok(())
}
