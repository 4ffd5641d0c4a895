use async_trait::async_trait;

use crate::error::ClientError;
use crate::types::{
  CreateConfigRequest, DeleteConfigRequest, GetRunRequest, StartRunsRequest, StartRunsResponse,
  TransferConfig, TransferRun,
};

/// Client capability for the data transfer service.
///
/// Operators receive this as an injected collaborator so tests can substitute
/// a recording implementation.
#[async_trait]
pub trait TransferClient: Send + Sync {
  /// Create a transfer configuration.
  async fn create_transfer_config(
    &self,
    request: CreateConfigRequest,
  ) -> Result<TransferConfig, ClientError>;

  /// Delete a transfer configuration.
  async fn delete_transfer_config(&self, request: DeleteConfigRequest) -> Result<(), ClientError>;

  /// Start manual runs of a transfer configuration.
  async fn start_manual_transfer_runs(
    &self,
    request: StartRunsRequest,
  ) -> Result<StartRunsResponse, ClientError>;

  /// Fetch the current state of a run.
  async fn get_transfer_run(&self, request: GetRunRequest) -> Result<TransferRun, ClientError>;
}
