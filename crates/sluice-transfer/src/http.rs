use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::client::TransferClient;
use crate::error::ClientError;
use crate::resource::{parent, run_name, transfer_config_name};
use crate::types::{
  CallOptions, CreateConfigRequest, DeleteConfigRequest, GetRunRequest, ScheduleOptions,
  StartRunsRequest, StartRunsResponse, TransferConfig, TransferRun,
};

/// Transfer client speaking the service's REST API.
#[derive(Debug, Clone)]
pub struct HttpTransferClient {
  http: Client,
  endpoint: String,
  access_token: Option<String>,
}

impl HttpTransferClient {
  pub const DEFAULT_ENDPOINT: &'static str = "https://bigquerydatatransfer.googleapis.com";

  /// Create a client for the given API endpoint (scheme and host).
  pub fn new(endpoint: impl Into<String>) -> Self {
    Self {
      http: Client::new(),
      endpoint: endpoint.into().trim_end_matches('/').to_string(),
      access_token: None,
    }
  }

  /// Send `Authorization: Bearer <token>` with every request.
  pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
    self.access_token = Some(token.into());
    self
  }

  fn url(&self, path: &str) -> String {
    format!("{}/v1/{}", self.endpoint, path)
  }

  fn build(
    &self,
    method: &Method,
    path: &str,
    query: &[(&str, String)],
    body: Option<&serde_json::Value>,
    options: &CallOptions,
  ) -> RequestBuilder {
    let mut request = self.http.request(method.clone(), self.url(path));

    if !query.is_empty() {
      request = request.query(query);
    }
    if let Some(token) = &self.access_token {
      request = request.bearer_auth(token);
    }
    for (key, value) in &options.metadata {
      request = request.header(key, value);
    }
    if let Some(timeout) = options.timeout {
      request = request.timeout(timeout);
    }
    if let Some(body) = body {
      request = request.json(body);
    }

    request
  }

  /// Issue a request, retrying per the call's retry policy.
  async fn send<T: DeserializeOwned>(
    &self,
    method: Method,
    path: &str,
    query: &[(&str, String)],
    body: Option<serde_json::Value>,
    options: &CallOptions,
  ) -> Result<T, ClientError> {
    let retry = options.retry.config();
    let mut attempt = 1;

    loop {
      let request = self.build(&method, path, query, body.as_ref(), options);
      let result = self.send_once(request, options).await;

      match result {
        Err(e) if e.is_retryable() && attempt < retry.max_attempts => {
          let delay = retry.backoff(attempt);
          warn!(
            %method,
            path,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %e,
            "transfer request failed, retrying"
          );
          tokio::time::sleep(delay).await;
          attempt += 1;
        }
        other => return other,
      }
    }
  }

  async fn send_once<T: DeserializeOwned>(
    &self,
    request: RequestBuilder,
    options: &CallOptions,
  ) -> Result<T, ClientError> {
    let response = request.send().await.map_err(|e| match options.timeout {
      Some(timeout) if e.is_timeout() => ClientError::Timeout {
        timeout_ms: timeout.as_millis() as u64,
      },
      _ => ClientError::Http(e),
    })?;

    let status = response.status();
    let text = response.text().await?;
    debug!(status = status.as_u16(), "transfer response received");

    if !status.is_success() {
      return Err(ClientError::Status {
        status: status.as_u16(),
        message: error_message(&text),
      });
    }

    // Empty bodies (deletes) decode as null.
    let text = if text.trim().is_empty() { "null" } else { &text };
    serde_json::from_str(text).map_err(|e| ClientError::Decode {
      message: e.to_string(),
    })
  }
}

impl Default for HttpTransferClient {
  fn default() -> Self {
    Self::new(Self::DEFAULT_ENDPOINT)
  }
}

#[async_trait]
impl TransferClient for HttpTransferClient {
  async fn create_transfer_config(
    &self,
    request: CreateConfigRequest,
  ) -> Result<TransferConfig, ClientError> {
    let path = format!(
      "{}/transferConfigs",
      parent(&request.project_id, request.location.as_deref())
    );
    let mut query = Vec::new();
    if let Some(code) = &request.authorization_code {
      query.push(("authorizationCode", code.clone()));
    }

    let config = disable_auto_scheduling(request.transfer_config);
    let body = serde_json::to_value(&config).map_err(|e| ClientError::Decode {
      message: e.to_string(),
    })?;

    self
      .send(Method::POST, &path, &query, Some(body), &request.options)
      .await
  }

  async fn delete_transfer_config(&self, request: DeleteConfigRequest) -> Result<(), ClientError> {
    let path = transfer_config_name(
      &request.project_id,
      request.location.as_deref(),
      &request.transfer_config_id,
    );

    let _: serde_json::Value = self
      .send(Method::DELETE, &path, &[], None, &request.options)
      .await?;
    Ok(())
  }

  async fn start_manual_transfer_runs(
    &self,
    request: StartRunsRequest,
  ) -> Result<StartRunsResponse, ClientError> {
    let path = format!(
      "{}:startManualRuns",
      transfer_config_name(
        &request.project_id,
        request.location.as_deref(),
        &request.transfer_config_id,
      )
    );

    let mut body = serde_json::Map::new();
    if let Some(range) = &request.requested_time_range {
      let mut wire = serde_json::Map::new();
      if let Some(start) = range.start_time {
        wire.insert("startTime".to_string(), start.to_rfc3339().into());
      }
      if let Some(end) = range.end_time {
        wire.insert("endTime".to_string(), end.to_rfc3339().into());
      }
      body.insert("requestedTimeRange".to_string(), wire.into());
    }
    if let Some(at) = request.requested_run_time {
      body.insert("requestedRunTime".to_string(), at.to_rfc3339().into());
    }

    self
      .send(
        Method::POST,
        &path,
        &[],
        Some(body.into()),
        &request.options,
      )
      .await
  }

  async fn get_transfer_run(&self, request: GetRunRequest) -> Result<TransferRun, ClientError> {
    let path = run_name(
      &request.project_id,
      request.location.as_deref(),
      &request.transfer_config_id,
      &request.run_id,
    );

    self
      .send(Method::GET, &path, &[], None, &request.options)
      .await
  }
}

/// Keep the service from scheduling runs of a new config on its own.
///
/// Sets `schedule_options.disable_auto_scheduling` to `true` unless the caller
/// chose a value explicitly.
pub fn disable_auto_scheduling(mut config: TransferConfig) -> TransferConfig {
  let options = config
    .schedule_options
    .get_or_insert_with(ScheduleOptions::default);
  if options.disable_auto_scheduling.is_none() {
    options.disable_auto_scheduling = Some(true);
  }
  config
}

/// Pull `error.message` out of a service error body, falling back to the raw text.
fn error_message(body: &str) -> String {
  serde_json::from_str::<serde_json::Value>(body)
    .ok()
    .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
    .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_disable_auto_scheduling_when_absent() {
    let config = disable_auto_scheduling(TransferConfig::default());
    assert_eq!(
      config.schedule_options.unwrap().disable_auto_scheduling,
      Some(true)
    );
  }

  #[test]
  fn test_disable_auto_scheduling_keeps_other_options() {
    let start = chrono::Utc::now();
    let config = disable_auto_scheduling(TransferConfig {
      schedule_options: Some(ScheduleOptions {
        start_time: Some(start),
        ..ScheduleOptions::default()
      }),
      ..TransferConfig::default()
    });

    let options = config.schedule_options.unwrap();
    assert_eq!(options.disable_auto_scheduling, Some(true));
    assert_eq!(options.start_time, Some(start));
  }

  #[test]
  fn test_disable_auto_scheduling_respects_explicit_value() {
    let config = disable_auto_scheduling(TransferConfig {
      schedule_options: Some(ScheduleOptions {
        disable_auto_scheduling: Some(false),
        ..ScheduleOptions::default()
      }),
      ..TransferConfig::default()
    });

    assert_eq!(
      config.schedule_options.unwrap().disable_auto_scheduling,
      Some(false)
    );
  }

  #[test]
  fn test_error_message() {
    let body = r#"{"error": {"code": 403, "message": "permission denied"}}"#;
    assert_eq!(error_message(body), "permission denied");
    assert_eq!(error_message("bad gateway"), "bad gateway");
  }

  #[test]
  fn test_endpoint_trailing_slash() {
    let client = HttpTransferClient::new("http://localhost:8080/");
    assert_eq!(
      client.url("projects/p/transferConfigs"),
      "http://localhost:8080/v1/projects/p/transferConfigs"
    );
  }
}
