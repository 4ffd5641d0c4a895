use thiserror::Error;

/// Errors returned by a [`TransferClient`](crate::TransferClient).
#[derive(Debug, Error)]
pub enum ClientError {
  /// Transport-level failure.
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  /// The service answered with a non-success status.
  #[error("request failed with status {status}: {message}")]
  Status { status: u16, message: String },

  /// The response body could not be decoded.
  #[error("invalid response: {message}")]
  Decode { message: String },

  /// The call exceeded its configured timeout.
  #[error("request timed out after {timeout_ms}ms")]
  Timeout { timeout_ms: u64 },

  /// Waiting on the service was cancelled.
  #[error("cancelled")]
  Cancelled,
}

impl ClientError {
  /// Whether a retry policy may attempt the call again.
  pub fn is_retryable(&self) -> bool {
    match self {
      ClientError::Http(e) => e.is_connect() || e.is_timeout() || e.is_request(),
      ClientError::Status { status, .. } => *status == 429 || *status >= 500,
      ClientError::Timeout { .. } => true,
      ClientError::Decode { .. } | ClientError::Cancelled => false,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_retryable_statuses() {
    let throttled = ClientError::Status {
      status: 429,
      message: "quota".to_string(),
    };
    let unavailable = ClientError::Status {
      status: 503,
      message: "unavailable".to_string(),
    };
    let denied = ClientError::Status {
      status: 403,
      message: "permission denied".to_string(),
    };

    assert!(throttled.is_retryable());
    assert!(unavailable.is_retryable());
    assert!(!denied.is_retryable());
    assert!(!ClientError::Cancelled.is_retryable());
  }
}
