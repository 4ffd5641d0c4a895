use serde::{Deserialize, Serialize};
use sluice_transfer::HttpTransferClient;

pub const DEFAULT_ENDPOINT: &str = HttpTransferClient::DEFAULT_ENDPOINT;
pub const DEFAULT_ACCESS_TOKEN_ENV: &str = "SLUICE_ACCESS_TOKEN";

/// Where the transfer client connects and how it authenticates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSettings {
  #[serde(default = "default_endpoint")]
  pub endpoint: String,
  /// Environment variable holding the bearer token.
  #[serde(default = "default_access_token_env")]
  pub access_token_env: String,
}

impl Default for ClientSettings {
  fn default() -> Self {
    Self {
      endpoint: default_endpoint(),
      access_token_env: default_access_token_env(),
    }
  }
}

impl ClientSettings {
  /// Read the access token from the environment, if set and non-empty.
  pub fn access_token(&self) -> Option<String> {
    std::env::var(&self.access_token_env)
      .ok()
      .filter(|token| !token.is_empty())
  }
}

fn default_endpoint() -> String {
  DEFAULT_ENDPOINT.to_string()
}

fn default_access_token_env() -> String {
  DEFAULT_ACCESS_TOKEN_ENV.to_string()
}
