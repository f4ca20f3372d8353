//! HTTP client configuration and building logic

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::constants::{api, env};
use crate::errors::{ApiError, ApiResult};

/// Configuration for the CZ ID API client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// API base URL
    pub base_url: String,
    /// Environment variable holding the bearer token
    pub token_env: String,
    /// TCP keep-alive settings
    pub tcp_keepalive: Option<Duration>,
    /// Request timeout
    pub request_timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: api::DEFAULT_BASE_URL.to_string(),
            token_env: env::TOKEN.to_string(),
            tcp_keepalive: Some(Duration::from_secs(30)),
            request_timeout: api::DEFAULT_TIMEOUT,
            connect_timeout: api::CONNECT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Builds the HTTP client with the specified configuration
    pub fn build_http_client(&self) -> ApiResult<Client> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut client_builder = Client::builder()
            .timeout(self.request_timeout)
            .connect_timeout(self.connect_timeout)
            .user_agent(api::USER_AGENT)
            .default_headers(headers);

        if let Some(keepalive) = self.tcp_keepalive {
            client_builder = client_builder.tcp_keepalive(keepalive);
        }

        client_builder.build().map_err(ApiError::Http)
    }

    /// Read the bearer token from the configured environment variable
    pub fn token_from_env(&self) -> ApiResult<String> {
        std::env::var(&self.token_env)
            .ok()
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| ApiError::MissingToken {
                var: self.token_env.clone(),
            })
    }
}
