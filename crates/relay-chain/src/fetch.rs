//! reqwest-backed HTTP fetch client

use std::time::Duration;

use async_trait::async_trait;
use relay_core::{
    FetchRequest, FetchResponse, HttpConfig, HttpFetch, HttpMethod, RelayError, Result,
    TransportError,
};
use reqwest::Client;

/// Single-attempt HTTP client; no retries, bounded by a per-call timeout
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: Client,
    timeout_secs: u64,
}

impl ReqwestFetcher {
    /// Create from config
    pub fn from_config(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| RelayError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            timeout_secs: config.timeout_secs,
        })
    }

    fn classify(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout(self.timeout_secs)
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else if err.is_builder() {
            TransportError::Request(err.to_string())
        } else if err.is_body() || err.is_decode() {
            TransportError::Body(err.to_string())
        } else {
            TransportError::Other(err.to_string())
        }
    }
}

#[async_trait]
impl HttpFetch for ReqwestFetcher {
    async fn call(&self, request: FetchRequest) -> std::result::Result<FetchResponse, TransportError> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| self.classify(e))?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| self.classify(e))?;

        Ok(FetchResponse::new(status, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        let fetcher = ReqwestFetcher::from_config(&HttpConfig::default()).unwrap();
        assert_eq!(fetcher.timeout_secs, 15);
    }

    #[tokio::test]
    async fn test_invalid_url_is_request_error() {
        let fetcher = ReqwestFetcher::from_config(&HttpConfig::default()).unwrap();
        let result = fetcher.call(FetchRequest::get("not a url")).await;
        assert!(matches!(result, Err(TransportError::Request(_))));
    }
}
