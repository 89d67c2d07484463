//! Outbound HTTP for provider calls.
//!
//! [`RouteTransport`] is the only place the runtime touches the network.
//! It returns the raw status and body; interpreting them is the invoker's
//! job, so the cascade can be driven by an in-memory transport in tests.

use async_trait::async_trait;
use std::time::Duration;

use crate::providers::{ProviderError, ProviderRequest};

/// Raw provider answer.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,

    /// Parsed `Retry-After` header, if any
    pub retry_after: Option<Duration>,
}

impl TransportResponse {
    /// A 200 response.
    pub fn ok(body: impl Into<String>) -> Self {
        Self::with_status(200, body)
    }

    pub fn with_status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            retry_after: None,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Executes provider requests.
#[async_trait]
pub trait RouteTransport: Send + Sync {
    /// Send `request` and collect the full body.
    ///
    /// `timeout` is a hint for the underlying client; callers still bound
    /// the whole future themselves.
    async fn execute(
        &self,
        request: &ProviderRequest,
        timeout: Duration,
    ) -> Result<TransportResponse, ProviderError>;
}

#[cfg(feature = "http")]
pub use http::HttpTransport;

#[cfg(feature = "http")]
mod http {
    use super::*;
    use crate::config::HttpConfig;
    use crate::providers::HttpMethod;
    use crate::RuntimeError;

    /// reqwest-backed transport with one shared connection pool.
    #[derive(Debug, Clone)]
    pub struct HttpTransport {
        client: reqwest::Client,
    }

    impl HttpTransport {
        pub fn new(config: &HttpConfig) -> Result<Self, RuntimeError> {
            let client = reqwest::Client::builder()
                .user_agent(config.user_agent.as_str())
                .build()
                .map_err(|e| RuntimeError::HttpClient(e.to_string()))?;
            Ok(Self { client })
        }
    }

    #[async_trait]
    impl RouteTransport for HttpTransport {
        async fn execute(
            &self,
            request: &ProviderRequest,
            timeout: Duration,
        ) -> Result<TransportResponse, ProviderError> {
            let mut builder = match request.method {
                HttpMethod::Get => self.client.get(request.url.clone()),
                HttpMethod::Post => self.client.post(request.url.clone()),
            };
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            if let Some(body) = &request.body {
                builder = builder.json(body);
            }

            // SECURITY: reqwest errors embed the URL, which may carry a key
            let response = builder.timeout(timeout).send().await.map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(timeout)
                } else {
                    ProviderError::Network(e.without_url().to_string())
                }
            })?;

            let status = response.status().as_u16();
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);

            let body = response.text().await.map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(timeout)
                } else {
                    ProviderError::Network(e.without_url().to_string())
                }
            })?;

            Ok(TransportResponse {
                status,
                body,
                retry_after,
            })
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_builds_with_default_config() {
            assert!(HttpTransport::new(&HttpConfig::default()).is_ok());
        }
    }
}
