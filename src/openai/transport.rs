use crate::{
    config::OpenAiConfig,
    error::{RelayError, Result, UpstreamError},
};
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;

/// Authenticated HTTP access to the OpenAI API with a bounded number of
/// transient-error retries.
#[derive(Clone)]
pub struct Transport {
    http: Client,
    config: OpenAiConfig,
}

impl Transport {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RelayError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { http, config })
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_base, path.trim_start_matches('/'))
    }

    pub fn post(&self, path: &str) -> Result<RequestBuilder> {
        let key = self.config.require_api_key()?;
        Ok(self.http.post(self.url(path)).bearer_auth(key))
    }

    pub fn get(&self, path: &str) -> Result<RequestBuilder> {
        let key = self.config.require_api_key()?;
        Ok(self.http.get(self.url(path)).bearer_auth(key))
    }

    /// Send the request built by `build`, rebuilding it for each retry.
    /// Only connection failures and transient HTTP statuses are retried.
    pub async fn send<F>(&self, label: &str, build: F) -> Result<Response>
    where
        F: Fn() -> Result<RequestBuilder> + Send,
    {
        let mut attempt: u32 = 0;
        loop {
            let outcome = build()?.send().await;
            let retry_reason = match outcome {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status().as_u16();
                    let body = response.text().await.unwrap_or_default();
                    let err = UpstreamError::from_response_body(status, &body);
                    log::error!(
                        "{} failed: status={} type={:?} code={:?} message={}",
                        label,
                        status,
                        err.error_type,
                        err.code,
                        err.message
                    );
                    if !is_transient_status(status) || attempt >= self.config.max_retries {
                        return Err(err.into());
                    }
                    format!("status {}", status)
                }
                Err(e) => {
                    if !e.is_connect() || attempt >= self.config.max_retries {
                        log::error!("{} request error: {}", label, e);
                        return Err(e.into());
                    }
                    e.to_string()
                }
            };

            attempt += 1;
            let backoff = retry_backoff(attempt);
            log::warn!(
                "{} transient failure ({}), retry {}/{} in {:?}",
                label,
                retry_reason,
                attempt,
                self.config.max_retries,
                backoff
            );
            tokio::time::sleep(backoff).await;
        }
    }
}

pub fn is_transient_status(status: u16) -> bool {
    matches!(status, 408 | 409 | 429 | 500..=599)
}

fn retry_backoff(attempt: u32) -> Duration {
    Duration::from_millis(500 * u64::from(attempt))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_statuses() {
        assert!(is_transient_status(429));
        assert!(is_transient_status(503));
        assert!(!is_transient_status(400));
        assert!(!is_transient_status(401));
    }

    #[test]
    fn requests_need_a_key() {
        let transport = Transport::new(OpenAiConfig::new()).unwrap();
        assert!(matches!(
            transport.post("images/generations"),
            Err(RelayError::Config(_))
        ));
    }

    #[test]
    fn url_joins_base_and_path() {
        let transport =
            Transport::new(OpenAiConfig::new().with_api_base("http://localhost:1/v1")).unwrap();
        assert_eq!(transport.url("/models"), "http://localhost:1/v1/models");
    }

    #[tokio::test]
    async fn connection_errors_are_retried_then_reported() {
        let config = OpenAiConfig::new()
            .with_api_key("sk-test")
            .with_api_base("http://127.0.0.1:9")
            .with_max_retries(1)
            .with_timeout(Duration::from_secs(2));
        let transport = Transport::new(config).unwrap();
        let started = std::time::Instant::now();
        let result = transport.send("probe", || transport.get("models")).await;
        assert!(matches!(result, Err(RelayError::Request(_))));
        assert!(started.elapsed() >= retry_backoff(1));
    }
}
