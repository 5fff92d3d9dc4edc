//! Blocking JSON-over-HTTP helper shared by the exchange adapters.
//!
//! Handles per-request retries with exponential backoff, status-code
//! classification and the circuit breaker. Pacing between requests is not
//! done here.

use super::circuit_breaker::CircuitBreaker;
use super::ExchangeError;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// HTTP settings, configurable from the `[http]` table of the run config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpOptions {
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub user_agent: String,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 3,
            retry_base_delay_ms: 500,
            user_agent: concat!("candlekeep/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

pub struct HttpClient {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    max_retries: u32,
    base_delay: Duration,
}

impl HttpClient {
    pub fn new(
        options: &HttpOptions,
        circuit_breaker: Arc<CircuitBreaker>,
    ) -> Result<Self, ExchangeError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(options.timeout_secs))
            .user_agent(options.user_agent.clone())
            .build()
            .map_err(|e| ExchangeError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker,
            max_retries: options.max_retries,
            base_delay: Duration::from_millis(options.retry_base_delay_ms),
        })
    }

    pub fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }

    /// GET `url` with `query` and decode the JSON body as `T`.
    pub fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, ExchangeError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(ExchangeError::CircuitBreakerTripped);
        }

        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                debug!(url, attempt, ?delay, "retrying request");
                std::thread::sleep(delay);
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(ExchangeError::CircuitBreakerTripped);
            }

            let resp = match self.client.get(url).query(query).send() {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    self.circuit_breaker.record_failure();
                    last_error = Some(ExchangeError::NetworkUnreachable(e.to_string()));
                    continue;
                }
                Err(e) => return Err(ExchangeError::NetworkUnreachable(e.to_string())),
            };

            let status = resp.status();

            if status == StatusCode::FORBIDDEN || status.as_u16() == 418 {
                warn!(url, %status, "exchange refused requests, tripping circuit breaker");
                self.circuit_breaker.trip();
                return Err(ExchangeError::CircuitBreakerTripped);
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                self.circuit_breaker.record_failure();
                let retry_after = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                last_error = Some(ExchangeError::RateLimited {
                    retry_after_secs: retry_after,
                });
                continue;
            }

            if status.is_server_error() {
                self.circuit_breaker.record_failure();
                last_error = Some(ExchangeError::Other(format!("HTTP {status} from {url}")));
                continue;
            }

            if !status.is_success() {
                let body = resp.text().unwrap_or_default();
                return Err(ExchangeError::Exchange {
                    code: status.as_u16().to_string(),
                    message: body,
                });
            }

            let parsed = resp.json::<T>().map_err(|e| {
                ExchangeError::ResponseFormatChanged(format!("failed to parse response from {url}: {e}"))
            })?;
            self.circuit_breaker.record_success();
            return Ok(parsed);
        }

        Err(last_error.unwrap_or_else(|| ExchangeError::Other("max retries exceeded".into())))
    }
}
