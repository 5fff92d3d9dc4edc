//! Local HTTP stub for driving the real adapters end to end.
//!
//! The adapters use a blocking client, so the mock server is started on its
//! own runtime and requests are made from the test thread.

use candlekeep_core::domain::Bar;
use candlekeep_core::exchange::{CircuitBreaker, HttpClient, HttpOptions};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use wiremock::{Mock, MockServer, Request};

pub struct StubServer {
    server: MockServer,
    runtime: Runtime,
}

impl StubServer {
    pub fn start() -> Self {
        let runtime = Runtime::new().unwrap();
        let server = runtime.block_on(MockServer::start());
        Self { server, runtime }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn mount(&self, mock: Mock) {
        self.runtime.block_on(mock.mount(&self.server));
    }

    pub fn requests(&self) -> Vec<Request> {
        self.runtime
            .block_on(self.server.received_requests())
            .unwrap_or_default()
    }

    /// Integer query parameter `name` of each received request, in order.
    pub fn query_values(&self, name: &str) -> Vec<i64> {
        self.requests()
            .iter()
            .filter_map(|r| query_i64(r, name))
            .collect()
    }
}

/// Client without retries so failures surface on the first response.
pub fn http_client() -> HttpClient {
    let options = HttpOptions {
        timeout_secs: 5,
        max_retries: 0,
        retry_base_delay_ms: 1,
        ..HttpOptions::default()
    };
    HttpClient::new(&options, Arc::new(CircuitBreaker::new(Duration::from_secs(60), 3))).unwrap()
}

pub fn query_i64(request: &Request, name: &str) -> Option<i64> {
    request
        .url
        .query_pairs()
        .find(|(key, _)| key == name)
        .and_then(|(_, value)| value.parse().ok())
}

/// `[ts, o, h, l, c, vol]` with every field as a decimal string.
pub fn string_row(bar: &Bar) -> Vec<Value> {
    vec![
        Value::String(bar.timestamp.to_string()),
        Value::String(bar.open.to_string()),
        Value::String(bar.high.to_string()),
        Value::String(bar.low.to_string()),
        Value::String(bar.close.to_string()),
        Value::String(bar.volume.to_string()),
    ]
}
