//! HTTP check handler (SPEC_FULL §4.7).
//!
//! Grounded on the teacher's `task_http_content.rs` shape (shared
//! `reqwest::Client`, per-request timeout, status-based success), trimmed
//! down from raw-socket timing to a plain status check and generalized to
//! the [`TaskHandler`] contract. URL validation is grounded on the
//! teacher's `task_http.rs::from_string`, which parses with `url::Url`
//! before ever opening a connection so a malformed target fails fast
//! without a network round-trip.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use shared::task::TaskDefinition;
use shared::TaskResult;

use crate::registry::TaskHandler;

#[derive(Debug, Deserialize)]
struct HttpCheckParams {
    url: String,
    #[serde(default)]
    expected_status: Option<u16>,
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

pub struct HttpCheckHandler {
    client: reqwest::Client,
}

impl HttpCheckHandler {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TaskHandler for HttpCheckHandler {
    async fn run(&self, definition: &TaskDefinition, _prior_metrics: &serde_json::Value) -> TaskResult {
        let params: HttpCheckParams = match serde_json::from_value(definition.params.clone()) {
            Ok(p) => p,
            Err(e) => return TaskResult::failed("malformed http_check params", format!("invalid params: {e}")),
        };

        if let Err(e) = Url::parse(&params.url) {
            return TaskResult::failed(
                format!("{} is not a valid URL", params.url),
                format!("invalid url: {e}"),
            );
        }

        let response = self
            .client
            .get(&params.url)
            .timeout(Duration::from_secs(params.timeout_secs))
            .send()
            .await;

        match response {
            Ok(resp) => {
                let status = resp.status().as_u16();
                let ok = match params.expected_status {
                    Some(expected) => status == expected,
                    None => resp.status().is_success() || resp.status().is_redirection(),
                };
                if ok {
                    TaskResult::ok(format!("{} responded {status}", params.url))
                } else if (400..500).contains(&status) {
                    TaskResult::failed(
                        format!("{} responded {status}", params.url),
                        format!("unexpected client error status {status}"),
                    )
                } else {
                    TaskResult::failed(
                        format!("{} responded {status}", params.url),
                        format!("unexpected status {status}"),
                    )
                    .retriable()
                }
            }
            Err(e) if e.is_timeout() || e.is_connect() => {
                TaskResult::failed(format!("{} unreachable", params.url), e.to_string()).retriable()
            }
            Err(e) => TaskResult::failed(format!("{} request failed", params.url), e.to_string()).retriable(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::task::{Frequency, TaskStatus};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn def(url: &str, params: serde_json::Value) -> TaskDefinition {
        let mut merged = params;
        merged["url"] = serde_json::json!(url);
        TaskDefinition {
            id: "http_check".into(),
            title: "HTTP Check".into(),
            enabled: true,
            frequency: Frequency::Every5Min,
            timezone: "UTC".into(),
            params: merged,
        }
    }

    #[tokio::test]
    async fn status_2xx_is_ok_by_default() {
        let server = MockServer::start().await;
        Mock::given(method("GET")).respond_with(ResponseTemplate::new(200)).mount(&server).await;

        let handler = HttpCheckHandler::new(reqwest::Client::new());
        let result = handler.run(&def(&server.uri(), serde_json::json!({})), &serde_json::Value::Null).await;
        assert_eq!(result.status, TaskStatus::Ok);
    }

    #[tokio::test]
    async fn mismatched_expected_status_is_non_retriable_client_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET")).respond_with(ResponseTemplate::new(404)).mount(&server).await;

        let handler = HttpCheckHandler::new(reqwest::Client::new());
        let result = handler.run(&def(&server.uri(), serde_json::json!({"expected_status": 200})), &serde_json::Value::Null).await;
        assert_eq!(result.status, TaskStatus::Failed);
        assert!(!result.retriable);
    }

    #[tokio::test]
    async fn server_error_status_is_retriable() {
        let server = MockServer::start().await;
        Mock::given(method("GET")).respond_with(ResponseTemplate::new(503)).mount(&server).await;

        let handler = HttpCheckHandler::new(reqwest::Client::new());
        let result = handler.run(&def(&server.uri(), serde_json::json!({})), &serde_json::Value::Null).await;
        assert_eq!(result.status, TaskStatus::Failed);
        assert!(result.retriable);
    }

    #[tokio::test]
    async fn connect_failure_is_retriable() {
        let handler = HttpCheckHandler::new(reqwest::Client::new());
        let result = handler
            .run(&def("http://127.0.0.1:1", serde_json::json!({"timeout_secs": 1})), &serde_json::Value::Null)
            .await;
        assert_eq!(result.status, TaskStatus::Failed);
        assert!(result.retriable);
    }

    #[tokio::test]
    async fn invalid_url_fails_without_a_network_call() {
        let handler = HttpCheckHandler::new(reqwest::Client::new());
        let result = handler
            .run(&def("not a url at all", serde_json::json!({})), &serde_json::Value::Null)
            .await;
        assert_eq!(result.status, TaskStatus::Failed);
        assert!(result.error.as_deref().unwrap_or_default().contains("invalid url"));
    }

    #[tokio::test]
    async fn malformed_params_fail_without_network_call() {
        let handler = HttpCheckHandler::new(reqwest::Client::new());
        let definition = TaskDefinition {
            id: "http_check".into(),
            title: "HTTP Check".into(),
            enabled: true,
            frequency: Frequency::Every5Min,
            timezone: "UTC".into(),
            params: serde_json::json!({"no_url_here": true}),
        };
        let result = handler.run(&definition, &serde_json::Value::Null).await;
        assert_eq!(result.status, TaskStatus::Failed);
    }
}
