use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::error::{Result, SchoolMatchError};

/// Backend endpoints reachable through a [`Transport`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Report,
    Ranking,
    Chat,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Self::Report => "/report",
            Self::Ranking => "/get_ranking",
            Self::Chat => "/chat",
        }
    }

    /// Shown when a failed response carries no `error` field.
    pub fn fallback_message(self) -> &'static str {
        match self {
            Self::Report => "Failed to fetch coordinates.",
            Self::Ranking => "Failed to fetch rankings.",
            Self::Chat => "Failed to get response from the chatbot.",
        }
    }
}

/// JSON-over-POST request/response seam to the backend
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, endpoint: Endpoint, body: &Value) -> Result<Value>;
}

pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn url(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, endpoint: Endpoint, body: &Value) -> Result<Value> {
        let url = self.url(endpoint);
        tracing::info!("[POST] {}", url);

        // One attempt only; the user re-triggers on failure.
        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Request to {} failed: {}", url, e);
                SchoolMatchError::Http(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = error_message(&text, endpoint.fallback_message());
            tracing::error!(status = status.as_u16(), "{} returned error: {}", url, message);
            return Err(SchoolMatchError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        response.json().await.map_err(|e| {
            SchoolMatchError::Internal(format!("Failed to parse {} response: {e}", endpoint.path()))
        })
    }
}

/// `error` field of a JSON error body, else `fallback`.
pub fn error_message(body: &str, fallback: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| fallback.to_string())
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Canned responses popped in order; every request is recorded.
    pub struct MockTransport {
        responses: Mutex<VecDeque<Result<Value>>>,
        pub requests: Mutex<Vec<(Endpoint, Value)>>,
    }

    impl MockTransport {
        pub fn new(responses: Vec<Result<Value>>) -> Self {
            MockTransport {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn recorded(&self) -> Vec<(Endpoint, Value)> {
            self.requests
                .lock()
                .expect("Mock transport mutex should not be poisoned")
                .clone()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn post(&self, endpoint: Endpoint, body: &Value) -> Result<Value> {
            self.requests
                .lock()
                .expect("Mock transport mutex should not be poisoned")
                .push((endpoint, body.clone()));
            self.responses
                .lock()
                .expect("Mock transport mutex should not be poisoned")
                .pop_front()
                .unwrap_or_else(|| {
                    Err(SchoolMatchError::Internal("No more mock responses".to_string()))
                })
        }
    }

    /// Never answers.
    pub struct PendingTransport;

    #[async_trait]
    impl Transport for PendingTransport {
        async fn post(&self, _endpoint: Endpoint, _body: &Value) -> Result<Value> {
            std::future::pending().await
        }
    }
}
