//! Ollama chat transport.
//!
//! Talks to `POST {endpoint}/api/chat` with streaming disabled. Works with a
//! local Ollama server or anything exposing the same route.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ChatMessage, ChatRequest, ChatTransport, TransportError};

/// HTTP transport for an Ollama server
pub struct OllamaTransport {
    /// Base URL, e.g. http://localhost:11434
    endpoint: String,

    /// HTTP client
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
    top_p: f32,
    num_ctx: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<ResponseMessage>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

impl OllamaTransport {
    /// Create a transport for the given base URL
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Build API URL
    fn api_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.endpoint.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Map a reqwest error onto the transport taxonomy
fn classify(e: reqwest::Error) -> TransportError {
    if e.is_connect() || e.is_request() || e.is_timeout() {
        TransportError::Connection(e.to_string())
    } else if e.is_decode() || e.is_body() {
        TransportError::Malformed(e.to_string())
    } else {
        TransportError::Connection(e.to_string())
    }
}

#[async_trait]
impl ChatTransport for OllamaTransport {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, TransportError> {
        let body = ChatBody {
            model: &request.model,
            messages: &request.messages,
            stream: false,
            options: ChatOptions {
                temperature: request.params.temperature,
                top_p: request.params.top_p,
                num_ctx: request.params.context_window,
            },
        };

        let response = self
            .client
            .post(self.api_url("api/chat"))
            .json(&body)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: text.chars().take(500).collect(),
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| TransportError::Malformed(e.to_string()))?;

        if let Some(error) = parsed.error {
            return Err(TransportError::Malformed(error));
        }

        parsed
            .message
            .map(|m| m.content)
            .ok_or_else(|| TransportError::Malformed("response has no message".to_string()))
    }

    async fn health_check(&self) -> Result<(), TransportError> {
        let response = self
            .client
            .get(self.api_url("api/tags"))
            .send()
            .await
            .map_err(classify)?;

        if !response.status().is_success() {
            return Err(TransportError::Status {
                status: response.status().as_u16(),
                body: String::new(),
            });
        }

        Ok(())
    }
}
