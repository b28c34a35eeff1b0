//! Adapter interfaces for the model server.
//!
//! The core only needs "send two role-tagged messages, receive completion
//! text". Concrete transports live here so the rest of the crate never
//! touches HTTP.

pub mod ollama;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Re-export the Ollama transport
pub use ollama::OllamaTransport;

/// Role of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// One role-tagged message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Fixed decoding parameters sent with every request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodingParams {
    /// Sampling temperature
    pub temperature: f32,

    /// Nucleus sampling threshold
    pub top_p: f32,

    /// Context window in tokens
    pub context_window: u32,
}

impl Default for DecodingParams {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            top_p: 0.9,
            context_window: 8192,
        }
    }
}

/// A single chat completion request
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// Model identifier
    pub model: String,

    /// System message followed by user message
    pub messages: Vec<ChatMessage>,

    /// Decoding parameters
    pub params: DecodingParams,
}

/// Transport-level errors
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Could not reach the server or the connection dropped
    #[error("Connection error: {0}")]
    Connection(String),

    /// Server answered with a non-success status
    #[error("Model server returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Server answered with a body we could not interpret
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl TransportError {
    /// Whether the client may retry this error at the transport level
    pub fn is_connection(&self) -> bool {
        matches!(self, TransportError::Connection(_))
    }
}

/// Trait for chat completion transports
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Human-readable transport name
    fn name(&self) -> &str;

    /// Send one request and return the completion text
    async fn complete(&self, request: &ChatRequest) -> Result<String, TransportError>;

    /// Check that the server is reachable
    async fn health_check(&self) -> Result<(), TransportError>;
}
