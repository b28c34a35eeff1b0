//! Generation client: one semantic round-trip to the model.
//!
//! Owns the model id, decoding parameters, per-attempt timeout and the
//! transport retry loop. Connection failures are retried here with backoff;
//! everything else is reported to the caller as a typed `GenerationFailure`
//! and left to the orchestrator's semantic retry.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::adapters::{ChatMessage, ChatRequest, ChatTransport, DecodingParams, TransportError};

/// Why a generation round-trip produced no usable text
#[derive(Debug, Clone, Error)]
pub enum GenerationFailure {
    /// Connection-level failure that survived transport retries
    #[error("transport error after {attempts} attempt(s): {message}")]
    Transport { attempts: u32, message: String },

    /// The per-attempt deadline elapsed
    #[error("model call timed out after {0:?}")]
    Timeout(Duration),

    /// Server answered with a non-success status
    #[error("model server returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Server answered with something that is not a completion
    #[error("malformed model response: {0}")]
    MalformedResponse(String),

    /// Completion was empty or whitespace
    #[error("model returned an empty completion")]
    EmptyCompletion,
}

/// Source of completion text for the orchestrator
#[async_trait]
pub trait Generator: Send + Sync {
    /// Model identifier recorded on jobs
    fn model_id(&self) -> &str;

    /// Generate a completion for a system + user prompt pair
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, GenerationFailure>;
}

/// Client settings
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Model identifier
    pub model: String,

    /// Decoding parameters
    pub params: DecodingParams,

    /// Hard deadline for one transport attempt
    pub attempt_timeout: Duration,

    /// Backoff for connection failures
    pub retry: RetryPolicy,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            model: "llama3.1:8b".to_string(),
            params: DecodingParams::default(),
            attempt_timeout: Duration::from_secs(120),
            retry: RetryPolicy::default(),
        }
    }
}

/// Backoff for connection failures against the model server.
///
/// `max_attempts` counts the first try. The wait after failed attempt `n` is
/// `initial_delay_ms * backoff_multiplier^(n-1)`, capped at `max_delay_ms`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 500,
            max_delay_ms: 5000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Whether a connection failure on `attempt` may be retried
    fn allows_retry_after(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Wait before the attempt following failed attempt `attempt`
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let ms = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(exponent);
        Duration::from_millis(ms.clamp(0.0, self.max_delay_ms as f64) as u64)
    }
}

/// Counters emitted by the client
#[derive(Debug, Default)]
pub struct ClientMetrics {
    requests: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    transport_retries: AtomicU64,
    timeouts: AtomicU64,
    latency_ms_total: AtomicU64,
}

/// Point-in-time copy of the client counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub successes: u64,
    pub failures: u64,
    pub transport_retries: u64,
    pub timeouts: u64,
    pub latency_ms_total: u64,
}

impl ClientMetrics {
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            transport_retries: self.transport_retries.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            latency_ms_total: self.latency_ms_total.load(Ordering::Relaxed),
        }
    }
}

/// Model client over a chat transport
pub struct GenerationClient {
    transport: Arc<dyn ChatTransport>,
    settings: ClientSettings,
    metrics: ClientMetrics,
}

impl GenerationClient {
    pub fn new(transport: Arc<dyn ChatTransport>, settings: ClientSettings) -> Self {
        Self {
            transport,
            settings,
            metrics: ClientMetrics::default(),
        }
    }

    /// Current counter values
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Name of the underlying transport
    pub fn transport_name(&self) -> &str {
        self.transport.name()
    }

    /// Check the model server is reachable
    pub async fn health_check(&self) -> Result<(), TransportError> {
        self.transport.health_check().await
    }

    fn record_failure(&self, started: Instant) {
        self.metrics.failures.fetch_add(1, Ordering::Relaxed);
        self.metrics
            .latency_ms_total
            .fetch_add(started.elapsed().as_millis() as u64, Ordering::Relaxed);
    }
}

#[async_trait]
impl Generator for GenerationClient {
    fn model_id(&self) -> &str {
        &self.settings.model
    }

    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, GenerationFailure> {
        let request = ChatRequest {
            model: self.settings.model.clone(),
            messages: vec![
                ChatMessage::system(system_prompt),
                ChatMessage::user(user_prompt),
            ],
            params: self.settings.params.clone(),
        };

        self.metrics.requests.fetch_add(1, Ordering::Relaxed);
        let started = Instant::now();
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            let deadline = self.settings.attempt_timeout;
            let result = match timeout(deadline, self.transport.complete(&request)).await {
                Ok(result) => result,
                Err(_) => {
                    self.metrics.timeouts.fetch_add(1, Ordering::Relaxed);
                    self.record_failure(started);
                    warn!(attempt, timeout_ms = deadline.as_millis() as u64, "Model call timed out");
                    return Err(GenerationFailure::Timeout(deadline));
                }
            };

            match result {
                Ok(text) => {
                    let duration_ms = started.elapsed().as_millis() as u64;
                    self.metrics
                        .latency_ms_total
                        .fetch_add(duration_ms, Ordering::Relaxed);

                    if text.trim().is_empty() {
                        self.metrics.failures.fetch_add(1, Ordering::Relaxed);
                        warn!(attempt, duration_ms, "Model returned an empty completion");
                        return Err(GenerationFailure::EmptyCompletion);
                    }

                    self.metrics.successes.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        attempt,
                        duration_ms,
                        completion_len = text.len(),
                        "Model call succeeded"
                    );
                    return Ok(text);
                }
                Err(e) if e.is_connection() && self.settings.retry.allows_retry_after(attempt) => {
                    let delay = self.settings.retry.backoff(attempt);
                    self.metrics.transport_retries.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transport failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    self.record_failure(started);
                    warn!(attempt, error = %e, "Model call failed");
                    return Err(match e {
                        TransportError::Connection(message) => GenerationFailure::Transport {
                            attempts: attempt,
                            message,
                        },
                        TransportError::Status { status, body } => {
                            GenerationFailure::Status { status, body }
                        }
                        TransportError::Malformed(message) => {
                            GenerationFailure::MalformedResponse(message)
                        }
                    });
                }
            }
        }
    }
}
