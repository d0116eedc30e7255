use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a model invocation failed. The retry loop only branches on the variant.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    /// The provider rejected the request as larger than its context window.
    #[error("context length exceeded: {0}")]
    ContextOverflow(String),
    /// The client could not be built (unknown provider, bad settings).
    #[error("transport unavailable: {0}")]
    Unavailable(String),
    #[error("{0}")]
    Failed(String),
}

/// Provider error texts that mean "prompt too large".
const OVERFLOW_SIGNALS: [&str; 5] = [
    "context_length_exceeded",
    "maximum context length",
    "context window",
    "too many tokens",
    "prompt is too long",
];

impl TransportError {
    /// Fallback for transports that only surface a message string.
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        if OVERFLOW_SIGNALS.iter().any(|s| lower.contains(s)) {
            TransportError::ContextOverflow(message)
        } else {
            TransportError::Failed(message)
        }
    }

    pub fn is_context_overflow(&self) -> bool {
        matches!(self, TransportError::ContextOverflow(_))
    }
}

/// A message in the conversation sent to the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: MessageRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: MessageRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: MessageRole::Assistant, content: content.into() }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// Text completion over a chat transcript. Must be safe to call from independent requests at once.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn complete(&self, messages: &[Message]) -> Result<String, TransportError>;
}

#[async_trait]
impl<T: ChatTransport + ?Sized> ChatTransport for &T {
    async fn complete(&self, messages: &[Message]) -> Result<String, TransportError> {
        (**self).complete(messages).await
    }
}

#[async_trait]
impl<T: ChatTransport + ?Sized> ChatTransport for Box<T> {
    async fn complete(&self, messages: &[Message]) -> Result<String, TransportError> {
        (**self).complete(messages).await
    }
}
