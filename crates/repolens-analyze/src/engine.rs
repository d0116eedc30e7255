use async_trait::async_trait;
use llm::builder::{LLMBackend, LLMBuilder};
use llm::chat::ChatMessage;

use repolens_core::AiSettings;

use crate::transport::{ChatTransport, Message, MessageRole, TransportError};

fn map_backend(provider: &str) -> Result<LLMBackend, TransportError> {
    match provider {
        "openai" => Ok(LLMBackend::OpenAI),
        "anthropic" => Ok(LLMBackend::Anthropic),
        "google" => Ok(LLMBackend::Google),
        "ollama" => Ok(LLMBackend::Ollama),
        "groq" => Ok(LLMBackend::Groq),
        "mistral" => Ok(LLMBackend::Mistral),
        "deepseek" => Ok(LLMBackend::DeepSeek),
        other => Err(TransportError::Unavailable(format!("unknown provider: {other}"))),
    }
}

/// `ChatTransport` backed by the `llm` crate. A client is built per call so the
/// system message can change between attempts.
pub struct LlmTransport {
    settings: AiSettings,
}

impl LlmTransport {
    pub fn new(settings: AiSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl ChatTransport for LlmTransport {
    async fn complete(&self, messages: &[Message]) -> Result<String, TransportError> {
        let backend = map_backend(&self.settings.provider)?;

        let system = messages
            .iter()
            .find(|m| m.role == MessageRole::System)
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        let mut builder = LLMBuilder::new()
            .backend(backend)
            .model(&self.settings.model)
            .temperature(self.settings.temperature)
            .max_tokens(self.settings.max_tokens)
            .system(system);

        if !self.settings.api_key.is_empty() {
            builder = builder.api_key(&self.settings.api_key);
        }

        let llm = builder
            .build()
            .map_err(|e| TransportError::Unavailable(format!("build LLM: {e}")))?;

        let chat: Vec<ChatMessage> = messages
            .iter()
            .filter_map(|m| match m.role {
                MessageRole::System => None,
                MessageRole::User => Some(ChatMessage::user().content(&m.content).build()),
                MessageRole::Assistant => {
                    Some(ChatMessage::assistant().content(&m.content).build())
                }
            })
            .collect();

        let response = llm
            .chat(&chat)
            .await
            .map_err(|e| TransportError::classify(format!("chat: {e}")))?;

        match response.text() {
            Some(text) if !text.trim().is_empty() => Ok(text),
            Some(_) => Err(TransportError::Failed("LLM returned empty text".to_string())),
            None => Err(TransportError::Failed("LLM returned no text".to_string())),
        }
    }
}
