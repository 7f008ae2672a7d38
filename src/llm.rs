//! Chat model capability used by the evaluator and the synthesizer.
//!
//! Both components talk to a language model through the [`ChatModel`] trait
//! so tests can substitute deterministic stubs. The production implementation
//! wraps async-openai's chat completion API.

use crate::conversation::Role;
use crate::error::{Result, SvarError};
use crate::openai::create_client;
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs, ResponseFormat,
};
use async_trait::async_trait;
use tracing::debug;

/// One message of a chat completion request.
#[derive(Debug, Clone)]
pub struct PromptMessage {
    pub role: PromptRole,
    pub content: String,
}

/// Role of a prompt message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptRole {
    System,
    User,
    Assistant,
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::Assistant,
            content: content.into(),
        }
    }

    /// Convert a conversation role into a prompt role.
    pub fn from_turn(role: Role, text: impl Into<String>) -> Self {
        match role {
            Role::User => Self::user(text),
            Role::Assistant => Self::assistant(text),
        }
    }
}

/// Capability trait for chat completion.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Run a chat completion and return the raw response text.
    ///
    /// When `json` is set, the model is constrained to emit a JSON object.
    async fn complete(&self, messages: &[PromptMessage], json: bool) -> Result<String>;
}

/// Production chat model backed by the OpenAI API.
pub struct OpenAiChat {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenAiChat {
    /// Create a chat model for the given model name.
    pub fn new(model: &str, temperature: f32) -> Self {
        Self {
            client: create_client(),
            model: model.to_string(),
            temperature,
        }
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    async fn complete(&self, messages: &[PromptMessage], json: bool) -> Result<String> {
        let mut request_messages: Vec<ChatCompletionRequestMessage> = Vec::new();

        for message in messages {
            let converted: ChatCompletionRequestMessage = match message.role {
                PromptRole::System => ChatCompletionRequestSystemMessageArgs::default()
                    .content(message.content.clone())
                    .build()
                    .map_err(|e| SvarError::OpenAI(e.to_string()))?
                    .into(),
                PromptRole::User => ChatCompletionRequestUserMessageArgs::default()
                    .content(message.content.clone())
                    .build()
                    .map_err(|e| SvarError::OpenAI(e.to_string()))?
                    .into(),
                PromptRole::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                    .content(message.content.clone())
                    .build()
                    .map_err(|e| SvarError::OpenAI(e.to_string()))?
                    .into(),
            };
            request_messages.push(converted);
        }

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(&self.model)
            .messages(request_messages)
            .temperature(self.temperature);

        if json {
            builder.response_format(ResponseFormat::JsonObject);
        }

        let request = builder
            .build()
            .map_err(|e| SvarError::OpenAI(e.to_string()))?;

        debug!(model = %self.model, json, "Sending chat completion request");

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| SvarError::OpenAI(format!("Chat completion failed: {}", e)))?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .ok_or_else(|| SvarError::OpenAI("Empty response from model".to_string()))?
            .clone();

        Ok(content)
    }
}
