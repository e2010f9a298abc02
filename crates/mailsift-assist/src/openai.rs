//! OpenAI-compatible chat-completions assistant.

use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::warn;

use crate::{ConversationTurn, DraftAssistant};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

const EXTRACT_PROMPT: &str = "Please extract only the new message from the email below, \
     removing any quotes from earlier in the thread:";

const REPLY_SYSTEM_PROMPT: &str = "You are managing my email inbox for me and drafting replies \
     to new emails. Each response should only contain the content of the message to send, and \
     nothing else. Please don't indicate that you are an AI in any way. Everything you draft \
     will be checked by me before it is sent.";

#[derive(Debug, Error)]
enum ChatError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("chat API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("chat API returned no choices")]
    Empty,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

/// Assistant backed by an OpenAI-compatible chat-completions endpoint.
pub struct OpenAiAssistant {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiAssistant {
    /// Create an assistant against the default OpenAI endpoint.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Override the endpoint and model, for compatible self-hosted servers.
    #[must_use]
    pub fn with_endpoint(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String, ChatError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": messages,
        });
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ChatError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(ChatError::Empty)
    }
}

impl DraftAssistant for OpenAiAssistant {
    async fn extract_clean_message(&self, raw_body: &str) -> Option<String> {
        let messages = vec![ChatMessage {
            role: "user",
            content: format!("{EXTRACT_PROMPT}\n{raw_body}"),
        }];
        match self.chat(messages).await {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(error = %e, "failed to extract clean message");
                None
            }
        }
    }

    async fn draft_reply(&self, conversation: &[ConversationTurn]) -> Option<String> {
        let mut messages = vec![ChatMessage {
            role: "system",
            content: REPLY_SYSTEM_PROMPT.to_string(),
        }];
        for turn in conversation {
            messages.push(ChatMessage {
                role: if turn.from_me { "assistant" } else { "user" },
                content: turn.body.clone(),
            });
        }
        match self.chat(messages).await {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(error = %e, "failed to draft reply");
                None
            }
        }
    }
}
