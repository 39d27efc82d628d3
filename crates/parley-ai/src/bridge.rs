use std::collections::HashMap;
use std::sync::Arc;

use parley_llm::{ChatClient, ChatOptions, ChatRequest, ClientFactory, Message as LlmMessage, ProviderConfig};
use parley_types::{AiConfig, Message, User};

use crate::error::AiError;
use crate::templates::{REPLY_SYSTEM_INSTRUCTION, SUMMARIZATION_PROMPT, UNKNOWN_SENDER};

/// Adapter between chat history and a text-generation backend.
///
/// The text-returning methods never fail: any problem becomes a fixed
/// user-facing string that can be posted into the conversation as-is.
#[derive(Clone)]
pub struct AiBridge {
    client: Option<Arc<dyn ChatClient>>,
    config: AiConfig,
}

impl AiBridge {
    pub fn new(client: Option<Arc<dyn ChatClient>>, config: AiConfig) -> Self {
        Self { client, config }
    }

    /// Bridge with no backend; every call answers with the disabled-service text
    pub fn disabled() -> Self {
        Self::new(None, AiConfig::default())
    }

    /// Gemini-backed bridge, or a disabled one when `api_key` is absent or blank
    pub fn from_api_key(api_key: Option<String>, config: AiConfig) -> anyhow::Result<Self> {
        match api_key.filter(|k| !k.trim().is_empty()) {
            Some(key) => Self::from_provider(ProviderConfig::gemini(key), config),
            None => {
                tracing::error!("API key not set. AI features will be disabled.");
                Ok(Self::new(None, config))
            }
        }
    }

    pub fn from_provider(provider: ProviderConfig, config: AiConfig) -> anyhow::Result<Self> {
        let client = ClientFactory::create_chat_client(provider)?;
        Ok(Self::new(Some(client), config))
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    pub fn config(&self) -> &AiConfig {
        &self.config
    }

    /// Reply to `new_message` as the counterpart of `current_user_id`
    pub async fn generate_reply(&self, history: &[Message], new_message: &str, current_user_id: &str) -> String {
        match self.try_generate_reply(history, new_message, current_user_id).await {
            Ok(text) => text,
            Err(e) => {
                if !matches!(e, AiError::Disabled) {
                    tracing::error!("Error getting AI response: {}", e);
                }
                e.user_message().to_string()
            }
        }
    }

    /// Natural-language summary of `messages`
    pub async fn summarize(&self, messages: &[Message], participants: &[User]) -> String {
        match self.try_summarize(messages, participants).await {
            Ok(text) => text,
            Err(e) => {
                if !matches!(e, AiError::Disabled) {
                    tracing::error!("Error summarizing chat: {}", e);
                }
                e.user_message().to_string()
            }
        }
    }

    pub async fn try_generate_reply(
        &self,
        history: &[Message],
        new_message: &str,
        current_user_id: &str,
    ) -> Result<String, AiError> {
        let messages = build_reply_messages(history, new_message, current_user_id);
        self.complete(messages).await
    }

    pub async fn try_summarize(&self, messages: &[Message], participants: &[User]) -> Result<String, AiError> {
        let prompt = build_summary_prompt(messages, participants);
        self.complete(vec![LlmMessage::human(prompt)]).await
    }

    async fn complete(&self, messages: Vec<LlmMessage>) -> Result<String, AiError> {
        let client = self.client.as_ref().ok_or(AiError::Disabled)?;

        let mut options = ChatOptions::new();
        if let Some(temp) = self.config.temperature {
            options = options.temperature(temp);
        }
        if let Some(tokens) = self.config.max_output_tokens {
            options = options.max_tokens(tokens);
        }
        let request = ChatRequest::new(self.config.model.clone(), messages).with_options(options);

        let timeout = self.config.request_timeout;
        let response = tokio::time::timeout(timeout, client.chat(request))
            .await
            .map_err(|_| AiError::Timeout(timeout))??;

        match response.content {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(AiError::EmptyResponse),
        }
    }
}

/// System instruction, then history with the current user's turns as `user`
/// and everyone else's as `model`, then the new message
fn build_reply_messages(history: &[Message], new_message: &str, current_user_id: &str) -> Vec<LlmMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(LlmMessage::system(REPLY_SYSTEM_INSTRUCTION));
    messages.extend(history.iter().map(|msg| {
        if msg.sender_id == current_user_id {
            LlmMessage::human(msg.text.as_str())
        } else {
            LlmMessage::ai(msg.text.as_str())
        }
    }));
    messages.push(LlmMessage::human(new_message));
    messages
}

fn build_summary_prompt(messages: &[Message], participants: &[User]) -> String {
    let names: HashMap<&str, &str> = participants
        .iter()
        .map(|p| (p.id.as_str(), p.name.as_str()))
        .collect();

    let history = messages
        .iter()
        .map(|m| {
            let name = names.get(m.sender_id.as_str()).copied().unwrap_or(UNKNOWN_SENDER);
            format!("{}: {}", name, m.text)
        })
        .collect::<Vec<_>>()
        .join("\n");

    SUMMARIZATION_PROMPT.replace("<history>", &history)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_types::MessageDraft;

    fn msg(sender: &str, text: &str) -> Message {
        MessageDraft::new(sender, text, 0).into_message("m")
    }

    #[test]
    fn test_reply_roles() {
        let history = vec![msg("user-1", "hi"), msg("user-ai", "hello!")];
        let messages = build_reply_messages(&history, "how are you?", "user-1");

        let roles: Vec<_> = messages.iter().map(|m| m.role()).collect();
        assert_eq!(roles, vec!["system", "user", "model", "user"]);
        assert_eq!(messages[3].content().as_text(), Some("how are you?"));
    }

    #[test]
    fn test_summary_prompt_resolves_names() {
        let participants = vec![User::new("user-1", "You", ""), User::new("user-2", "Jivanshu", "")];
        let messages = vec![msg("user-1", "hey"), msg("user-2", "yo"), msg("user-9", "??")];

        let prompt = build_summary_prompt(&messages, &participants);
        assert_eq!(
            prompt,
            "Please provide a concise summary of the following chat conversation:\n\n---\nYou: hey\nJivanshu: yo\nUnknown User: ??\n---"
        );
    }

    #[tokio::test]
    async fn test_blank_key_disables() {
        let bridge = AiBridge::from_api_key(Some("  ".into()), AiConfig::default()).unwrap();
        assert!(!bridge.is_enabled());
    }
}
