use thiserror::Error;

/// Why the AI backend could not produce text
#[derive(Error, Debug)]
pub enum AiError {
    #[error("AI service is disabled: no API key configured")]
    Disabled,

    #[error("AI backend error: {0}")]
    Backend(#[from] anyhow::Error),

    #[error("AI backend did not answer within {0:?}")]
    Timeout(std::time::Duration),

    #[error("AI backend returned an empty response")]
    EmptyResponse,
}

impl AiError {
    /// Text shown in the conversation in place of a reply
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Disabled => crate::templates::DISABLED_MESSAGE,
            _ => crate::templates::FALLBACK_REPLY,
        }
    }
}
