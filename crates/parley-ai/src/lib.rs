mod bridge;
mod error;
mod templates;

pub use bridge::AiBridge;
pub use error::AiError;
pub use templates::{
    DISABLED_MESSAGE, FALLBACK_REPLY, REPLY_SYSTEM_INSTRUCTION, SUMMARIZATION_PROMPT, UNKNOWN_SENDER,
};
