use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Chat not found: {0}")]
    ChatNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("User {user_id} is not a participant of chat {chat_id}")]
    NotParticipant { chat_id: String, user_id: String },

    #[error("Cannot open a chat between {0} and themselves")]
    InvalidPair(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
