use chrono::Utc;
use serde::{Deserialize, Serialize};

/// A stored message. `id` is assigned by the store, never by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub text: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    pub sender_id: String,
    #[serde(default)]
    pub is_read: bool,
}

/// Message content as submitted by a sender, before the store assigns an id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDraft {
    pub text: String,
    pub timestamp: i64,
    pub sender_id: String,
}

impl MessageDraft {
    pub fn new(sender_id: impl Into<String>, text: impl Into<String>, timestamp: i64) -> Self {
        Self {
            text: text.into(),
            timestamp,
            sender_id: sender_id.into(),
        }
    }

    /// Draft stamped with the current wall-clock time
    pub fn now(sender_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(sender_id, text, Utc::now().timestamp_millis())
    }

    pub fn into_message(self, id: impl Into<String>) -> Message {
        Message {
            id: id.into(),
            text: self.text,
            timestamp: self.timestamp,
            sender_id: self.sender_id,
            is_read: false,
        }
    }
}
