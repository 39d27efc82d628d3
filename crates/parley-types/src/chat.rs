use crate::message::Message;
use crate::user::User;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Two-party conversation: participants, append-only messages, and who is typing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: String,
    pub participants: Vec<User>,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub typing: BTreeSet<String>,
}

impl Chat {
    pub fn new(id: impl Into<String>, first: User, second: User) -> Self {
        Self {
            id: id.into(),
            participants: vec![first, second],
            messages: Vec::new(),
            typing: BTreeSet::new(),
        }
    }

    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    pub fn has_participant(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p.id == user_id)
    }

    /// True when this is a two-party chat between exactly `a` and `b`, in either order
    pub fn involves_pair(&self, a: &str, b: &str) -> bool {
        if self.participants.len() != 2 {
            return false;
        }
        let (x, y) = (&self.participants[0].id, &self.participants[1].id);
        (x == a && y == b) || (x == b && y == a)
    }

    pub fn other_participant(&self, user_id: &str) -> Option<&User> {
        self.participants.iter().find(|p| p.id != user_id)
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Messages addressed to `user_id` that they have not read yet
    pub fn unread_count(&self, user_id: &str) -> usize {
        self.messages
            .iter()
            .filter(|m| !m.is_read && m.sender_id != user_id)
            .count()
    }

    pub fn is_typing(&self, user_id: &str) -> bool {
        self.typing.contains(user_id)
    }

    fn last_activity(&self) -> i64 {
        self.last_message().map(|m| m.timestamp).unwrap_or(0)
    }
}

/// Most recent conversation first; chats without messages sink to the bottom
pub fn sort_by_recent_activity(chats: &mut [Chat]) {
    chats.sort_by_key(|c| std::cmp::Reverse(c.last_activity()));
}

/// Chats whose other participant's name contains `query`, case-insensitively
pub fn filter_by_peer_name(chats: &[Chat], current_user_id: &str, query: &str) -> Vec<Chat> {
    chats
        .iter()
        .filter(|c| {
            c.other_participant(current_user_id)
                .is_some_and(|peer| peer.name_matches(query))
        })
        .cloned()
        .collect()
}
