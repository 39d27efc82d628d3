use parley_types::{Chat, User};

/// Authoritative users and chats. Only `ChatService` touches this; everything
/// it hands out is a clone.
#[derive(Debug, Default)]
pub(crate) struct EntityStore {
    users: Vec<User>,
    chats: Vec<Chat>,
    revision: u64,
    seeded: bool,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    pub fn load(&mut self, users: Vec<User>, chats: Vec<Chat>) {
        self.users = users;
        self.chats = chats;
        self.seeded = true;
        self.bump();
    }

    /// Advance the revision after a mutation and return it
    pub fn bump(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn user(&self, user_id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == user_id)
    }

    pub fn chat(&self, chat_id: &str) -> Option<&Chat> {
        self.chats.iter().find(|c| c.id == chat_id)
    }

    pub fn chat_mut(&mut self, chat_id: &str) -> Option<&mut Chat> {
        self.chats.iter_mut().find(|c| c.id == chat_id)
    }

    pub fn find_pair(&self, a: &str, b: &str) -> Option<&Chat> {
        self.chats.iter().find(|c| c.involves_pair(a, b))
    }

    pub fn insert_chat(&mut self, chat: Chat) {
        self.chats.push(chat);
    }

    /// Snapshot of every chat `user_id` takes part in, in insertion order
    pub fn chats_for(&self, user_id: &str) -> Vec<Chat> {
        self.chats
            .iter()
            .filter(|c| c.has_participant(user_id))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_marks_seeded_and_bumps_revision() {
        let mut store = EntityStore::new();
        assert!(!store.is_seeded());
        assert_eq!(store.revision(), 0);

        store.load(vec![User::new("u1", "A", "")], vec![]);
        assert!(store.is_seeded());
        assert_eq!(store.revision(), 1);
        assert!(store.user("u1").is_some());
    }

    #[test]
    fn test_chats_for_filters_by_participant() {
        let a = User::new("u1", "A", "");
        let b = User::new("u2", "B", "");
        let c = User::new("u3", "C", "");
        let mut store = EntityStore::new();
        store.load(
            vec![a.clone(), b.clone(), c.clone()],
            vec![Chat::new("ab", a.clone(), b), Chat::new("ac", a, c)],
        );

        assert_eq!(store.chats_for("u1").len(), 2);
        assert_eq!(store.chats_for("u2").len(), 1);
        assert!(store.chats_for("nobody").is_empty());
    }
}
