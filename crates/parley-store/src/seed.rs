//! Fixed initial dataset loaded by `ChatService::seed`.

use chrono::Utc;
use parley_types::{Chat, Message, User};

pub const AI_USER_ID: &str = "user-ai";

fn avatar(seed: &str) -> String {
    format!("https://picsum.photos/seed/{}/200", seed)
}

pub fn users() -> Vec<User> {
    vec![
        User::new("user-1", "You", avatar("you")),
        User::new("user-2", "Jivanshu", avatar("jivanshu")),
        User::new("user-3", "Palak", avatar("palak")),
        User::new("user-4", "Hardik", avatar("hardik")),
        User::new("user-5", "Kritika", avatar("kritika")),
        User::ai(AI_USER_ID, "Gemini", avatar("gemini")),
    ]
}

fn message(id: &str, text: &str, age_ms: i64, sender_id: &str, is_read: bool, now: i64) -> Message {
    Message {
        id: id.to_string(),
        text: text.to_string(),
        timestamp: now - age_ms,
        sender_id: sender_id.to_string(),
        is_read,
    }
}

/// Seeded conversations; timestamps are relative to the moment of seeding
pub fn chats(users: &[User]) -> Vec<Chat> {
    let now = Utc::now().timestamp_millis();
    let user = |idx: usize| users[idx].clone();

    vec![
        Chat::new("chat-1", user(0), user(1)).with_messages(vec![
            message("msg-1-1", "Hey Jivanshu, how’s it going?", 100_000, "user-1", true, now),
            message("msg-1-2", "All good! Just working on the project. You?", 90_000, "user-2", true, now),
        ]),
        Chat::new("chat-2", user(0), user(2)).with_messages(vec![
            message("msg-2-1", "Hi Palak, are you free this weekend?", 200_000, "user-1", true, now),
            message("msg-2-2", "Hey! Yes, I am. Any plans?", 180_000, "user-3", false, now),
        ]),
        Chat::new("chat-3", user(0), user(3)).with_messages(vec![
            message("msg-3-1", "Did you see the game last night?", 500_000, "user-4", true, now),
        ]),
        Chat::new("chat-4", user(0), user(4)),
    ]
}
