//! Plain-text rendering of chats for the terminal client.

use chrono::{DateTime, Local};
use parley_types::{sort_by_recent_activity, Chat, Message, User};

const PREVIEW_LEN: usize = 40;

pub fn render_users(users: &[User]) -> String {
    if users.is_empty() {
        return "No users found".to_string();
    }
    users
        .iter()
        .map(|u| {
            let marker = if u.is_ai { " (AI)" } else { "" };
            format!("{:<10} {}{}", u.id, u.name, marker)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Chat list as seen by `current_user_id`, most recent activity first
pub fn render_chat_list(chats: &[Chat], current_user_id: &str) -> String {
    if chats.is_empty() {
        return "No chats yet".to_string();
    }
    let mut chats = chats.to_vec();
    sort_by_recent_activity(&mut chats);

    chats
        .iter()
        .map(|chat| {
            let peer = chat.other_participant(current_user_id);
            let name = peer.map(|p| p.name.as_str()).unwrap_or("Unknown User");
            let unread = chat.unread_count(current_user_id);
            let badge = if unread > 0 { format!(" [{}]", unread) } else { String::new() };

            let status = match peer {
                Some(p) if chat.is_typing(&p.id) => "typing...".to_string(),
                _ => preview(chat, current_user_id),
            };
            format!("{:<12} {}{}: {}", chat.id, name, badge, status)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Message history of one chat with read receipts on the current user's messages
pub fn render_messages(chat: &Chat, current_user_id: &str) -> String {
    let mut lines: Vec<String> = chat
        .messages
        .iter()
        .map(|m| {
            let sender = sender_name(chat, m, current_user_id);
            let receipt = if m.sender_id == current_user_id {
                if m.is_read { " ✓✓" } else { " ✓" }
            } else {
                ""
            };
            format!("[{}] {}: {}{}", format_time(m.timestamp), sender, m.text, receipt)
        })
        .collect();

    if lines.is_empty() {
        lines.push("No messages yet".to_string());
    }
    if let Some(peer) = chat.other_participant(current_user_id) {
        if chat.is_typing(&peer.id) {
            lines.push(format!("{} is typing...", peer.name));
        }
    }
    lines.join("\n")
}

/// Notices for what changed between two snapshots of the same user's chats
pub fn describe_changes(prev: &[Chat], next: &[Chat], current_user_id: &str) -> Vec<String> {
    let mut notices = Vec::new();

    for chat in next {
        let peer_name = chat
            .other_participant(current_user_id)
            .map(|p| p.name.as_str())
            .unwrap_or("Unknown User");

        let Some(before) = prev.iter().find(|c| c.id == chat.id) else {
            notices.push(format!("New chat with {} ({})", peer_name, chat.id));
            continue;
        };

        let known: Vec<&str> = before.messages.iter().map(|m| m.id.as_str()).collect();
        for message in chat
            .messages
            .iter()
            .filter(|m| m.sender_id != current_user_id && !known.contains(&m.id.as_str()))
        {
            notices.push(format!("{}: {}", peer_name, message.text));
        }

        for user_id in chat.typing.difference(&before.typing) {
            if user_id != current_user_id {
                notices.push(format!("{} is typing...", peer_name));
            }
        }
    }
    notices
}

fn preview(chat: &Chat, current_user_id: &str) -> String {
    let Some(last) = chat.last_message() else {
        return "No messages yet".to_string();
    };
    let text = truncate(&last.text, PREVIEW_LEN);
    if last.sender_id == current_user_id {
        format!("You: {}", text)
    } else {
        text
    }
}

fn sender_name<'a>(chat: &'a Chat, message: &Message, current_user_id: &str) -> &'a str {
    if message.sender_id == current_user_id {
        return "You";
    }
    chat.participants
        .iter()
        .find(|p| p.id == message.sender_id)
        .map(|p| p.name.as_str())
        .unwrap_or("Unknown User")
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    format!("{}...", cut.trim_end())
}

fn format_time(timestamp_ms: i64) -> String {
    DateTime::from_timestamp_millis(timestamp_ms)
        .map(|t| t.with_timezone(&Local).format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_types::MessageDraft;

    fn me() -> User {
        User::new("u1", "Me", "")
    }

    fn bob() -> User {
        User::new("u2", "Bob", "")
    }

    fn msg(id: &str, sender: &str, text: &str, ts: i64, read: bool) -> Message {
        let mut m = MessageDraft::new(sender, text, ts).into_message(id);
        m.is_read = read;
        m
    }

    #[test]
    fn test_chat_list_orders_and_badges() {
        let carol = User::new("u3", "Carol", "");
        let chats = vec![
            Chat::new("c-empty", me(), carol),
            Chat::new("c-bob", me(), bob()).with_messages(vec![
                msg("m1", "u2", "first", 10, false),
                msg("m2", "u2", "second", 20, false),
            ]),
        ];

        let out = render_chat_list(&chats, "u1");
        let lines: Vec<_> = out.lines().collect();
        assert!(lines[0].starts_with("c-bob"));
        assert!(lines[0].contains("Bob [2]: second"));
        assert!(lines[1].contains("Carol: No messages yet"));
    }

    #[test]
    fn test_chat_list_shows_typing_and_own_preview() {
        let mut chat = Chat::new("c", me(), bob()).with_messages(vec![msg("m1", "u1", "hi", 1, true)]);
        assert!(render_chat_list(&[chat.clone()], "u1").contains("You: hi"));

        chat.typing.insert("u2".into());
        assert!(render_chat_list(&[chat], "u1").contains("Bob: typing..."));
    }

    #[test]
    fn test_messages_show_receipts_on_own_messages_only() {
        let chat = Chat::new("c", me(), bob()).with_messages(vec![
            msg("m1", "u1", "sent", 0, false),
            msg("m2", "u1", "seen", 0, true),
            msg("m3", "u2", "reply", 0, false),
        ]);
        let out = render_messages(&chat, "u1");
        let lines: Vec<_> = out.lines().collect();
        assert!(lines[0].ends_with("You: sent ✓"));
        assert!(lines[1].ends_with("You: seen ✓✓"));
        assert!(lines[2].ends_with("Bob: reply"));
    }

    #[test]
    fn test_empty_chat_and_typing_footer() {
        let mut chat = Chat::new("c", me(), bob());
        chat.typing.insert("u2".into());
        assert_eq!(render_messages(&chat, "u1"), "No messages yet\nBob is typing...");
    }

    #[test]
    fn test_describe_changes() {
        let before = vec![Chat::new("c", me(), bob())];
        let mut after = before.clone();
        after[0].messages.push(msg("m1", "u2", "hello", 1, false));
        after[0].messages.push(msg("m2", "u1", "mine", 2, false));
        after[0].typing.insert("u2".into());
        after.push(Chat::new("c2", me(), User::new("u3", "Carol", "")));

        let notices = describe_changes(&before, &after, "u1");
        assert_eq!(
            notices,
            vec!["Bob: hello", "Bob is typing...", "New chat with Carol (c2)"]
        );
        assert!(describe_changes(&after, &after, "u1").is_empty());
    }

    #[test]
    fn test_truncate_long_preview() {
        let long = "x".repeat(60);
        let chat = Chat::new("c", me(), bob()).with_messages(vec![msg("m1", "u2", &long, 1, true)]);
        let out = render_chat_list(&[chat], "u1");
        assert!(out.ends_with(&format!("{}...", "x".repeat(PREVIEW_LEN))));
    }
}
