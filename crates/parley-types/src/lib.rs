pub mod chat;
pub mod config;
pub mod message;
pub mod user;

pub use chat::{filter_by_peer_name, sort_by_recent_activity, Chat};
pub use config::AiConfig;
pub use message::{Message, MessageDraft};
pub use user::{login_candidates, search_contacts, User};
