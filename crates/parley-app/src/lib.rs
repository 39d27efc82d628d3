pub mod app;
pub mod command;
pub mod config;
pub mod conversation;
pub mod session;
pub mod typing;
pub mod view;

pub use app::App;
pub use command::Command;
pub use config::Config;
pub use conversation::{Conversation, ReplyTask, Sent};
pub use typing::TypingDebouncer;
