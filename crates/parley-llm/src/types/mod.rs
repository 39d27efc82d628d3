pub mod message;

pub use message::{Content, Message, TextPart};
