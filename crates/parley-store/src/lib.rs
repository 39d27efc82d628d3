pub mod error;
pub mod registry;
pub mod seed;
pub mod service;
mod store;

pub use error::{Result, StoreError};
pub use registry::{ChatsCallback, Subscription};
pub use service::ChatService;
