//! Conversation and transcript message types.

pub mod message;
pub mod model;

pub use message::{Message, MessageRole};
pub use model::ConversationSummary;
