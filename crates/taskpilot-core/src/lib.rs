pub mod auth;
pub mod chat;
pub mod conversation;
pub mod error;
pub mod gateway;
pub mod task;

// Re-export common error type
pub use error::{ApiError, Result};
