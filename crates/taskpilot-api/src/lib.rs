pub mod auth;
pub mod chat;
pub mod gateway;
pub mod tasks;

pub use auth::{AuthResponse, SessionController, User};
pub use chat::ChatApi;
pub use gateway::ApiGateway;
pub use tasks::TaskApi;
