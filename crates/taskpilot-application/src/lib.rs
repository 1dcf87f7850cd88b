pub mod orchestrator;

pub use orchestrator::{ChatFailure, ChatOrchestrator, TurnOutcome, user_message_for};
