pub mod chat_state;
pub mod paths;
pub mod storage;
pub mod token_store;

pub use chat_state::{AVAILABLE_MODELS, ChatPrefs, ChatStateStore, DEFAULT_MODEL};
pub use paths::TaskpilotPaths;
pub use storage::StorageError;
pub use token_store::TokenStore;
