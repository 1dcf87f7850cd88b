//! Storage primitives for durable local state.

pub mod atomic_toml;

pub use atomic_toml::{AtomicTomlFile, StorageError};
