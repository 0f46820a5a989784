//! Client State Storage
//!
//! Durable key-value storage for the small amount of state the client keeps
//! between runs: the session token and the theme preference.
//!
//! - **file**: JSON file on disk, rewritten atomically on every change
//! - **memory**: in-process map for tests and throwaway sessions
//! - **error**: Error types

mod error;
mod file;
mod memory;

pub use error::{StorageError, StorageResult};
pub use file::FileStore;
pub use memory::MemoryStore;

/// Key holding the bearer token
pub const TOKEN_KEY: &str = "token";

/// Key holding the theme preference
pub const THEME_KEY: &str = "theme";

/// String key-value storage shared by the HTTP client and the stores
pub trait KeyValueStore: Send + Sync {
    /// Read a value
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value, replacing any previous one
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Delete a value. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> StorageResult<()>;
}
