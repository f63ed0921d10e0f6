//! Durable key-value storage for the mall console session.
//!
//! Two backends implement [`SecureStorage`]:
//! - **File**: a single JSON object at `~/.mall-console/session.json`,
//!   rewritten atomically (temp file + rename) and readable only by the owner
//! - **Memory**: process-local map, used by tests and ephemeral sessions

mod file;
mod keys;
mod memory;
mod traits;

pub use file::FileStorage;
pub use keys::StorageKeys;
pub use memory::MemoryStorage;
pub use traits::SecureStorage;

use console_config_and_utils::Paths;
use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend-specific failure
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// Stored data could not be decoded
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Create the default durable storage for the given console paths.
pub fn create_storage(paths: &Paths) -> StorageResult<Box<dyn SecureStorage>> {
    paths
        .ensure_dirs()
        .map_err(|e| StorageError::Backend(e.to_string()))?;
    Ok(Box::new(FileStorage::new(paths.session_file())))
}
