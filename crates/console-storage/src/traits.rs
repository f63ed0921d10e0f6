//! Storage trait definitions.

use crate::StorageResult;

/// Trait for durable session storage backends.
pub trait SecureStorage: Send + Sync {
    /// Store a value
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Retrieve a value
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Delete a value, returning whether it existed
    fn delete(&self, key: &str) -> StorageResult<bool>;

    /// Store `set` and remove `delete` as one unit.
    ///
    /// The default applies the changes one by one; backends that can commit a
    /// batch atomically override this.
    fn replace_many(&self, set: &[(&str, &str)], delete: &[&str]) -> StorageResult<()> {
        for (key, value) in set {
            self.set(key, value)?;
        }
        for key in delete {
            self.delete(key)?;
        }
        Ok(())
    }

    /// Delete several values as one unit. Missing keys are not an error.
    fn delete_many(&self, keys: &[&str]) -> StorageResult<()> {
        self.replace_many(&[], keys)
    }
}
