//! Key-value storage port

use warden_domain::AuthResult;

/// Port for the browser-style key-value storage the session manager persists to.
///
/// Access is synchronous but fallible. Values are opaque strings; callers
/// serialize before writing.
pub trait KeyValueStore: Send + Sync {
    /// Returns the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Storage`](warden_domain::AuthError::Storage) if the backend cannot be read.
    fn get(&self, key: &str) -> AuthResult<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Storage`](warden_domain::AuthError::Storage) if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> AuthResult<()>;

    /// Removes the value stored under `key`. Missing keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Storage`](warden_domain::AuthError::Storage) if the backend cannot be written.
    fn remove(&self, key: &str) -> AuthResult<()>;

    /// Removes every value.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Storage`](warden_domain::AuthError::Storage) if the backend cannot be written.
    fn clear(&self) -> AuthResult<()>;
}
