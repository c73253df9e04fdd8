//! Key-to-handler map for active shell commands.

use std::collections::HashMap;

use super::{ShellCommandHandler, ShellError};

/// Active handlers keyed by client-chosen names.
///
/// Only the connection thread touches the registry, so it needs no locking.
#[derive(Debug, Default)]
pub struct ShellRegistry {
    handlers: HashMap<String, ShellCommandHandler>,
}

impl ShellRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails when `key` is already active.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::DuplicateKey`] for an active key.
    pub fn ensure_vacant(&self, key: &str) -> Result<(), ShellError> {
        if self.handlers.contains_key(key) {
            return Err(ShellError::duplicate_key(key));
        }
        Ok(())
    }

    /// Registers a started handler under its key.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::DuplicateKey`] when the key is already active.
    pub fn insert(&mut self, handler: ShellCommandHandler) -> Result<(), ShellError> {
        self.ensure_vacant(handler.key())?;
        self.handlers.insert(handler.key().to_owned(), handler);
        Ok(())
    }

    /// Removes and returns the handler for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::UnknownKey`] when the key is not active.
    pub fn remove(&mut self, key: &str) -> Result<ShellCommandHandler, ShellError> {
        self.handlers
            .remove(key)
            .ok_or_else(|| ShellError::unknown_key(key))
    }

    /// Returns `true` when `key` is active.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.handlers.contains_key(key)
    }

    /// Number of active handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns `true` when no handler is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Active keys in sorted order.
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}
