//! # Store Error Types
//!
//! Error types for key-value store operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  std::io::Error (file store)                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StoreError (this module) ← Adds the key that failed                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CartError::PersistenceRead / logged write failure (pronto-cart)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Key-value store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The key cannot be used as a storage name.
    ///
    /// ## When This Occurs
    /// - Empty key
    /// - Characters outside letters, digits, `-`, `_` and `.`
    /// - Key starting with `.`
    #[error("Invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    /// Reading a value failed.
    #[error("Failed to read '{key}': {source}")]
    Read {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// Writing or removing a value failed.
    ///
    /// ## When This Occurs
    /// - Disk full
    /// - Storage directory removed or not writable
    #[error("Failed to write '{key}': {source}")]
    Write {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// The storage location could not be prepared.
    #[error("Storage unavailable at {path}: {source}")]
    Unavailable {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    /// Creates an InvalidKey error.
    pub fn invalid_key(key: impl Into<String>, reason: impl Into<String>) -> Self {
        StoreError::InvalidKey {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Returns the key involved, if the error concerns one.
    pub fn key(&self) -> Option<&str> {
        match self {
            StoreError::InvalidKey { key, .. }
            | StoreError::Read { key, .. }
            | StoreError::Write { key, .. } => Some(key),
            StoreError::Unavailable { .. } => None,
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
