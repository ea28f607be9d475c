//! # pronto-store: Persistent Key-Value Store for Pronto POS
//!
//! The cart manager writes its state through the [`KeyValueStore`] trait after
//! every mutation and reads it back at start-up.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Pronto POS Data Flow                             │
//! │                                                                         │
//! │  CartManager::add_item                                                 │
//! │       │  serialize LineItem[] to JSON text                              │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  pronto-store (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌────────────────────┐        ┌────────────────────┐         │   │
//! │  │   │     FileStore      │        │    MemoryStore     │         │   │
//! │  │   │  one file per key  │        │  HashMap (tests,   │         │   │
//! │  │   │  atomic replace    │        │  ephemeral tills)  │         │   │
//! │  │   └────────────────────┘        └────────────────────┘         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ~/.local/share/pronto-pos/pos_carrito.json                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`file`] - Directory-backed store
//! - [`memory`] - In-process store
//! - [`error`] - Store error types
//!
//! ## Usage
//!
//! ```rust
//! use pronto_store::{KeyValueStore, MemoryStore};
//!
//! let store = MemoryStore::new();
//! store.set("pos_carrito", "[]").unwrap();
//! assert_eq!(store.get("pos_carrito").unwrap().as_deref(), Some("[]"));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod file;
pub mod memory;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{StoreError, StoreResult};
pub use file::FileStore;
pub use memory::MemoryStore;

/// A synchronous string key-value store.
///
/// Values are opaque text; callers choose the serialization. Operations are
/// small and local, so the trait is synchronous and safe to call while holding
/// the cart lock.
pub trait KeyValueStore: Send + Sync {
    /// Returns the value for `key`, or `None` if it was never set.
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Removes `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> StoreResult<()>;
}

/// Checks that a key is usable as a file name on every platform.
pub(crate) fn validate_key(key: &str) -> StoreResult<()> {
    if key.is_empty() {
        return Err(StoreError::invalid_key(key, "must not be empty"));
    }

    if key.starts_with('.') {
        return Err(StoreError::invalid_key(key, "must not start with '.'"));
    }

    if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(StoreError::invalid_key(
            key,
            "must contain only letters, numbers, '-', '_' and '.'",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("pos_carrito").is_ok());
        assert!(validate_key("till-2.cart").is_ok());

        assert!(validate_key("").is_err());
        assert!(validate_key(".hidden").is_err());
        assert!(validate_key("../escape").is_err());
        assert!(validate_key("a/b").is_err());
        assert!(validate_key("with space").is_err());
    }
}
