//! # pronto-cart: Cart State Manager for Pronto POS
//!
//! One [`CartManager`] per register session. It is constructed once, shared
//! by handle with whatever drives the UI, and is the only writer of the
//! stored cart.
//!
//! ## Module Organization
//!
//! - [`manager`] - The Cart State Manager and its view types
//! - [`config`] - Register configuration (TOML + environment)
//! - [`error`] - Cart errors and user-visible notices
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pronto_cart::{CartManager, CartSettings, PosConfig};
//! use pronto_client::HttpBackend;
//! use pronto_store::FileStore;
//! use std::sync::Arc;
//!
//! let config = PosConfig::load_or_default(None);
//! let backend = Arc::new(HttpBackend::new(&config.api.base_url, config.api_timeout())?);
//! let store = Arc::new(FileStore::open(config.storage_dir())?);
//!
//! let manager = CartManager::builder(store, backend.clone())
//!     .customers(backend.clone())
//!     .catalog(backend)
//!     .settings(CartSettings::from(&config))
//!     .build();
//! let restored = manager.initialize();
//!
//! manager.scan_code("7501234567890").await?;
//! let order_id = manager.checkout().await?;
//! ```

pub mod config;
pub mod error;
pub mod manager;

pub use config::{ConfigError, PosConfig};
pub use error::{CartError, CartResult, Notice, NoticeCode, Severity};
pub use manager::{
    CartManager, CartManagerBuilder, CartSettings, CartSnapshot, CheckoutOptions, CheckoutPhase,
    CheckoutReceipt, InitOutcome,
};
