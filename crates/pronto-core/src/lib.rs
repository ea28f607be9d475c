//! # pronto-core: Pure Cart Logic for Pronto POS
//!
//! This crate holds the cart rules of the register as pure functions with
//! zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Pronto POS Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Presentation (browser / terminal)               │   │
//! │  │    Search ──► Cart ──► Customer ──► Payment ──► Receipt        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ commands                               │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 pronto-cart (Cart State Manager)                │   │
//! │  │    add_item, update_quantity, select_customer, checkout        │   │
//! │  └──────────┬──────────────────┬───────────────────┬──────────────┘   │
//! │             │                  │                   │                    │
//! │  ┌──────────▼───────┐ ┌────────▼────────┐ ┌────────▼────────┐          │
//! │  │ ★ pronto-core ★  │ │  pronto-store   │ │  pronto-client  │          │
//! │  │  Cart, Money,    │ │  key/value      │ │  catalog, sales │          │
//! │  │  totals, rules   │ │  persistence    │ │  customers      │          │
//! │  │  NO I/O          │ └─────────────────┘ └─────────────────┘          │
//! │  └──────────────────┘                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, LineItem, Customer, SalePayload)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`cart`] - Cart operations, discount selection and totals
//! - [`filter`] - Product filtering and facets
//! - [`tender`] - Change calculation
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use pronto_core::{Cart, DiscountRate, Money, Product};
//!
//! let product = Product {
//!     id: 1,
//!     code: "ZAP-001".to_string(),
//!     name: "Zapato casual".to_string(),
//!     unit_price: Money::from_cents(10000),
//!     stock: Some(5),
//!     brand: None,
//!     color: None,
//!     category_id: None,
//! };
//!
//! let mut cart = Cart::new();
//! cart.add_item(&product, 2).unwrap();
//!
//! let totals = cart.totals(DiscountRate::from_bps(1000)); // 10%
//! assert_eq!(totals.subtotal.cents(), 20000);
//! assert_eq!(totals.discount_amount.cents(), 2000);
//! assert_eq!(totals.total.cents(), 18000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod error;
pub mod filter;
pub mod money;
pub mod tender;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartTotals, Discounts};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Largest quantity a single cart line may hold.
pub const MAX_LINE_QUANTITY: i64 = 99_999;

/// Highest stock level still reported as "low".
pub const LOW_STOCK_THRESHOLD: i64 = 10;

/// Shortest catalog search query sent to the backend.
///
/// ## Business Reason
/// One-letter queries match most of the catalog and flood the result list.
pub const MIN_SEARCH_QUERY_LEN: usize = 2;
