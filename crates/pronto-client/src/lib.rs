//! # pronto-client: Backend Collaborators for Pronto POS
//!
//! The cart manager talks to the backend only through the traits in this
//! crate, so tests can substitute in-process fakes and deployments can swap
//! transports.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   CartManager ──► OrderService::submit_sale ──────► POST /sales         │
//! │        │                                                                │
//! │        ├──────► CustomerDirectory::fetch_customer ► GET /customers/{id} │
//! │        │                                                                │
//! │        └──────► CatalogService ───────────────────► GET /products/...   │
//! │                                                                         │
//! │                 HttpBackend implements all three                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pronto_client::{HttpBackend, OrderService};
//! use std::time::Duration;
//!
//! let backend = HttpBackend::new("http://localhost:8000/api", Duration::from_secs(10))?;
//! let order_id = backend.submit_sale(&payload).await?;
//! ```

pub mod error;
pub mod http;

pub use error::{ClientError, ClientResult};
pub use http::{Endpoints, HttpBackend};

use async_trait::async_trait;
use pronto_core::{Category, Customer, CustomerId, OrderId, Product, ProductId, SalePayload};

/// Accepts finalized sales.
#[async_trait]
pub trait OrderService: Send + Sync {
    /// Submits a sale and returns the server-issued order id.
    async fn submit_sale(&self, payload: &SalePayload) -> ClientResult<OrderId>;
}

/// Looks up customers by id.
#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    /// Fetches one customer. A missing customer is `ClientError::NotFound`.
    async fn fetch_customer(&self, id: CustomerId) -> ClientResult<Customer>;
}

/// Read-only product catalog.
#[async_trait]
pub trait CatalogService: Send + Sync {
    async fn categories(&self) -> ClientResult<Vec<Category>>;

    /// Products of a category that are available for sale.
    async fn products_in_category(&self, category_id: i64) -> ClientResult<Vec<Product>>;

    /// Free-text product search. Callers validate the query first.
    async fn search(&self, query: &str) -> ClientResult<Vec<Product>>;

    /// Barcode lookup; `None` when no product has the code.
    async fn find_by_code(&self, code: &str) -> ClientResult<Option<Product>>;

    /// Units of a product in a store; `None` when the store has no record.
    async fn inventory(&self, product_id: ProductId, store_id: &str) -> ClientResult<Option<i64>>;
}
