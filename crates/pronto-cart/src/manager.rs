//! # Cart State Manager
//!
//! Owns the cart, the selected customer and the manual discount for one
//! register, keeps the stored copy in step with every mutation, and submits
//! finished sales.
//!
//! ## State
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         CartManager (Clone)                             │
//! │                                                                         │
//! │  Arc<Inner>                                                             │
//! │   ├── session: Mutex<Session>        cart, customer, discounts          │
//! │   ├── in_flight: Mutex<Option<..>>   pending checkout (shared future)   │
//! │   ├── store: Arc<dyn KeyValueStore>  write-through persistence          │
//! │   ├── orders: Arc<dyn OrderService>                                     │
//! │   ├── customers: Option<Arc<dyn CustomerDirectory>>                     │
//! │   └── catalog: Option<Arc<dyn CatalogService>>                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Checkout
//! ```text
//!   Idle ──checkout()──► Submitting ──ok──► Completed (sold lines out) ──► Idle
//!                            │
//!                            ├──err──► Failed (cart untouched) ───────► Idle
//!                            │
//!                            └──checkout() again: joins the pending
//!                               submission, no second request
//! ```
//!
//! The submission runs as its own task. A caller that stops waiting (a
//! timeout, a closed screen) does not stop it, and the phase returns to
//! `Idle` once the backend has answered.

use futures_util::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info, warn};
use ts_rs::TS;

use pronto_client::{CatalogService, CustomerDirectory, OrderService};
use pronto_core::tender::change_due;
use pronto_core::validation::{validate_product_code, validate_search_query};
use pronto_core::{
    Cart, CartTotals, Category, CoreError, Customer, CustomerId, DiscountRate, Discounts, LineItem,
    Money, OrderId, Product, ProductId,
};
use pronto_store::KeyValueStore;

use crate::config::PosConfig;
use crate::error::{CartError, CartResult, Notice, NoticeCode};

// =============================================================================
// Settings
// =============================================================================

/// What the manager needs to know about the register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartSettings {
    pub store_id: String,
    pub cart_key: String,
    pub customer_key: String,
    /// Default for [`CartManager::checkout`].
    pub require_customer: bool,
}

impl Default for CartSettings {
    fn default() -> Self {
        CartSettings {
            store_id: "1".to_string(),
            cart_key: "pos_carrito".to_string(),
            customer_key: "pos_cliente".to_string(),
            require_customer: true,
        }
    }
}

impl From<&PosConfig> for CartSettings {
    fn from(config: &PosConfig) -> Self {
        CartSettings {
            store_id: config.store.id.clone(),
            cart_key: config.storage.cart_key.clone(),
            customer_key: config.storage.customer_key.clone(),
            require_customer: config.checkout.require_customer,
        }
    }
}

// =============================================================================
// Views
// =============================================================================

/// Everything the presentation layer renders after a mutation.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartSnapshot {
    pub items: Vec<LineItem>,
    pub customer: Option<Customer>,
    #[ts(type = "string | null")]
    pub manual_discount: Option<DiscountRate>,
    pub totals: CartTotals,
}

/// Result of [`CartManager::initialize`].
#[derive(Debug, Clone, PartialEq)]
pub struct InitOutcome {
    pub snapshot: CartSnapshot,
    /// Problems met while restoring; the manager is usable regardless.
    pub notices: Vec<Notice>,
}

/// Checkout state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub enum CheckoutPhase {
    Idle,
    Submitting,
}

/// Options for [`CartManager::checkout_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckoutOptions {
    pub customer_required: bool,
    /// Cash handed over; validated against the total before submitting.
    pub tendered: Option<Money>,
}

impl Default for CheckoutOptions {
    fn default() -> Self {
        CheckoutOptions {
            customer_required: true,
            tendered: None,
        }
    }
}

/// A completed sale.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CheckoutReceipt {
    #[ts(type = "string")]
    pub order_id: OrderId,
    pub totals: CartTotals,
    #[ts(type = "string | null")]
    pub tendered: Option<Money>,
    #[ts(type = "string | null")]
    pub change: Option<Money>,
}

// =============================================================================
// Manager
// =============================================================================

type PendingCheckout = Shared<BoxFuture<'static, CartResult<CheckoutReceipt>>>;

#[derive(Debug, Default)]
struct Session {
    cart: Cart,
    customer: Option<Customer>,
    discounts: Discounts,
}

impl Session {
    fn snapshot(&self) -> CartSnapshot {
        CartSnapshot {
            items: self.cart.items().to_vec(),
            customer: self.customer.clone(),
            manual_discount: self.discounts.manual,
            totals: self.cart.totals(self.discounts.effective()),
        }
    }
}

struct Inner {
    session: Mutex<Session>,
    in_flight: Mutex<Option<PendingCheckout>>,
    store: Arc<dyn KeyValueStore>,
    orders: Arc<dyn OrderService>,
    customers: Option<Arc<dyn CustomerDirectory>>,
    catalog: Option<Arc<dyn CatalogService>>,
    settings: CartSettings,
}

impl Inner {
    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn in_flight(&self) -> MutexGuard<'_, Option<PendingCheckout>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Writes the cart through to the store. Failures are logged; the
    /// in-memory cart stays authoritative.
    fn persist_cart(&self, cart: &Cart) {
        let key = &self.settings.cart_key;
        let result = serde_json::to_string(cart.items())
            .map_err(|e| e.to_string())
            .and_then(|json| self.store.set(key, &json).map_err(|e| e.to_string()));

        if let Err(e) = result {
            warn!(key = %key, error = %e, "Failed to persist cart");
        }
    }

    fn persist_customer(&self, customer: Option<&Customer>) {
        let key = &self.settings.customer_key;
        let result = match customer {
            Some(customer) => serde_json::to_string(customer)
                .map_err(|e| e.to_string())
                .and_then(|json| self.store.set(key, &json).map_err(|e| e.to_string())),
            None => self.store.remove(key).map_err(|e| e.to_string()),
        };

        if let Err(e) = result {
            warn!(key = %key, error = %e, "Failed to persist customer");
        }
    }

    fn catalog(&self) -> CartResult<&Arc<dyn CatalogService>> {
        self.catalog.as_ref().ok_or(CartError::NotConfigured {
            service: "catalog service",
        })
    }
}

/// The Cart State Manager. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct CartManager {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for CartManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartManager")
            .field("settings", &self.inner.settings)
            .field("phase", &self.checkout_phase())
            .finish_non_exhaustive()
    }
}

/// Builder for [`CartManager`].
pub struct CartManagerBuilder {
    store: Arc<dyn KeyValueStore>,
    orders: Arc<dyn OrderService>,
    customers: Option<Arc<dyn CustomerDirectory>>,
    catalog: Option<Arc<dyn CatalogService>>,
    settings: CartSettings,
}

impl CartManagerBuilder {
    pub fn customers(mut self, customers: Arc<dyn CustomerDirectory>) -> Self {
        self.customers = Some(customers);
        self
    }

    pub fn catalog(mut self, catalog: Arc<dyn CatalogService>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn settings(mut self, settings: CartSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Builds a manager with an empty cart. Call
    /// [`CartManager::initialize`] to restore stored state.
    pub fn build(self) -> CartManager {
        CartManager {
            inner: Arc::new(Inner {
                session: Mutex::new(Session::default()),
                in_flight: Mutex::new(None),
                store: self.store,
                orders: self.orders,
                customers: self.customers,
                catalog: self.catalog,
                settings: self.settings,
            }),
        }
    }
}

impl CartManager {
    pub fn builder(
        store: Arc<dyn KeyValueStore>,
        orders: Arc<dyn OrderService>,
    ) -> CartManagerBuilder {
        CartManagerBuilder {
            store,
            orders,
            customers: None,
            catalog: None,
            settings: CartSettings::default(),
        }
    }

    /// Creates a manager with only the required collaborators.
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        orders: Arc<dyn OrderService>,
        settings: CartSettings,
    ) -> Self {
        Self::builder(store, orders).settings(settings).build()
    }

    pub fn settings(&self) -> &CartSettings {
        &self.inner.settings
    }

    // =========================================================================
    // Restore
    // =========================================================================

    /// Restores the cart and customer from the store.
    ///
    /// Never fails: unreadable or malformed data is replaced by an empty
    /// default and reported as a `PersistenceRead` notice. A restored
    /// customer's discount becomes effective.
    pub fn initialize(&self) -> InitOutcome {
        let inner = &self.inner;
        let mut notices = Vec::new();

        let cart = match restore_cart(inner.store.as_ref(), &inner.settings.cart_key) {
            Ok(cart) => cart,
            Err(err) => {
                warn!(error = %err, "Discarding stored cart");
                notices.push(err.to_notice());
                Cart::new()
            }
        };

        let customer = match restore_customer(inner.store.as_ref(), &inner.settings.customer_key) {
            Ok(customer) => customer,
            Err(err) => {
                warn!(error = %err, "Discarding stored customer");
                notices.push(err.to_notice());
                None
            }
        };

        let mut session = inner.session();
        session.discounts = Discounts {
            customer: customer
                .as_ref()
                .map(|c| c.discount)
                .unwrap_or_default(),
            manual: None,
        };
        session.customer = customer;
        session.cart = cart;

        // Rewrite whatever was discarded so the next start is clean
        if !notices.is_empty() {
            inner.persist_cart(&session.cart);
            inner.persist_customer(session.customer.as_ref());
        }

        if !session.cart.is_empty() {
            notices.push(Notice::info(
                NoticeCode::CartRestored,
                format!("Restored {} item(s) from the previous session", session.cart.item_count()),
            ));
        }

        info!(
            items = session.cart.item_count(),
            customer = session.customer.as_ref().map(|c| c.id),
            "Cart initialized"
        );

        InitOutcome {
            snapshot: session.snapshot(),
            notices,
        }
    }

    // =========================================================================
    // Cart Mutations
    // =========================================================================

    /// Adds `quantity` units of a product.
    pub fn add_item(&self, product: &Product, quantity: i64) -> CartResult<CartSnapshot> {
        self.mutate(|session| session.cart.add_item(product, quantity))
            .inspect(|_| debug!(product_id = product.id, quantity, "Added to cart"))
    }

    /// Sets a line's quantity; `quantity <= 0` removes the line.
    pub fn update_quantity(&self, product_id: ProductId, quantity: i64) -> CartResult<CartSnapshot> {
        self.mutate(|session| session.cart.update_quantity(product_id, quantity))
            .inspect(|_| debug!(product_id, quantity, "Updated quantity"))
    }

    /// Removes a line. Removing a product that is not in the cart is a no-op.
    pub fn remove_item(&self, product_id: ProductId) -> CartSnapshot {
        let inner = &self.inner;
        let mut session = inner.session();

        if session.cart.remove_item(product_id) {
            debug!(product_id, "Removed from cart");
            inner.persist_cart(&session.cart);
        }
        session.snapshot()
    }

    /// Empties the cart. Confirmation is the caller's job.
    pub fn clear(&self) -> CartSnapshot {
        let inner = &self.inner;
        let mut session = inner.session();

        session.cart.clear();
        inner.persist_cart(&session.cart);
        debug!("Cart cleared");
        session.snapshot()
    }

    /// Runs a cart operation under the lock and persists on success.
    fn mutate(
        &self,
        op: impl FnOnce(&mut Session) -> Result<(), CoreError>,
    ) -> CartResult<CartSnapshot> {
        let inner = &self.inner;
        let mut session = inner.session();

        op(&mut *session)?;
        inner.persist_cart(&session.cart);
        Ok(session.snapshot())
    }

    // =========================================================================
    // Customer & Discount
    // =========================================================================

    /// Replaces the selected customer; `None` clears it and its discount.
    pub fn select_customer(&self, customer: Option<Customer>) -> CartSnapshot {
        let inner = &self.inner;
        let mut session = inner.session();

        session.discounts.customer = customer
            .as_ref()
            .map(|c| c.discount)
            .unwrap_or_default();
        session.customer = customer;
        inner.persist_customer(session.customer.as_ref());

        debug!(
            customer_id = session.customer.as_ref().map(|c| c.id),
            discount = %session.discounts.customer,
            "Customer selected"
        );
        session.snapshot()
    }

    /// Fetches a customer from the directory and selects it.
    ///
    /// On failure the current selection is left as it was.
    pub async fn select_customer_by_id(&self, id: CustomerId) -> CartResult<CartSnapshot> {
        let customers = self
            .inner
            .customers
            .as_ref()
            .ok_or(CartError::NotConfigured {
                service: "customer directory",
            })?;

        let customer = customers.fetch_customer(id).await.map_err(|source| {
            warn!(customer_id = id, error = %source, "Customer lookup failed");
            CartError::CustomerLookup { id, source }
        })?;

        Ok(self.select_customer(Some(customer)))
    }

    /// Sets the manual discount override from a percentage such as `"12.5"`
    /// (0 to 100, at most two decimals).
    ///
    /// The larger of the customer discount and the override applies.
    pub fn set_manual_discount(&self, percent: &str) -> CartResult<CartSnapshot> {
        let rate = DiscountRate::parse(percent)?;
        let mut session = self.inner.session();

        session.discounts.manual = Some(rate);
        debug!(discount = %rate, "Manual discount set");
        Ok(session.snapshot())
    }

    /// Removes the manual override; the customer discount applies again.
    pub fn clear_manual_discount(&self) -> CartSnapshot {
        let mut session = self.inner.session();
        session.discounts.manual = None;
        session.snapshot()
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Totals for the current cart and effective discount. No side effects.
    pub fn compute_totals(&self) -> CartTotals {
        let session = self.inner.session();
        session.cart.totals(session.discounts.effective())
    }

    pub fn snapshot(&self) -> CartSnapshot {
        self.inner.session().snapshot()
    }

    pub fn customer(&self) -> Option<Customer> {
        self.inner.session().customer.clone()
    }

    pub fn effective_discount(&self) -> DiscountRate {
        self.inner.session().discounts.effective()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.session().cart.is_empty()
    }

    /// Change owed for a cash payment against the current total.
    pub fn change_for(&self, tendered: Money) -> CartResult<Money> {
        Ok(change_due(self.compute_totals().total, tendered)?)
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    pub async fn categories(&self) -> CartResult<Vec<Category>> {
        self.inner
            .catalog()?
            .categories()
            .await
            .map_err(CartError::Catalog)
    }

    pub async fn products_in_category(&self, category_id: i64) -> CartResult<Vec<Product>> {
        self.inner
            .catalog()?
            .products_in_category(category_id)
            .await
            .map_err(CartError::Catalog)
    }

    /// Searches the catalog.
    ///
    /// Returns `Ok(None)` for an empty query (show categories instead);
    /// queries shorter than two characters are rejected without a request.
    pub async fn search_products(&self, query: &str) -> CartResult<Option<Vec<Product>>> {
        let Some(query) = validate_search_query(query)? else {
            return Ok(None);
        };

        let products = self
            .inner
            .catalog()?
            .search(&query)
            .await
            .map_err(CartError::Catalog)?;
        Ok(Some(products))
    }

    /// Looks up a scanned code and adds one unit of the product.
    ///
    /// When the catalog does not report stock, the store inventory is asked.
    pub async fn scan_code(&self, code: &str) -> CartResult<CartSnapshot> {
        validate_product_code(code)?;
        let code = code.trim();
        let catalog = self.inner.catalog()?;

        let product = catalog
            .find_by_code(code)
            .await
            .map_err(CartError::Catalog)?
            .ok_or_else(|| CartError::ProductNotFound {
                code: code.to_string(),
            })?;

        let product = match product.stock {
            Some(_) => product,
            None => {
                let stock = catalog
                    .inventory(product.id, &self.inner.settings.store_id)
                    .await
                    .map_err(CartError::Catalog)?
                    .unwrap_or(0);
                product.with_stock(stock)
            }
        };

        debug!(code, product_id = product.id, "Scanned product");
        self.add_item(&product, 1)
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    pub fn checkout_phase(&self) -> CheckoutPhase {
        if self.inner.in_flight().is_some() {
            CheckoutPhase::Submitting
        } else {
            CheckoutPhase::Idle
        }
    }

    /// Submits the sale using the configured customer requirement.
    pub async fn checkout(&self) -> CartResult<OrderId> {
        let options = CheckoutOptions {
            customer_required: self.inner.settings.require_customer,
            tendered: None,
        };
        self.checkout_with(options).await.map(|r| r.order_id)
    }

    /// Submits the sale.
    ///
    /// ## Behavior
    /// - Submission already pending: awaits it and returns its outcome; no
    ///   second request is made and `options` are ignored
    /// - Empty cart: `EmptyCart`, no request
    /// - Customer required and none selected: `MissingCustomer`, no request
    /// - Tendered amount below total: `InsufficientPayment`, no request
    /// - Success: the submitted lines are taken out of the cart and the
    ///   result persisted; lines added while submitting stay, customer and
    ///   discounts are kept
    /// - Failure: cart untouched, `Submission` error
    pub async fn checkout_with(&self, options: CheckoutOptions) -> CartResult<CheckoutReceipt> {
        let pending = {
            let mut in_flight = self.inner.in_flight();

            match in_flight.clone() {
                Some(pending) => {
                    debug!("Checkout already in progress, joining");
                    pending
                }
                None => {
                    let pending = self.start_submission(options)?;
                    *in_flight = Some(pending.clone());
                    pending
                }
            }
        };

        pending.await
    }

    /// Validates the cart and builds the shared submission future.
    fn start_submission(&self, options: CheckoutOptions) -> CartResult<PendingCheckout> {
        let inner = Arc::clone(&self.inner);

        let (payload, totals, change) = {
            let session = inner.session();

            if session.cart.is_empty() {
                return Err(CartError::EmptyCart);
            }
            if options.customer_required && session.customer.is_none() {
                return Err(CartError::MissingCustomer);
            }

            let rate = session.discounts.effective();
            let totals = session.cart.totals(rate);
            let change = options
                .tendered
                .map(|tendered| change_due(totals.total, tendered))
                .transpose()?;
            let payload = session.cart.sale_payload(
                session.customer.as_ref(),
                &inner.settings.store_id,
                rate,
            );
            (payload, totals, change)
        };

        info!(
            items = payload.items.len(),
            total = %payload.total,
            customer_id = payload.customer_id,
            "Submitting sale"
        );

        let tendered = options.tendered;
        let reset = ResetOnDrop(Arc::clone(&inner));
        let submission = async move {
            let _reset = reset;

            match inner.orders.submit_sale(&payload).await {
                Ok(order_id) => {
                    let mut session = inner.session();
                    session.cart.settle(&payload.items);
                    inner.persist_cart(&session.cart);
                    info!(
                        order_id = %order_id,
                        total = %totals.total,
                        remaining = session.cart.item_count(),
                        "Sale completed"
                    );

                    Ok(CheckoutReceipt {
                        order_id,
                        totals,
                        tendered,
                        change,
                    })
                }
                Err(e) => {
                    error!(error = %e, "Sale submission failed, cart kept for retry");
                    Err(CartError::Submission(e))
                }
            }
        };

        let task = tokio::spawn(submission);
        let outcome = async move {
            task.await.unwrap_or_else(|e| {
                error!(error = %e, "Sale submission task did not finish");
                Err(CartError::CheckoutInterrupted {
                    reason: e.to_string(),
                })
            })
        };

        Ok(outcome.boxed().shared())
    }
}

/// Returns the manager to `Idle` when a submission task ends, however it
/// ends.
struct ResetOnDrop(Arc<Inner>);

impl Drop for ResetOnDrop {
    fn drop(&mut self) {
        *self.0.in_flight() = None;
    }
}

// =============================================================================
// Restore Helpers
// =============================================================================

fn restore_cart(store: &dyn KeyValueStore, key: &str) -> CartResult<Cart> {
    let unreadable = |reason: String| CartError::PersistenceRead {
        key: key.to_string(),
        reason,
    };

    let Some(json) = store.get(key).map_err(|e| unreadable(e.to_string()))? else {
        return Ok(Cart::new());
    };

    let items: Vec<LineItem> =
        serde_json::from_str(&json).map_err(|e| unreadable(e.to_string()))?;
    Cart::from_items(items).map_err(|e| unreadable(e.to_string()))
}

fn restore_customer(store: &dyn KeyValueStore, key: &str) -> CartResult<Option<Customer>> {
    let unreadable = |reason: String| CartError::PersistenceRead {
        key: key.to_string(),
        reason,
    };

    let Some(json) = store.get(key).map_err(|e| unreadable(e.to_string()))? else {
        return Ok(None);
    };

    // Stored "null" means no customer
    serde_json::from_str::<Option<Customer>>(&json).map_err(|e| unreadable(e.to_string()))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pronto_client::{ClientError, ClientResult};
    use pronto_core::SalePayload;
    use pronto_store::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// Order service that records payloads and can be held until released.
    #[derive(Default)]
    struct FakeOrders {
        calls: AtomicUsize,
        payloads: Mutex<Vec<SalePayload>>,
        gate: Option<Arc<Notify>>,
        fail_with: Option<ClientError>,
    }

    impl FakeOrders {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl OrderService for FakeOrders {
        async fn submit_sale(&self, payload: &SalePayload) -> ClientResult<OrderId> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            self.payloads.lock().unwrap().push(payload.clone());

            if let Some(gate) = &self.gate {
                gate.notified().await;
            }

            match &self.fail_with {
                Some(err) => Err(err.clone()),
                None => Ok(OrderId::new(format!("{}", 1000 + n))),
            }
        }
    }

    struct FakeCustomers;

    #[async_trait]
    impl CustomerDirectory for FakeCustomers {
        async fn fetch_customer(&self, id: CustomerId) -> ClientResult<Customer> {
            match id {
                7 => Ok(Customer::new(7, "Ana", DiscountRate::from_bps(1000))),
                _ => Err(ClientError::NotFound {
                    resource: format!("customer {}", id),
                }),
            }
        }
    }

    fn product(id: ProductId, price_cents: i64, stock: i64) -> Product {
        Product {
            id,
            code: format!("SKU-{}", id),
            name: format!("Product {}", id),
            unit_price: Money::from_cents(price_cents),
            stock: Some(stock),
            brand: None,
            color: None,
            category_id: None,
        }
    }

    fn manager_with(store: Arc<MemoryStore>, orders: Arc<FakeOrders>) -> CartManager {
        CartManager::builder(store, orders)
            .customers(Arc::new(FakeCustomers))
            .build()
    }

    fn ana() -> Customer {
        Customer::new(7, "Ana", DiscountRate::from_bps(1000))
    }

    #[test]
    fn test_totals_with_customer_discount() {
        let manager = manager_with(Arc::new(MemoryStore::new()), Arc::default());

        manager.add_item(&product(1, 10000, 5), 2).unwrap();
        manager.select_customer(Some(ana()));

        let totals = manager.compute_totals();
        assert_eq!(totals.subtotal, Money::from_cents(20000));
        assert_eq!(totals.discount_amount, Money::from_cents(2000));
        assert_eq!(totals.total, Money::from_cents(18000));
    }

    #[test]
    fn test_add_without_stock_leaves_cart_empty() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager_with(store.clone(), Arc::default());

        let err = manager.add_item(&product(1, 500, 0), 1).unwrap_err();
        assert!(matches!(err, CartError::InsufficientStock { .. }));
        assert!(manager.snapshot().items.is_empty());
        // Nothing written for a failed mutation
        assert_eq!(store.get("pos_carrito").unwrap(), None);
    }

    #[test]
    fn test_every_mutation_is_written_through() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager_with(store.clone(), Arc::default());

        manager.add_item(&product(1, 250, 5), 2).unwrap();
        let stored: Vec<LineItem> =
            serde_json::from_str(&store.get("pos_carrito").unwrap().unwrap()).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].quantity, 2);

        manager.update_quantity(1, 4).unwrap();
        let stored: Vec<LineItem> =
            serde_json::from_str(&store.get("pos_carrito").unwrap().unwrap()).unwrap();
        assert_eq!(stored[0].quantity, 4);

        manager.clear();
        assert_eq!(store.get("pos_carrito").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_update_above_stock_keeps_quantity() {
        let manager = manager_with(Arc::new(MemoryStore::new()), Arc::default());
        manager.add_item(&product(1, 250, 3), 2).unwrap();

        let err = manager.update_quantity(1, 4).unwrap_err();
        assert_eq!(err.code(), NoticeCode::StockExceeded);
        assert_eq!(manager.snapshot().items[0].quantity, 2);
    }

    #[test]
    fn test_manual_discount_policy() {
        let manager = manager_with(Arc::new(MemoryStore::new()), Arc::default());
        manager.add_item(&product(1, 10000, 5), 1).unwrap();
        manager.select_customer(Some(ana()));

        // Lower override does not reduce the customer discount
        manager.set_manual_discount("5").unwrap();
        assert_eq!(manager.effective_discount().bps(), 1000);

        manager.set_manual_discount("25").unwrap();
        assert_eq!(manager.compute_totals().total, Money::from_cents(7500));

        for bad in ["120", "-5", "diez", "NaN"] {
            assert!(matches!(
                manager.set_manual_discount(bad),
                Err(CartError::InvalidDiscount { .. })
            ));
        }
        assert_eq!(manager.effective_discount().bps(), 2500);

        manager.clear_manual_discount();
        assert_eq!(manager.effective_discount().bps(), 1000);

        manager.select_customer(None);
        assert!(manager.effective_discount().is_zero());
    }

    #[test]
    fn test_add_overflowing_quantity_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager_with(store.clone(), Arc::default());

        let err = manager
            .add_item(&product(1, 89990, i64::MAX), 200_000_000_000_000)
            .unwrap_err();
        assert!(matches!(err, CartError::Validation(_)));
        assert!(manager.is_empty());
        assert_eq!(store.get("pos_carrito").unwrap(), None);
    }

    #[test]
    fn test_initialize_restores_cart_and_customer() {
        let store = Arc::new(MemoryStore::new());
        {
            let manager = manager_with(store.clone(), Arc::default());
            manager.add_item(&product(2, 150, 9), 3).unwrap();
            manager.add_item(&product(1, 999, 9), 1).unwrap();
            manager.select_customer(Some(ana()));
        }

        let manager = manager_with(store, Arc::default());
        let outcome = manager.initialize();

        let ids: Vec<(ProductId, i64, i64)> = outcome
            .snapshot
            .items
            .iter()
            .map(|i| (i.product_id, i.quantity, i.unit_price.cents()))
            .collect();
        assert_eq!(ids, vec![(2, 3, 150), (1, 1, 999)]);
        assert_eq!(manager.customer().map(|c| c.id), Some(7));
        assert_eq!(manager.effective_discount().bps(), 1000);
        assert_eq!(outcome.notices.len(), 1);
        assert_eq!(outcome.notices[0].code, NoticeCode::CartRestored);
    }

    #[test]
    fn test_initialize_discards_malformed_data() {
        let store = Arc::new(MemoryStore::with_entries([
            ("pos_carrito", "{not json"),
            ("pos_cliente", r#"{"id": "seven"}"#),
        ]));
        let manager = manager_with(store.clone(), Arc::default());

        let outcome = manager.initialize();
        assert!(outcome.snapshot.items.is_empty());
        assert!(outcome.snapshot.customer.is_none());

        let codes: Vec<NoticeCode> = outcome.notices.iter().map(|n| n.code).collect();
        assert_eq!(codes, vec![NoticeCode::PersistenceRead, NoticeCode::PersistenceRead]);

        assert_eq!(store.get("pos_carrito").unwrap().as_deref(), Some("[]"));
        assert_eq!(store.get("pos_cliente").unwrap(), None);

        // Still usable
        manager.add_item(&product(1, 100, 1), 1).unwrap();
    }

    #[test]
    fn test_initialize_rejects_invalid_stored_quantities() {
        let store = Arc::new(MemoryStore::with_entries([(
            "pos_carrito",
            r#"[{"productId":1,"code":"A","name":"A","unitPrice":"1.00","quantity":0,"stock":3}]"#,
        )]));
        let manager = manager_with(store, Arc::default());

        let outcome = manager.initialize();
        assert!(outcome.snapshot.items.is_empty());
        assert_eq!(outcome.notices[0].code, NoticeCode::PersistenceRead);
    }

    #[tokio::test]
    async fn test_checkout_empty_cart_makes_no_call() {
        let orders = Arc::new(FakeOrders::default());
        let manager = manager_with(Arc::new(MemoryStore::new()), orders.clone());
        manager.select_customer(Some(ana()));

        assert_eq!(manager.checkout().await, Err(CartError::EmptyCart));
        assert_eq!(orders.calls(), 0);
        assert_eq!(manager.checkout_phase(), CheckoutPhase::Idle);
    }

    #[tokio::test]
    async fn test_checkout_requires_customer() {
        let orders = Arc::new(FakeOrders::default());
        let manager = manager_with(Arc::new(MemoryStore::new()), orders.clone());
        manager.add_item(&product(1, 100, 5), 1).unwrap();

        assert_eq!(manager.checkout().await, Err(CartError::MissingCustomer));
        assert_eq!(orders.calls(), 0);

        let receipt = manager
            .checkout_with(CheckoutOptions {
                customer_required: false,
                tendered: None,
            })
            .await
            .unwrap();
        assert_eq!(receipt.order_id.as_str(), "1001");
        assert_eq!(orders.payloads.lock().unwrap()[0].customer_id, None);
    }

    #[tokio::test]
    async fn test_checkout_success_clears_cart() {
        let store = Arc::new(MemoryStore::new());
        let orders = Arc::new(FakeOrders::default());
        let manager = manager_with(store.clone(), orders.clone());

        manager.add_item(&product(1, 10000, 5), 2).unwrap();
        manager.select_customer(Some(ana()));

        let receipt = manager
            .checkout_with(CheckoutOptions {
                customer_required: true,
                tendered: Some(Money::from_cents(20000)),
            })
            .await
            .unwrap();

        assert_eq!(receipt.totals.total, Money::from_cents(18000));
        assert_eq!(receipt.change, Some(Money::from_cents(2000)));
        assert!(manager.is_empty());
        assert_eq!(store.get("pos_carrito").unwrap().as_deref(), Some("[]"));
        assert_eq!(manager.customer().map(|c| c.id), Some(7));

        let payload = orders.payloads.lock().unwrap()[0].clone();
        assert_eq!(payload.customer_id, Some(7));
        assert_eq!(payload.store_id, "1");
        assert_eq!(payload.discount_percent.bps(), 1000);
        assert_eq!(payload.total, Money::from_cents(18000));
    }

    #[tokio::test]
    async fn test_checkout_insufficient_payment_makes_no_call() {
        let orders = Arc::new(FakeOrders::default());
        let manager = manager_with(Arc::new(MemoryStore::new()), orders.clone());
        manager.add_item(&product(1, 10000, 5), 1).unwrap();
        manager.select_customer(Some(ana()));

        let err = manager
            .checkout_with(CheckoutOptions {
                customer_required: true,
                tendered: Some(Money::from_cents(5000)),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::InsufficientPayment { .. }));
        assert_eq!(orders.calls(), 0);
    }

    #[tokio::test]
    async fn test_checkout_failure_keeps_cart_for_retry() {
        let orders = Arc::new(FakeOrders {
            fail_with: Some(ClientError::Http {
                status: 503,
                body: "busy".to_string(),
            }),
            ..FakeOrders::default()
        });
        let manager = manager_with(Arc::new(MemoryStore::new()), orders.clone());
        manager.add_item(&product(1, 100, 5), 3).unwrap();
        manager.select_customer(Some(ana()));

        let err = manager.checkout().await.unwrap_err();
        assert!(matches!(err, CartError::Submission(_)));
        assert!(err.is_retryable());
        assert_eq!(manager.snapshot().items[0].quantity, 3);
        assert_eq!(manager.checkout_phase(), CheckoutPhase::Idle);

        // Retry issues a new request
        assert!(manager.checkout().await.is_err());
        assert_eq!(orders.calls(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_checkouts_make_one_call() {
        let gate = Arc::new(Notify::new());
        let orders = Arc::new(FakeOrders {
            gate: Some(gate.clone()),
            ..FakeOrders::default()
        });
        let manager = manager_with(Arc::new(MemoryStore::new()), orders.clone());
        manager.add_item(&product(1, 10000, 5), 2).unwrap();
        manager.select_customer(Some(ana()));

        let release = async {
            while orders.calls() == 0 {
                tokio::task::yield_now().await;
            }
            assert_eq!(manager.checkout_phase(), CheckoutPhase::Submitting);
            // Rung up while the sale is still with the backend
            manager.add_item(&product(3, 500, 4), 1).unwrap();
            gate.notify_one();
        };

        let (first, second, ()) = tokio::join!(manager.checkout(), manager.checkout(), release);

        assert_eq!(orders.calls(), 1);
        assert_eq!(first.unwrap(), second.unwrap());
        assert_eq!(orders.payloads.lock().unwrap()[0].items.len(), 1);

        let left: Vec<(ProductId, i64)> = manager
            .snapshot()
            .items
            .iter()
            .map(|i| (i.product_id, i.quantity))
            .collect();
        assert_eq!(left, vec![(3, 1)]);
        assert_eq!(manager.checkout_phase(), CheckoutPhase::Idle);
    }

    #[tokio::test]
    async fn test_abandoned_checkout_still_completes() {
        let gate = Arc::new(Notify::new());
        let orders = Arc::new(FakeOrders {
            gate: Some(gate.clone()),
            ..FakeOrders::default()
        });
        let store = Arc::new(MemoryStore::new());
        let manager = manager_with(store.clone(), orders.clone());
        manager.add_item(&product(1, 10000, 5), 2).unwrap();
        manager.select_customer(Some(ana()));

        let waited =
            tokio::time::timeout(std::time::Duration::from_millis(10), manager.checkout()).await;
        assert!(waited.is_err());

        while orders.calls() == 0 {
            tokio::task::yield_now().await;
        }
        assert_eq!(manager.checkout_phase(), CheckoutPhase::Submitting);

        manager.add_item(&product(1, 10000, 5), 1).unwrap();
        manager.add_item(&product(2, 300, 5), 1).unwrap();
        gate.notify_one();

        while manager.checkout_phase() == CheckoutPhase::Submitting {
            tokio::task::yield_now().await;
        }

        // Only the submitted two units of product 1 are gone
        let left: Vec<(ProductId, i64)> = manager
            .snapshot()
            .items
            .iter()
            .map(|i| (i.product_id, i.quantity))
            .collect();
        assert_eq!(left, vec![(1, 1), (2, 1)]);
        let stored: Vec<LineItem> =
            serde_json::from_str(&store.get("pos_carrito").unwrap().unwrap()).unwrap();
        assert_eq!(stored.len(), 2);

        // The register is usable again and sells the remainder
        gate.notify_one();
        let order_id = manager.checkout().await.unwrap();
        assert_eq!(order_id.as_str(), "1002");
        assert_eq!(orders.calls(), 2);
        assert_eq!(orders.payloads.lock().unwrap()[1].items.len(), 2);
        assert!(manager.is_empty());
    }

    #[tokio::test]
    async fn test_select_customer_by_id() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager_with(store.clone(), Arc::default());

        let snapshot = manager.select_customer_by_id(7).await.unwrap();
        assert_eq!(snapshot.customer.map(|c| c.name), Some("Ana".to_string()));
        assert!(store.get("pos_cliente").unwrap().is_some());

        let err = manager.select_customer_by_id(99).await.unwrap_err();
        assert!(matches!(err, CartError::CustomerLookup { id: 99, .. }));
        // Selection untouched
        assert_eq!(manager.customer().map(|c| c.id), Some(7));
    }

    #[tokio::test]
    async fn test_catalog_calls_without_catalog() {
        let manager = manager_with(Arc::new(MemoryStore::new()), Arc::default());

        assert!(matches!(
            manager.scan_code("ZAP-001").await,
            Err(CartError::NotConfigured { .. })
        ));
        // Validation happens before the collaborator is needed
        assert!(matches!(
            manager.search_products("a").await,
            Err(CartError::Validation(_))
        ));
        assert_eq!(manager.search_products("  ").await, Ok(None));
    }
}
