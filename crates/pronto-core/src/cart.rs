//! # Cart
//!
//! Pure cart math: line items, discount selection and totals.
//!
//! ## Cart Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  add_item(product, qty) ───► existing line? ── yes ──► quantity += qty │
//! │                                    │                                    │
//! │                                    no ─────────────► items.push(line)  │
//! │                                                                         │
//! │  update_quantity(id, n) ───► n <= 0 ──────────────► remove_item(id)    │
//! │                              n > stock ───────────► StockExceeded      │
//! │                              otherwise ───────────► quantity = n       │
//! │                                                                         │
//! │  totals(rate) ─────────────► subtotal, discount_amount, total          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing here touches storage or the network; the cart manager in
//! `pronto-cart` wraps these operations with persistence.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Customer, DiscountRate, LineItem, Product, ProductId, SaleLine, SalePayload};
use crate::validation::{validate_price, validate_quantity, validate_stock};

// =============================================================================
// Discounts
// =============================================================================

/// The two discount sources of a sale.
///
/// ## Policy
/// The effective discount is the larger of the customer discount and the
/// manual override. Sources never stack.
///
/// ```rust
/// use pronto_core::cart::Discounts;
/// use pronto_core::types::DiscountRate;
///
/// let discounts = Discounts {
///     customer: DiscountRate::from_bps(1000),
///     manual: Some(DiscountRate::from_bps(500)),
/// };
/// assert_eq!(discounts.effective().bps(), 1000);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Discounts {
    /// Discount of the selected customer (zero when none is selected).
    pub customer: DiscountRate,

    /// Manually entered override, if any.
    pub manual: Option<DiscountRate>,
}

impl Discounts {
    /// Returns the discount that applies to totals.
    pub fn effective(&self) -> DiscountRate {
        match self.manual {
            Some(manual) => manual.max(self.customer),
            None => self.customer,
        }
    }
}

// =============================================================================
// Cart
// =============================================================================

/// The shopping cart.
///
/// ## Invariants
/// - Items are unique by `product_id` (adding the same product accumulates)
/// - Every quantity is in `1..=MAX_LINE_QUANTITY`
/// - Every `line_subtotal` equals `unit_price × quantity`, and the subtotal
///   of all lines fits in [`Money`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cart {
    items: Vec<LineItem>,
}

impl Cart {
    /// Creates a new empty cart.
    pub fn new() -> Self {
        Cart { items: Vec::new() }
    }

    /// Rebuilds a cart from stored line items.
    ///
    /// ## Rules
    /// - Quantities must be in `1..=MAX_LINE_QUANTITY`
    /// - Prices and stock must be >= 0
    /// - Product ids must be unique
    ///
    /// Line subtotals are recomputed; stored values are never trusted.
    pub fn from_items(items: Vec<LineItem>) -> CoreResult<Self> {
        let mut seen = HashSet::with_capacity(items.len());
        let mut cart = Cart::new();

        for mut item in items {
            validate_quantity(item.quantity)?;
            validate_price(item.unit_price)?;
            validate_stock(item.stock)?;

            if !seen.insert(item.product_id) {
                return Err(ValidationError::Duplicate {
                    field: "productId".to_string(),
                    value: item.product_id.to_string(),
                }
                .into());
            }

            item.recompute()?;
            cart.ensure_subtotal_fits(item.product_id, item.line_subtotal)?;
            cart.items.push(item);
        }

        Ok(cart)
    }

    /// Adds a product to the cart or increases its quantity.
    ///
    /// ## Behavior
    /// - `quantity < 1` or no stock: `InsufficientStock`, cart unchanged
    /// - Product already in cart: quantities accumulate and the known stock is
    ///   refreshed; the original price stays frozen
    /// - Otherwise a new line is appended
    /// - Resulting quantity above `MAX_LINE_QUANTITY`, or amounts that no
    ///   longer fit: `Validation`, cart unchanged
    ///
    /// Accumulated quantities are not capped by stock here; `update_quantity`
    /// enforces the stock bound.
    pub fn add_item(&mut self, product: &Product, quantity: i64) -> CoreResult<()> {
        let available = product.available_stock();
        if quantity < 1 || available <= 0 {
            return Err(CoreError::InsufficientStock {
                code: product.code.clone(),
                available,
                requested: quantity,
            });
        }
        validate_price(product.unit_price)?;

        if let Some(index) = self.position(product.id) {
            let item = &self.items[index];
            let accumulated = item.quantity.saturating_add(quantity);
            validate_quantity(accumulated)?;
            let line = item.subtotal_for(accumulated)?;
            self.ensure_subtotal_fits(product.id, line)?;

            let item = &mut self.items[index];
            item.set_quantity(accumulated)?;
            item.stock = available;
            return Ok(());
        }

        validate_quantity(quantity)?;
        let item = LineItem::from_product(product, quantity)?;
        self.ensure_subtotal_fits(product.id, item.line_subtotal)?;
        self.items.push(item);
        Ok(())
    }

    /// Sets the quantity of a line.
    ///
    /// ## Behavior
    /// - `quantity <= 0`: same as [`Cart::remove_item`]
    /// - Product not in cart: no-op
    /// - `quantity` above the line's known stock: `StockExceeded`, unchanged
    pub fn update_quantity(&mut self, product_id: ProductId, quantity: i64) -> CoreResult<()> {
        if quantity <= 0 {
            self.remove_item(product_id);
            return Ok(());
        }

        let Some(index) = self.position(product_id) else {
            return Ok(());
        };

        let item = &self.items[index];
        if quantity > item.stock {
            return Err(CoreError::StockExceeded {
                code: item.code.clone(),
                available: item.stock,
                requested: quantity,
            });
        }
        validate_quantity(quantity)?;
        let line = item.subtotal_for(quantity)?;
        self.ensure_subtotal_fits(product_id, line)?;

        self.items[index].set_quantity(quantity)?;
        Ok(())
    }

    /// Takes sold lines out of the cart.
    ///
    /// Each sold quantity is subtracted from the matching line; lines that
    /// reach zero are removed. Anything added after the sale was built stays.
    pub fn settle(&mut self, sold: &[SaleLine]) {
        for line in sold {
            let Some(index) = self.position(line.product_id) else {
                continue;
            };

            let remaining = self.items[index].quantity - line.quantity;
            if remaining <= 0 || self.items[index].set_quantity(remaining).is_err() {
                self.items.remove(index);
            }
        }
    }

    /// Removes a line by product id. Returns whether a line was removed.
    pub fn remove_item(&mut self, product_id: ProductId) -> bool {
        let initial_len = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        self.items.len() != initial_len
    }

    /// Clears all items from the cart.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Returns the line for a product, if present.
    pub fn get(&self, product_id: ProductId) -> Option<&LineItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    /// Returns the lines in insertion order.
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Returns the number of distinct lines.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Returns the total quantity of all lines.
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Sum of line subtotals.
    pub fn subtotal(&self) -> Money {
        self.items.iter().map(|i| i.line_subtotal).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn position(&self, product_id: ProductId) -> Option<usize> {
        self.items.iter().position(|i| i.product_id == product_id)
    }

    /// Checks that the subtotal still fits with `product_id`'s line at `line`.
    fn ensure_subtotal_fits(&self, product_id: ProductId, line: Money) -> CoreResult<()> {
        self.items
            .iter()
            .filter(|i| i.product_id != product_id)
            .try_fold(line, |sum, i| sum.checked_add(i.line_subtotal))
            .map(|_| ())
            .ok_or_else(|| {
                CoreError::Validation(ValidationError::TooLarge {
                    field: "subtotal".to_string(),
                })
            })
    }

    /// Computes totals for a discount rate. Pure: the cart is not modified.
    pub fn totals(&self, rate: DiscountRate) -> CartTotals {
        let subtotal = self.subtotal();
        let discount_amount = subtotal.discount_amount(rate);

        CartTotals {
            item_count: self.item_count(),
            total_quantity: self.total_quantity(),
            subtotal,
            discount_rate: rate,
            discount_amount,
            total: subtotal - discount_amount,
        }
    }

    /// Builds the sale submission body for this cart.
    pub fn sale_payload(
        &self,
        customer: Option<&Customer>,
        store_id: &str,
        rate: DiscountRate,
    ) -> SalePayload {
        SalePayload {
            customer_id: customer.map(|c| c.id),
            store_id: store_id.to_string(),
            discount_percent: rate,
            total: self.totals(rate).total,
            items: self.items.iter().map(SaleLine::from).collect(),
        }
    }
}

// =============================================================================
// Cart Totals
// =============================================================================

/// Derived totals. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartTotals {
    pub item_count: usize,
    pub total_quantity: i64,
    #[ts(type = "string")]
    pub subtotal: Money,
    #[ts(type = "string")]
    pub discount_rate: DiscountRate,
    #[ts(type = "string")]
    pub discount_amount: Money,
    #[ts(type = "string")]
    pub total: Money,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn test_product(id: ProductId, price_cents: i64, stock: i64) -> Product {
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

    #[test]
    fn test_cart_add_item() {
        let mut cart = Cart::new();
        cart.add_item(&test_product(1, 999, 10), 2).unwrap();

        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.total_quantity(), 2);
        assert_eq!(cart.subtotal().cents(), 1998);
        assert_eq!(cart.items()[0].line_subtotal.cents(), 1998);
    }

    #[test]
    fn test_cart_add_same_product_accumulates() {
        let mut cart = Cart::new();
        let product = test_product(1, 999, 3);

        cart.add_item(&product, 2).unwrap();
        cart.add_item(&product, 3).unwrap();

        // Accumulation is not capped by stock at add time
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.total_quantity(), 5);
        assert_eq!(cart.subtotal().cents(), 4995);
    }

    #[test]
    fn test_cart_add_refreshes_known_stock() {
        let mut cart = Cart::new();
        cart.add_item(&test_product(1, 100, 2), 1).unwrap();
        cart.add_item(&test_product(1, 100, 8), 1).unwrap();

        assert_eq!(cart.get(1).unwrap().stock, 8);
    }

    #[test]
    fn test_cart_add_without_stock_fails() {
        let mut cart = Cart::new();
        let err = cart.add_item(&test_product(1, 999, 0), 1).unwrap_err();

        assert!(matches!(err, CoreError::InsufficientStock { available: 0, .. }));
        assert!(cart.is_empty());

        let mut unknown = test_product(2, 999, 0);
        unknown.stock = None;
        assert!(cart.add_item(&unknown, 1).is_err());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_cart_add_non_positive_quantity_fails() {
        let mut cart = Cart::new();
        let err = cart.add_item(&test_product(1, 999, 5), 0).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientStock { requested: 0, .. }));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_cart_add_huge_quantity_fails() {
        let mut cart = Cart::new();
        let product = test_product(1, 89990, 5);

        let err = cart.add_item(&product, 200_000_000_000_000).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::OutOfRange { .. })
        ));
        assert!(cart.is_empty());

        cart.add_item(&product, 2).unwrap();
        assert!(cart.add_item(&product, i64::MAX).is_err());
        assert_eq!(cart.get(1).unwrap().quantity, 2);
        assert_eq!(cart.subtotal().cents(), 179980);
    }

    #[test]
    fn test_cart_rejects_subtotal_overflow() {
        let mut cart = Cart::new();
        cart.add_item(&test_product(1, i64::MAX / 2, 5), 1).unwrap();

        let err = cart.add_item(&test_product(2, i64::MAX / 2, 5), 2).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::TooLarge { .. })
        ));
        assert_eq!(cart.item_count(), 1);

        let err = cart.update_quantity(1, 3).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(cart.get(1).unwrap().quantity, 1);
        assert!(cart.subtotal().is_positive());
    }

    #[test]
    fn test_settle_removes_only_sold_quantities() {
        let mut cart = Cart::new();
        cart.add_item(&test_product(1, 100, 10), 2).unwrap();
        cart.add_item(&test_product(2, 200, 10), 1).unwrap();
        let sold = cart
            .sale_payload(None, "1", DiscountRate::zero())
            .items;

        // Added while the sale was being submitted
        cart.add_item(&test_product(1, 100, 10), 3).unwrap();
        cart.add_item(&test_product(3, 300, 10), 1).unwrap();

        cart.settle(&sold);

        let left: Vec<(ProductId, i64)> =
            cart.items().iter().map(|i| (i.product_id, i.quantity)).collect();
        assert_eq!(left, vec![(1, 3), (3, 1)]);
        assert_eq!(cart.subtotal().cents(), 600);
    }

    #[test]
    fn test_update_quantity_within_stock() {
        let mut cart = Cart::new();
        cart.add_item(&test_product(1, 250, 5), 1).unwrap();

        cart.update_quantity(1, 5).unwrap();
        assert_eq!(cart.get(1).unwrap().quantity, 5);
        assert_eq!(cart.subtotal().cents(), 1250);
    }

    #[test]
    fn test_update_quantity_above_stock_fails() {
        let mut cart = Cart::new();
        cart.add_item(&test_product(1, 250, 5), 2).unwrap();

        let err = cart.update_quantity(1, 6).unwrap_err();
        assert!(matches!(
            err,
            CoreError::StockExceeded { available: 5, requested: 6, .. }
        ));
        assert_eq!(cart.get(1).unwrap().quantity, 2);
    }

    #[test]
    fn test_update_quantity_zero_equals_remove() {
        let mut by_update = Cart::new();
        by_update.add_item(&test_product(1, 100, 5), 1).unwrap();
        by_update.add_item(&test_product(2, 200, 5), 1).unwrap();
        let mut by_remove = by_update.clone();

        by_update.update_quantity(1, 0).unwrap();
        by_remove.remove_item(1);

        assert_eq!(by_update.items(), by_remove.items());
    }

    #[test]
    fn test_update_missing_item_is_noop() {
        let mut cart = Cart::new();
        cart.add_item(&test_product(1, 100, 5), 1).unwrap();

        cart.update_quantity(99, 3).unwrap();
        assert_eq!(cart.item_count(), 1);
    }

    #[test]
    fn test_remove_missing_item_is_noop() {
        let mut cart = Cart::new();
        assert!(!cart.remove_item(42));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_totals_with_customer_discount() {
        let mut cart = Cart::new();
        cart.add_item(&test_product(1, 10000, 10), 2).unwrap();

        let totals = cart.totals(DiscountRate::from_bps(1000));
        assert_eq!(totals.subtotal.cents(), 20000);
        assert_eq!(totals.discount_amount.cents(), 2000);
        assert_eq!(totals.total.cents(), 18000);
    }

    #[test]
    fn test_subtotal_tracks_every_mutation() {
        let mut cart = Cart::new();
        let products: Vec<Product> = (1..=4)
            .map(|id| test_product(id, id * 137, 20))
            .collect();

        let steps: [(u8, usize, i64); 9] = [
            (0, 0, 2),
            (0, 1, 1),
            (1, 0, 7),
            (0, 2, 3),
            (2, 1, 0),
            (0, 0, 1),
            (1, 2, 0),
            (0, 3, 4),
            (1, 3, 9),
        ];

        for (op, idx, qty) in steps {
            let product = &products[idx];
            match op {
                0 => cart.add_item(product, qty).unwrap(),
                1 => cart.update_quantity(product.id, qty).unwrap(),
                _ => {
                    cart.remove_item(product.id);
                }
            }

            let expected: i64 = cart
                .items()
                .iter()
                .map(|i| i.unit_price.cents() * i.quantity)
                .sum();
            assert_eq!(cart.totals(DiscountRate::zero()).subtotal.cents(), expected);
        }
    }

    #[test]
    fn test_from_items_recomputes_and_validates() {
        let mut item = LineItem::from_product(&test_product(1, 500, 4), 2).unwrap();
        item.line_subtotal = Money::from_cents(1);

        let cart = Cart::from_items(vec![item.clone()]).unwrap();
        assert_eq!(cart.items()[0].line_subtotal.cents(), 1000);

        let duplicate = Cart::from_items(vec![item.clone(), item.clone()]);
        assert!(matches!(
            duplicate,
            Err(CoreError::Validation(ValidationError::Duplicate { .. }))
        ));

        let mut zero_qty = item;
        zero_qty.quantity = 0;
        assert!(Cart::from_items(vec![zero_qty]).is_err());
    }

    #[test]
    fn test_discounts_take_the_larger_source() {
        let mut discounts = Discounts::default();
        assert!(discounts.effective().is_zero());

        discounts.customer = DiscountRate::from_bps(1000);
        assert_eq!(discounts.effective().bps(), 1000);

        discounts.manual = Some(DiscountRate::from_bps(1500));
        assert_eq!(discounts.effective().bps(), 1500);

        discounts.manual = Some(DiscountRate::from_bps(500));
        assert_eq!(discounts.effective().bps(), 1000);
    }

    #[test]
    fn test_sale_payload() {
        let mut cart = Cart::new();
        cart.add_item(&test_product(1, 10000, 10), 2).unwrap();
        let customer = Customer::new(7, "Ana", DiscountRate::from_bps(1000));

        let payload = cart.sale_payload(Some(&customer), "3", DiscountRate::from_bps(1000));
        assert_eq!(payload.customer_id, Some(7));
        assert_eq!(payload.store_id, "3");
        assert_eq!(payload.total.cents(), 18000);
        assert_eq!(payload.items.len(), 1);
        assert_eq!(payload.items[0].line_subtotal.cents(), 20000);

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["customerId"], 7);
        assert_eq!(json["discountPercent"], "10.00");
        assert_eq!(json["total"], "180.00");
        assert_eq!(json["items"][0]["unitPrice"], "100.00");
    }
}
