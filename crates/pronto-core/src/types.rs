//! # Domain Types
//!
//! Core domain types used throughout Pronto POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │    LineItem     │   │    Customer     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (catalog)   │──►│  product_id     │   │  id             │       │
//! │  │  code (barcode) │   │  unit_price     │   │  name           │       │
//! │  │  unit_price     │   │  quantity       │   │  discount       │       │
//! │  │  stock          │   │  line_subtotal  │   └─────────────────┘       │
//! │  └─────────────────┘   └─────────────────┘                              │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  DiscountRate   │   │  SalePayload    │   │    OrderId      │       │
//! │  │  bps (u32)      │   │  POST /sales    │   │  server-issued  │       │
//! │  │  1000 = 10%     │   │  body           │   │  identifier     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Backend Field Names
//! The catalog and customer endpoints are served by a Spanish-language
//! backend. Incoming shapes accept those names as aliases (`nombre`,
//! `codigo`, `precio_venta`, `descuento`, ...) next to the camelCase ones.

use chrono::{DateTime, Utc};
use serde::de::{self, Unexpected, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::{parse_hundredths, Money};
use crate::validation::ValidationResult;

/// Catalog product identifier.
pub type ProductId = i64;

/// Customer identifier.
pub type CustomerId = i64;

// =============================================================================
// Discount Rate
// =============================================================================

/// Discount percentage represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01%. Customer discounts such as 12.5% stay exact
/// (1250 bps) and never pass through a float during total computation.
///
/// Serialized as a two-decimal percentage string (`"12.50"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DiscountRate(u32);

impl DiscountRate {
    /// 100% in basis points.
    pub const MAX_BPS: u32 = 10_000;

    /// Creates a rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        DiscountRate(bps)
    }

    /// Creates a rate from a percentage entered by a cashier.
    ///
    /// ## Rules
    /// - Must be a finite number between 0 and 100 inclusive
    ///
    /// ```rust
    /// use pronto_core::types::DiscountRate;
    ///
    /// assert_eq!(DiscountRate::from_percent(12.5).unwrap().bps(), 1250);
    /// assert!(DiscountRate::from_percent(101.0).is_err());
    /// assert!(DiscountRate::from_percent(-1.0).is_err());
    /// ```
    pub fn from_percent(percent: f64) -> CoreResult<Self> {
        if !percent.is_finite() || !(0.0..=100.0).contains(&percent) {
            return Err(CoreError::InvalidDiscount {
                value: percent.to_string(),
            });
        }
        Ok(DiscountRate((percent * 100.0).round() as u32))
    }

    /// Parses a percentage string such as `"10"` or `"12.50"`.
    pub fn parse(text: &str) -> CoreResult<Self> {
        let invalid = || CoreError::InvalidDiscount {
            value: text.trim().to_string(),
        };
        let bps = parse_hundredths(text).ok_or_else(invalid)?;
        u32::try_from(bps)
            .ok()
            .filter(|bps| *bps <= Self::MAX_BPS)
            .map(DiscountRate)
            .ok_or_else(invalid)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero discount.
    #[inline]
    pub const fn zero() -> Self {
        DiscountRate(0)
    }

    /// Checks if the rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    fn to_percent_string(self) -> String {
        format!("{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl fmt::Display for DiscountRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.to_percent_string())
    }
}

impl Serialize for DiscountRate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.to_percent_string())
    }
}

impl<'de> Deserialize<'de> for DiscountRate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(DiscountRateVisitor)
    }
}

struct DiscountRateVisitor;

impl<'de> Visitor<'de> for DiscountRateVisitor {
    type Value = DiscountRate;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a percentage between 0 and 100")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<DiscountRate, E> {
        DiscountRate::parse(value).map_err(|_| E::invalid_value(Unexpected::Str(value), &self))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<DiscountRate, E> {
        if (0..=100).contains(&value) {
            Ok(DiscountRate(value as u32 * 100))
        } else {
            Err(E::invalid_value(Unexpected::Signed(value), &self))
        }
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<DiscountRate, E> {
        if value <= 100 {
            Ok(DiscountRate(value as u32 * 100))
        } else {
            Err(E::invalid_value(Unexpected::Unsigned(value), &self))
        }
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<DiscountRate, E> {
        DiscountRate::from_percent(value).map_err(|_| E::invalid_value(Unexpected::Float(value), &self))
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product as returned by the catalog service.
///
/// `stock` is optional: category listings carry it, barcode lookups may not,
/// in which case the per-store inventory endpoint fills it in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    /// Catalog identifier.
    pub id: ProductId,

    /// Product code / barcode.
    #[serde(alias = "codigo")]
    pub code: String,

    /// Display name shown to cashier and on receipt.
    #[serde(alias = "nombre")]
    pub name: String,

    /// Selling price.
    #[serde(alias = "precio_venta", alias = "precio", alias = "price")]
    #[ts(type = "string")]
    pub unit_price: Money,

    /// Units available in the current store, if known.
    #[serde(default)]
    pub stock: Option<i64>,

    #[serde(default)]
    #[serde(alias = "marca")]
    pub brand: Option<String>,

    #[serde(default)]
    pub color: Option<String>,

    #[serde(default)]
    #[serde(alias = "categoria")]
    pub category_id: Option<i64>,
}

impl Product {
    /// Stock available for sale; unknown stock counts as none.
    #[inline]
    pub fn available_stock(&self) -> i64 {
        self.stock.unwrap_or(0)
    }

    /// Returns a copy with the stock level replaced.
    pub fn with_stock(mut self, stock: i64) -> Self {
        self.stock = Some(stock);
        self
    }
}

/// A product category with its product count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: i64,

    #[serde(alias = "nombre")]
    pub name: String,

    #[serde(default)]
    #[serde(alias = "producto_count")]
    pub product_count: u32,
}

/// One inventory row for a product in a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    #[serde(alias = "cantidad")]
    pub quantity: i64,
}

// =============================================================================
// Line Item
// =============================================================================

/// One product entry in the cart.
///
/// ## Invariants
/// - `quantity >= 1`
/// - `line_subtotal == unit_price × quantity` after every mutation. The field
///   is written to storage for readability but never read back: restoring a
///   cart always recomputes it.
/// - `stock` is the stock known when the product was (last) added; it bounds
///   `update_quantity`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LineItem {
    pub product_id: ProductId,

    pub code: String,

    pub name: String,

    /// Price frozen at the time the product was added.
    #[ts(type = "string")]
    pub unit_price: Money,

    pub quantity: i64,

    pub stock: i64,

    #[serde(skip_deserializing)]
    #[ts(type = "string")]
    pub line_subtotal: Money,

    #[serde(default = "Utc::now")]
    #[ts(as = "String")]
    pub added_at: DateTime<Utc>,
}

impl LineItem {
    /// Creates a line item from a product and quantity.
    ///
    /// Fails when `unit_price × quantity` does not fit in [`Money`].
    pub fn from_product(product: &Product, quantity: i64) -> ValidationResult<Self> {
        let mut item = LineItem {
            product_id: product.id,
            code: product.code.clone(),
            name: product.name.clone(),
            unit_price: product.unit_price,
            quantity,
            stock: product.available_stock(),
            line_subtotal: Money::zero(),
            added_at: Utc::now(),
        };
        item.recompute()?;
        Ok(item)
    }

    /// Sets the quantity and recomputes the line subtotal.
    ///
    /// On overflow the line is left unchanged.
    pub fn set_quantity(&mut self, quantity: i64) -> ValidationResult<()> {
        self.line_subtotal = self.subtotal_for(quantity)?;
        self.quantity = quantity;
        Ok(())
    }

    /// Recomputes `line_subtotal` from price and quantity.
    #[inline]
    pub fn recompute(&mut self) -> ValidationResult<()> {
        self.set_quantity(self.quantity)
    }

    /// Line subtotal this item would have at `quantity`.
    pub fn subtotal_for(&self, quantity: i64) -> ValidationResult<Money> {
        self.unit_price
            .checked_multiply_quantity(quantity)
            .ok_or_else(|| ValidationError::TooLarge {
                field: "lineSubtotal".to_string(),
            })
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A customer selected for the current sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Customer {
    pub id: CustomerId,

    #[serde(alias = "nombre")]
    pub name: String,

    /// Customer-level discount; zero means none.
    #[serde(default)]
    #[serde(rename = "discountPercent")]
    #[serde(alias = "descuento", alias = "discount")]
    #[ts(type = "string")]
    pub discount: DiscountRate,
}

impl Customer {
    pub fn new(id: CustomerId, name: impl Into<String>, discount: DiscountRate) -> Self {
        Customer {
            id,
            name: name.into(),
            discount,
        }
    }
}

// =============================================================================
// Sale Payload
// =============================================================================

/// Body of the sale submission.
///
/// ```json
/// {
///   "customerId": 7, "storeId": "3", "discountPercent": "10.00",
///   "total": "180.00",
///   "items": [{ "productId": 1, "quantity": 2, "unitPrice": "100.00", "lineSubtotal": "200.00" }]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalePayload {
    pub customer_id: Option<CustomerId>,
    pub store_id: String,
    pub discount_percent: DiscountRate,
    pub total: Money,
    pub items: Vec<SaleLine>,
}

/// One line of a sale submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleLine {
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_subtotal: Money,
}

impl From<&LineItem> for SaleLine {
    fn from(item: &LineItem) -> Self {
        SaleLine {
            product_id: item.product_id,
            quantity: item.quantity,
            unit_price: item.unit_price,
            line_subtotal: item.line_subtotal,
        }
    }
}

// =============================================================================
// Order Id
// =============================================================================

/// Server-issued order identifier.
///
/// The backend returns numeric primary keys today; strings are accepted too
/// so a change of key type does not break checkout.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Self {
        OrderId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for OrderId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Number(i64),
            Text(String),
        }

        match RawId::deserialize(deserializer)? {
            RawId::Number(n) => Ok(OrderId(n.to_string())),
            RawId::Text(s) if !s.trim().is_empty() => Ok(OrderId(s)),
            RawId::Text(_) => Err(de::Error::custom("order id is empty")),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discount_rate_from_percent() {
        assert_eq!(DiscountRate::from_percent(0.0).unwrap().bps(), 0);
        assert_eq!(DiscountRate::from_percent(10.0).unwrap().bps(), 1000);
        assert_eq!(DiscountRate::from_percent(100.0).unwrap().bps(), 10000);
        assert!(DiscountRate::from_percent(100.01).is_err());
        assert!(DiscountRate::from_percent(f64::NAN).is_err());
    }

    #[test]
    fn test_discount_rate_parse() {
        assert_eq!(DiscountRate::parse("15").unwrap().bps(), 1500);
        assert_eq!(DiscountRate::parse("7.5").unwrap().bps(), 750);
        assert!(DiscountRate::parse("150").is_err());
        assert!(DiscountRate::parse("-5").is_err());
        assert!(DiscountRate::parse("ten").is_err());
    }

    #[test]
    fn test_discount_rate_serde() {
        let rate = DiscountRate::from_bps(1250);
        assert_eq!(serde_json::to_string(&rate).unwrap(), "\"12.50\"");
        assert_eq!(rate.to_string(), "12.50%");

        let from_number: DiscountRate = serde_json::from_str("10").unwrap();
        let from_float: DiscountRate = serde_json::from_str("12.5").unwrap();
        let from_text: DiscountRate = serde_json::from_str("\"12.50\"").unwrap();
        assert_eq!(from_number.bps(), 1000);
        assert_eq!(from_float.bps(), 1250);
        assert_eq!(from_text.bps(), 1250);

        assert!(serde_json::from_str::<DiscountRate>("120").is_err());
    }

    #[test]
    fn test_product_accepts_backend_field_names() {
        let json = r#"{
            "id": 12,
            "codigo": "ZAP-001",
            "nombre": "Zapato casual",
            "precio_venta": "899.90",
            "marca": "Pronto",
            "color": "negro"
        }"#;
        let product: Product = serde_json::from_str(json).unwrap();

        assert_eq!(product.code, "ZAP-001");
        assert_eq!(product.unit_price.cents(), 89990);
        assert_eq!(product.stock, None);
        assert_eq!(product.available_stock(), 0);
        assert_eq!(product.brand.as_deref(), Some("Pronto"));
    }

    #[test]
    fn test_customer_accepts_backend_field_names() {
        let json = r#"{ "id": 3, "nombre": "Ana", "descuento": 10 }"#;
        let customer: Customer = serde_json::from_str(json).unwrap();
        assert_eq!(customer.name, "Ana");
        assert_eq!(customer.discount.bps(), 1000);

        let json = r#"{ "id": 4, "name": "Luis" }"#;
        let customer: Customer = serde_json::from_str(json).unwrap();
        assert!(customer.discount.is_zero());
    }

    #[test]
    fn test_line_item_ignores_stored_subtotal() {
        let json = r#"{
            "productId": 1, "code": "A", "name": "Item A",
            "unitPrice": "100.00", "quantity": 2, "stock": 5,
            "lineSubtotal": "999.99"
        }"#;
        let mut item: LineItem = serde_json::from_str(json).unwrap();
        assert!(item.line_subtotal.is_zero());

        item.recompute().unwrap();
        assert_eq!(item.line_subtotal.cents(), 20000);
    }

    #[test]
    fn test_line_item_rejects_overflowing_quantity() {
        let json = r#"{
            "productId": 1, "code": "A", "name": "Item A",
            "unitPrice": "899.90", "quantity": 2, "stock": 5
        }"#;
        let mut item: LineItem = serde_json::from_str(json).unwrap();
        item.recompute().unwrap();

        assert!(matches!(
            item.set_quantity(200_000_000_000_000),
            Err(ValidationError::TooLarge { .. })
        ));
        assert_eq!(item.quantity, 2);
        assert_eq!(item.line_subtotal.cents(), 179980);
    }

    #[test]
    fn test_order_id_from_number_or_string() {
        let numeric: OrderId = serde_json::from_str("42").unwrap();
        let text: OrderId = serde_json::from_str("\"PED-0042\"").unwrap();
        assert_eq!(numeric.as_str(), "42");
        assert_eq!(text.to_string(), "PED-0042");
        assert!(serde_json::from_str::<OrderId>("\"\"").is_err());
    }
}
