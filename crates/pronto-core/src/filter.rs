//! # Product Filtering
//!
//! Narrows a product listing by brand, color, stock level and price range,
//! and extracts the facets (distinct brands and colors) used to build the
//! filter menus.
//!
//! ```rust
//! use pronto_core::filter::{ProductFilter, StockFilter};
//! use pronto_core::Money;
//!
//! let filter = ProductFilter::new()
//!     .brand("Pronto")
//!     .stock(StockFilter::Low)
//!     .max_price(Money::from_cents(50000));
//! assert!(!filter.is_empty());
//! ```

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::Product;
use crate::LOW_STOCK_THRESHOLD;

/// Stock level buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockFilter {
    /// Stock > 0
    Available,
    /// 1..=LOW_STOCK_THRESHOLD
    Low,
    /// Stock == 0
    SoldOut,
}

impl StockFilter {
    pub fn matches(&self, stock: i64) -> bool {
        match self {
            StockFilter::Available => stock > 0,
            StockFilter::Low => (1..=LOW_STOCK_THRESHOLD).contains(&stock),
            StockFilter::SoldOut => stock == 0,
        }
    }
}

impl FromStr for StockFilter {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "available" | "disponible" => Ok(StockFilter::Available),
            "low" | "bajo" => Ok(StockFilter::Low),
            "sold_out" | "agotado" => Ok(StockFilter::SoldOut),
            other => Err(ValidationError::InvalidFormat {
                field: "stock".to_string(),
                reason: format!("unknown stock filter '{}'", other),
            }),
        }
    }
}

/// Criteria for narrowing a product listing. Unset criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilter {
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub stock: Option<StockFilter>,
    #[serde(default)]
    pub min_price: Option<Money>,
    #[serde(default)]
    pub max_price: Option<Money>,
}

impl ProductFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn stock(mut self, stock: StockFilter) -> Self {
        self.stock = Some(stock);
        self
    }

    pub fn min_price(mut self, price: Money) -> Self {
        self.min_price = Some(price);
        self
    }

    pub fn max_price(mut self, price: Money) -> Self {
        self.max_price = Some(price);
        self
    }

    /// True when no criterion is set.
    pub fn is_empty(&self) -> bool {
        self.brand.is_none()
            && self.color.is_none()
            && self.stock.is_none()
            && self.min_price.is_none()
            && self.max_price.is_none()
    }

    /// Checks a single product against every set criterion.
    ///
    /// Brand and color compare exactly, as the values come from the facets.
    /// Price bounds are inclusive. Unknown stock counts as zero.
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(brand) = &self.brand {
            if product.brand.as_deref() != Some(brand.as_str()) {
                return false;
            }
        }

        if let Some(color) = &self.color {
            if product.color.as_deref() != Some(color.as_str()) {
                return false;
            }
        }

        if let Some(stock) = self.stock {
            if !stock.matches(product.available_stock()) {
                return false;
            }
        }

        if self.min_price.is_some_and(|min| product.unit_price < min) {
            return false;
        }

        if self.max_price.is_some_and(|max| product.unit_price > max) {
            return false;
        }

        true
    }

    /// Returns the matching products, preserving order.
    pub fn apply<'a>(&self, products: &'a [Product]) -> Vec<&'a Product> {
        products.iter().filter(|p| self.matches(p)).collect()
    }
}

/// Distinct brands and colors of a listing, in first-appearance order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facets {
    pub brands: Vec<String>,
    pub colors: Vec<String>,
}

impl Facets {
    pub fn from_products(products: &[Product]) -> Self {
        let mut facets = Facets::default();

        for product in products {
            push_distinct(&mut facets.brands, product.brand.as_deref());
            push_distinct(&mut facets.colors, product.color.as_deref());
        }

        facets
    }
}

fn push_distinct(values: &mut Vec<String>, value: Option<&str>) {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() && !values.iter().any(|existing| existing == v) => {
            values.push(v.to_string())
        }
        _ => {}
    }
}
