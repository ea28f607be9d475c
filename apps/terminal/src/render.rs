//! Text rendering for the register screen.

use std::fmt::Write;

use pronto_cart::{CartSnapshot, CheckoutReceipt, Notice, Severity};
use pronto_core::filter::Facets;
use pronto_core::{Category, Money, Product, LOW_STOCK_THRESHOLD};

/// Formats a money amount with the given currency symbol.
pub fn format_currency(symbol: &str, amount: Money) -> String {
    let cents = amount.cents();
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    format!("{}{}{}.{:02}", sign, symbol, cents / 100, cents % 100)
}

pub fn notice(notice: &Notice) -> String {
    let tag = match notice.severity {
        Severity::Info => "ok",
        Severity::Warning => "!!",
        Severity::Error => "ERROR",
    };
    format!("[{}] {}", tag, notice.message)
}

pub fn cart(symbol: &str, snapshot: &CartSnapshot) -> String {
    let mut out = String::new();

    if snapshot.items.is_empty() {
        out.push_str("  (cart is empty)\n");
    }

    for item in &snapshot.items {
        let _ = writeln!(
            out,
            "  {:>6}  {:<28} {:>3} x {:>10} = {:>11}",
            item.product_id,
            truncate(&item.name, 28),
            item.quantity,
            format_currency(symbol, item.unit_price),
            format_currency(symbol, item.line_subtotal),
        );
    }

    let totals = &snapshot.totals;
    let customer = match &snapshot.customer {
        Some(c) => format!("{} (#{}, {}%)", c.name, c.id, c.discount.percentage()),
        None => "none".to_string(),
    };
    let _ = writeln!(out, "  customer: {}", customer);
    if let Some(manual) = snapshot.manual_discount {
        let _ = writeln!(out, "  manual discount: {}%", manual.percentage());
    }
    let _ = writeln!(
        out,
        "  {} lines, {} units",
        totals.item_count, totals.total_quantity
    );
    let _ = writeln!(out, "  subtotal  {:>12}", format_currency(symbol, totals.subtotal));
    if !totals.discount_rate.is_zero() {
        let _ = writeln!(
            out,
            "  discount  {:>12}  ({}%)",
            format_currency(symbol, Money::from_cents(-totals.discount_amount.cents())),
            totals.discount_rate.percentage()
        );
    }
    let _ = write!(out, "  TOTAL     {:>12}", format_currency(symbol, totals.total));

    out
}

pub fn products(symbol: &str, products: &[&Product]) -> String {
    if products.is_empty() {
        return "  (no products)".to_string();
    }

    products
        .iter()
        .map(|p| {
            let stock = match p.stock {
                Some(0) => "sold out".to_string(),
                Some(n) if n <= LOW_STOCK_THRESHOLD => format!("{} left (low)", n),
                Some(n) => format!("{} in stock", n),
                None => "stock unknown".to_string(),
            };
            format!(
                "  {:>6}  {:<14} {:<28} {:>10}  {}",
                p.id,
                p.code,
                truncate(&p.name, 28),
                format_currency(symbol, p.unit_price),
                stock
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn categories(categories: &[Category]) -> String {
    if categories.is_empty() {
        return "  (no categories)".to_string();
    }

    categories
        .iter()
        .map(|c| format!("  {:>4}  {} ({})", c.id, c.name, c.product_count))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn facets(facets: &Facets) -> String {
    format!(
        "  brands: {}\n  colors: {}",
        facets.brands.join(", "),
        facets.colors.join(", ")
    )
}

pub fn receipt(symbol: &str, receipt: &CheckoutReceipt) -> String {
    let mut out = format!(
        "Sale {} completed. Total {}",
        receipt.order_id,
        format_currency(symbol, receipt.totals.total)
    );
    if let (Some(tendered), Some(change)) = (receipt.tendered, receipt.change) {
        let _ = write!(
            out,
            ", paid {}, change {}",
            format_currency(symbol, tendered),
            format_currency(symbol, change)
        );
    }
    out
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
        cut.push('…');
        cut
    }
}
