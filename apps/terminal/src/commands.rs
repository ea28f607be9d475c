//! # Register Commands
//!
//! Parses one typed line into a [`Command`].
//!
//! ```text
//! scan 7501234567890     add one unit by barcode
//! add 10 3               add 3 units of product 10 from the last listing
//! qty 10 0               same as rm 10
//! customer 7             select customer 7
//! discount 12.5          manual discount override
//! pay 200                check out with $200.00 tendered
//! ```

use pronto_core::filter::{ProductFilter, StockFilter};
use pronto_core::{CustomerId, Money, ProductId};
use thiserror::Error;

/// A parsed register command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Categories,
    Category(i64),
    Search(String),
    Filter(ProductFilter),
    Facets,
    Scan(String),
    Add { product_id: ProductId, quantity: i64 },
    Quantity { product_id: ProductId, quantity: i64 },
    Remove(ProductId),
    Clear,
    Customer(Option<CustomerId>),
    Discount(Option<String>),
    Show,
    Pay(Option<Money>),
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Unknown command '{0}'. Type 'help' for the list")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("'{value}' is not a valid {what}")]
    Invalid { what: &'static str, value: String },
}

pub const HELP: &str = "\
Commands:
  cats                         list categories
  cat <id>                     list products in a category
  search <text>                search products (2+ characters)
  filter [brand=..] [color=..] [stock=available|low|sold_out] [min=..] [max=..]
                               filter the last listing
  facets                       brands and colors in the last listing
  scan <code>                  add one unit by barcode
  add <product id> [qty]       add a product from the last listing
  qty <product id> <qty>       set quantity (0 removes)
  rm <product id>              remove a line
  clear                        empty the cart
  customer <id>|none           select or clear the customer
  discount <percent>|off       manual discount override
  show                         show the cart
  pay [amount]                 complete the sale
  quit                         exit";

impl Command {
    /// Parses a line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Command>, ParseError> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = words.collect();

        let command = match (verb.to_lowercase().as_str(), args.as_slice()) {
            ("help" | "?", _) => Command::Help,
            ("cats", []) => Command::Categories,
            ("cat", [id]) => Command::Category(number(id, "category id")?),
            ("cat", _) => return Err(ParseError::Usage("cat <id>")),
            ("search", []) => Command::Search(String::new()),
            ("search", words) => Command::Search(words.join(" ")),
            ("facets", []) => Command::Facets,
            ("filter", pairs) => Command::Filter(parse_filter(pairs)?),
            ("scan", [code]) => Command::Scan(code.to_string()),
            ("scan", _) => return Err(ParseError::Usage("scan <code>")),
            ("add", [id]) => Command::Add {
                product_id: number(id, "product id")?,
                quantity: 1,
            },
            ("add", [id, qty]) => Command::Add {
                product_id: number(id, "product id")?,
                quantity: number(qty, "quantity")?,
            },
            ("add", _) => return Err(ParseError::Usage("add <product id> [qty]")),
            ("qty", [id, qty]) => Command::Quantity {
                product_id: number(id, "product id")?,
                quantity: number(qty, "quantity")?,
            },
            ("qty", _) => return Err(ParseError::Usage("qty <product id> <qty>")),
            ("rm", [id]) => Command::Remove(number(id, "product id")?),
            ("rm", _) => return Err(ParseError::Usage("rm <product id>")),
            ("clear", []) => Command::Clear,
            ("customer", ["none"]) => Command::Customer(None),
            ("customer", [id]) => Command::Customer(Some(number(id, "customer id")?)),
            ("customer", _) => return Err(ParseError::Usage("customer <id>|none")),
            ("discount", ["off"]) => Command::Discount(None),
            ("discount", [percent]) => Command::Discount(Some(percent.to_string())),
            ("discount", _) => return Err(ParseError::Usage("discount <percent>|off")),
            ("show", []) => Command::Show,
            ("pay", []) => Command::Pay(None),
            ("pay", [amount]) => Command::Pay(Some(money(amount)?)),
            ("pay", _) => return Err(ParseError::Usage("pay [amount]")),
            ("quit" | "exit", _) => Command::Quit,
            (other, _) => return Err(ParseError::Unknown(other.to_string())),
        };

        Ok(Some(command))
    }
}

fn number(value: &str, what: &'static str) -> Result<i64, ParseError> {
    value.parse().map_err(|_| ParseError::Invalid {
        what,
        value: value.to_string(),
    })
}

fn money(value: &str) -> Result<Money, ParseError> {
    Money::parse(value).ok_or_else(|| ParseError::Invalid {
        what: "amount",
        value: value.to_string(),
    })
}

fn parse_filter(pairs: &[&str]) -> Result<ProductFilter, ParseError> {
    let mut filter = ProductFilter::new();

    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            return Err(ParseError::Usage("filter key=value ..."));
        };

        filter = match key {
            "brand" => filter.brand(value),
            "color" => filter.color(value),
            "stock" => filter.stock(value.parse::<StockFilter>().map_err(|_| {
                ParseError::Invalid {
                    what: "stock filter",
                    value: value.to_string(),
                }
            })?),
            "min" => filter.min_price(money(value)?),
            "max" => filter.max_price(money(value)?),
            _ => {
                return Err(ParseError::Invalid {
                    what: "filter key",
                    value: key.to_string(),
                })
            }
        };
    }

    Ok(filter)
}
