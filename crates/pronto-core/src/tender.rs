//! # Tender
//!
//! Cash handed over at the register and the change owed back.

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::validation::validate_tendered;

/// Computes the change for a cash payment.
///
/// ## Rules
/// - `tendered` must be positive
/// - `tendered` must cover `total`, else `InsufficientPayment`
///
/// ```rust
/// use pronto_core::tender::change_due;
/// use pronto_core::Money;
///
/// let change = change_due(Money::from_cents(18000), Money::from_cents(20000)).unwrap();
/// assert_eq!(change.cents(), 2000);
/// ```
pub fn change_due(total: Money, tendered: Money) -> CoreResult<Money> {
    validate_tendered(tendered)?;

    if tendered < total {
        return Err(CoreError::InsufficientPayment { total, tendered });
    }

    Ok(tendered - total)
}
