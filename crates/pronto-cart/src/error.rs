//! # Cart Errors and Notices
//!
//! Everything the presentation layer is told about a cart operation.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Register                           │
//! │                                                                         │
//! │  CoreError ──────┐                                                      │
//! │  ClientError ────┼──► CartError ──► Notice { code, severity, message } │
//! │  StoreError ─────┘        │                        │                    │
//! │                           ▼                        ▼                    │
//! │                  caller decides          UI shows info / warning /     │
//! │                  (retry, re-enter)       error toast                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! No variant is fatal: after any error the manager is in a usable state and
//! the cart is as it was before the failing call.

use pronto_client::ClientError;
use pronto_core::{CoreError, CustomerId, Money, ValidationError};
use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;

/// Cart operation failures.
///
/// `Clone` so one checkout outcome can be handed to every caller that awaited
/// the same submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("Insufficient stock for {code}: available {available}, requested {requested}")]
    InsufficientStock {
        code: String,
        available: i64,
        requested: i64,
    },

    #[error("Quantity {requested} for {code} exceeds available stock ({available})")]
    StockExceeded {
        code: String,
        available: i64,
        requested: i64,
    },

    #[error("Invalid discount '{value}': must be between 0 and 100")]
    InvalidDiscount { value: String },

    #[error("The cart is empty")]
    EmptyCart,

    #[error("A customer must be selected")]
    MissingCustomer,

    #[error("Payment of {tendered} does not cover total {total}")]
    InsufficientPayment { total: Money, tendered: Money },

    /// Stored state under `key` was unreadable; an empty default was used.
    #[error("Stored data under '{key}' was unreadable: {reason}")]
    PersistenceRead { key: String, reason: String },

    /// The order service failed; the cart is untouched and can be resubmitted.
    #[error("Sale submission failed: {0}")]
    Submission(ClientError),

    /// The submission task stopped before the backend answered; whether the
    /// order was recorded is unknown.
    #[error("Sale submission was interrupted: {reason}")]
    CheckoutInterrupted { reason: String },

    #[error("Could not load customer {id}: {source}")]
    CustomerLookup { id: CustomerId, source: ClientError },

    #[error("Catalog request failed: {0}")]
    Catalog(ClientError),

    #[error("No product found with code {code}")]
    ProductNotFound { code: String },

    /// An optional collaborator was not supplied to the manager.
    #[error("{service} is not configured")]
    NotConfigured { service: &'static str },

    #[error("Validation error: {0}")]
    Validation(ValidationError),
}

/// Result type alias for cart operations.
pub type CartResult<T> = Result<T, CartError>;

impl From<CoreError> for CartError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InsufficientStock {
                code,
                available,
                requested,
            } => CartError::InsufficientStock {
                code,
                available,
                requested,
            },
            CoreError::StockExceeded {
                code,
                available,
                requested,
            } => CartError::StockExceeded {
                code,
                available,
                requested,
            },
            CoreError::InvalidDiscount { value } => CartError::InvalidDiscount { value },
            CoreError::EmptyCart => CartError::EmptyCart,
            CoreError::MissingCustomer => CartError::MissingCustomer,
            CoreError::InsufficientPayment { total, tendered } => {
                CartError::InsufficientPayment { total, tendered }
            }
            CoreError::Validation(e) => CartError::Validation(e),
        }
    }
}

impl From<ValidationError> for CartError {
    fn from(err: ValidationError) -> Self {
        CartError::Validation(err)
    }
}

impl CartError {
    /// Machine-readable code for the presentation layer.
    pub fn code(&self) -> NoticeCode {
        match self {
            CartError::InsufficientStock { .. } => NoticeCode::InsufficientStock,
            CartError::StockExceeded { .. } => NoticeCode::StockExceeded,
            CartError::InvalidDiscount { .. } => NoticeCode::InvalidDiscount,
            CartError::EmptyCart => NoticeCode::EmptyCart,
            CartError::MissingCustomer => NoticeCode::MissingCustomer,
            CartError::InsufficientPayment { .. } => NoticeCode::InsufficientPayment,
            CartError::PersistenceRead { .. } => NoticeCode::PersistenceRead,
            CartError::Submission(_) | CartError::CheckoutInterrupted { .. } => {
                NoticeCode::SubmissionFailed
            }
            CartError::CustomerLookup { .. } => NoticeCode::CustomerLookupFailed,
            CartError::Catalog(_) => NoticeCode::CatalogUnavailable,
            CartError::ProductNotFound { .. } => NoticeCode::ProductNotFound,
            CartError::NotConfigured { .. } => NoticeCode::NotConfigured,
            CartError::Validation(_) => NoticeCode::ValidationError,
        }
    }

    /// How loudly the presentation layer should report the error.
    ///
    /// Rule violations the cashier can fix on the spot are warnings; failures
    /// of the backend or of the register setup are errors.
    pub fn severity(&self) -> Severity {
        match self {
            CartError::Submission(_)
            | CartError::CheckoutInterrupted { .. }
            | CartError::CustomerLookup { .. }
            | CartError::Catalog(_)
            | CartError::NotConfigured { .. } => Severity::Error,
            _ => Severity::Warning,
        }
    }

    /// Returns true if repeating the call unchanged may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            CartError::Submission(e) | CartError::Catalog(e) => e.is_retryable(),
            CartError::CustomerLookup { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    pub fn to_notice(&self) -> Notice {
        Notice {
            code: self.code(),
            severity: self.severity(),
            message: self.to_string(),
        }
    }
}

// =============================================================================
// Notices
// =============================================================================

/// Notice severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Notice codes.
///
/// ## Usage in Frontend
/// ```typescript
/// switch (notice.code) {
///   case 'INSUFFICIENT_STOCK':
///     highlightStock(notice.message);
///     break;
///   case 'SUBMISSION_FAILED':
///     enableRetry();
///     break;
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum NoticeCode {
    InsufficientStock,
    StockExceeded,
    InvalidDiscount,
    EmptyCart,
    MissingCustomer,
    InsufficientPayment,
    PersistenceRead,
    SubmissionFailed,
    CustomerLookupFailed,
    CatalogUnavailable,
    ProductNotFound,
    NotConfigured,
    ValidationError,

    // Success notices
    ItemAdded,
    CartRestored,
    SaleCompleted,
}

/// A user-visible message.
///
/// ```json
/// { "code": "STOCK_EXCEEDED", "severity": "warning",
///   "message": "Quantity 6 for ZAP-001 exceeds available stock (5)" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Notice {
    pub code: NoticeCode,
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    pub fn info(code: NoticeCode, message: impl Into<String>) -> Self {
        Notice {
            code,
            severity: Severity::Info,
            message: message.into(),
        }
    }
}

impl From<&CartError> for Notice {
    fn from(err: &CartError) -> Self {
        err.to_notice()
    }
}

impl From<CartError> for Notice {
    fn from(err: CartError) -> Self {
        err.to_notice()
    }
}
