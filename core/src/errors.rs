// src/errors.rs
use std::time::Duration;

use anyhow::Error as AnyhowError;
use thiserror::Error;
use uuid::Uuid;

use crate::checkout::StockIssue;

/// Failures coming back from the data store collaborator.
///
/// Timeouts are classified at the call site: a timed-out read is a
/// retryable transient, a timed-out write leaves ambiguous state and is
/// surfaced to the caller rather than silently retried.
#[derive(Debug, Error)]
pub enum StoreError {
  #[error("database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("data store call '{op}' timed out after {timeout:?}")]
  Timeout { op: &'static str, timeout: Duration },

  #[error("data store call '{op}' failed: {source}")]
  Backend {
    op: &'static str,
    #[source]
    source: AnyhowError,
  },
}

impl StoreError {
  pub fn backend(op: &'static str, source: impl Into<AnyhowError>) -> Self {
    StoreError::Backend {
      op,
      source: source.into(),
    }
  }

  /// True when retrying the same call is safe (no write may have landed).
  pub fn is_transient(&self) -> bool {
    matches!(self, StoreError::Timeout { op, .. } if op.ends_with(".read"))
  }
}

/// Errors from the cart read/edit path.
#[derive(Debug, Error)]
pub enum CartError {
  #[error("cart line {0} not found")]
  LineNotFound(Uuid),

  #[error("product {0} not found")]
  ProductNotFound(Uuid),

  #[error("quantity must be a positive number, got {0}")]
  InvalidQuantity(i64),

  #[error("only {available} units of \"{name}\" available in stock")]
  InsufficientStock {
    product_id: Uuid,
    name: String,
    available: i64,
    requested: i64,
  },

  #[error("could not check availability for product {0}")]
  StockUnavailable(Uuid),

  #[error(transparent)]
  Store(#[from] StoreError),
}

/// Checkout failure taxonomy. Only `NotAuthenticated`, `InsufficientStock`
/// and the terminal creation failures carry actionable messages for the end
/// user; per-product decrement and cart-clear failures degrade silently and
/// are logged instead.
#[derive(Debug, Error)]
pub enum CheckoutError {
  #[error("not signed in")]
  NotAuthenticated,

  #[error("cart is empty")]
  EmptyCart,

  #[error("insufficient stock for {} cart line(s)", .0.len())]
  InsufficientStock(Vec<StockIssue>),

  #[error("customer name rejected: {reason}")]
  InvalidCustomerName { reason: String },

  #[error("failed to create order")]
  OrderCreationFailed(#[source] StoreError),

  #[error("failed to attach line items to order {order_id} (orphan removed: {compensated})")]
  OrderLinesFailed {
    order_id: Uuid,
    compensated: bool,
    #[source]
    source: StoreError,
  },

  #[error(transparent)]
  Store(#[from] StoreError),
}
