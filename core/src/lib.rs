// src/lib.rs

//! Poolside core: cart and checkout reconciliation for the storefront.
//!
//! This crate owns the two pieces of the storefront with real state
//! semantics:
//!  - The cart/stock read path: a user's cart lines joined with live
//!    product stock, which is the authoritative pre-checkout snapshot.
//!  - The checkout reconciler: validate cart against live stock, create
//!    the order header and its line items, reserve stock atomically per
//!    product, and clear the cart, with explicit compensation for
//!    partial failures and a client-side idempotency key so a retried
//!    checkout never duplicates an order.
//!
//! Everything talks to the backend through the [`store::DataStore`]
//! trait. `store::PgStore` is the Postgres implementation; `store::MemoryStore`
//! implements the same contract in memory for tests and demos.

pub mod cart;
pub mod checkout;
pub mod errors;
pub mod identity;
pub mod models;
pub mod store;

// --- Re-exports for the Public API ---

pub use crate::cart::{CartService, QuantityChange};
pub use crate::checkout::{
  CheckoutAttempt, CheckoutOutcome, CheckoutService, Receipt, StockIssue, StockReport, StockWarning,
  LOW_STOCK_THRESHOLD,
};
pub use crate::errors::{CartError, CheckoutError, StoreError};
pub use crate::identity::{CurrentUser, UserMetadata};
pub use crate::models::{
  CartLine, CartLineView, CustomerInfo, Order, OrderLine, OrderStatus, PaymentStatus, Product, UserProfile,
};
pub use crate::store::{DataStore, InsertedOrder, MemoryStore, NewOrder, NewOrderLine, PgStore, ReserveOutcome, StockLevel};
