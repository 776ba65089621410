// src/store/mod.rs

//! The data store collaborator: typed table operations over products,
//! cart_items, orders, order_items and users.
//!
//! The contract deliberately exposes stock reservation as a single atomic
//! primitive (`reserve_stock`) instead of a read-then-write pair: the
//! store is the only shared coordination point between concurrent
//! checkouts, so "decrement only if sufficient" has to happen there.

pub mod memory;
pub mod pg;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::errors::StoreError;
use crate::models::{CartLine, CartLineView, Order, OrderLine, Product, UserProfile};

pub use memory::MemoryStore;
pub use pg::PgStore;

/// Live stock snapshot for one product, keyed by product id in the maps
/// returned from [`DataStore::stock_levels`].
#[derive(Debug, Clone, Serialize)]
pub struct StockLevel {
  pub stock: i64,
  pub name: String,
}

/// Outcome of an atomic decrement-if-sufficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveOutcome {
  Reserved,
  Insufficient { available: i64 },
}

/// Outcome of an order-header insert carrying an idempotency key.
#[derive(Debug, Clone)]
pub enum InsertedOrder {
  Created(Order),
  /// An order with the same client key already exists; the insert
  /// collapsed onto it.
  Existing(Order),
}

/// A new order header, before the store assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct NewOrder {
  pub user_id: Uuid,
  pub customer_name: String,
  pub customer_email: String,
  pub customer_phone: String,
  pub total_amount_cents: i64,
  pub payment_method: String,
  pub channel: String,
  pub client_key: Uuid,
}

#[derive(Debug, Clone)]
pub struct NewOrderLine {
  pub order_id: Uuid,
  pub product_id: Uuid,
  pub quantity: i64,
  pub price_at_purchase_cents: i64,
}

#[async_trait]
pub trait DataStore: Send + Sync {
  // --- products ---
  async fn list_products(&self) -> Result<Vec<Product>, StoreError>;
  async fn find_product(&self, id: Uuid) -> Result<Option<Product>, StoreError>;
  /// Authoritative stock for exactly the given product ids.
  async fn stock_levels(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, StockLevel>, StoreError>;
  /// Atomic decrement-if-sufficient. Never drives stock negative.
  async fn reserve_stock(&self, product_id: Uuid, quantity: i64) -> Result<ReserveOutcome, StoreError>;
  /// Compensation for a reservation made by a checkout that later rolled back.
  async fn release_stock(&self, product_id: Uuid, quantity: i64) -> Result<(), StoreError>;

  // --- cart_items ---
  async fn cart_lines_for_user(&self, user_id: Uuid) -> Result<Vec<CartLineView>, StoreError>;
  async fn find_cart_line(&self, id: Uuid) -> Result<Option<CartLine>, StoreError>;
  /// Insert, or accumulate quantity into the existing (user, product) row.
  async fn upsert_cart_line(&self, user_id: Uuid, product_id: Uuid, quantity: i64) -> Result<CartLine, StoreError>;
  async fn update_cart_quantity(&self, id: Uuid, quantity: i64) -> Result<(), StoreError>;
  async fn delete_cart_line(&self, id: Uuid) -> Result<(), StoreError>;
  async fn clear_cart(&self, user_id: Uuid) -> Result<u64, StoreError>;

  // --- orders / order_items ---
  /// Looks up the order a previous attempt with this idempotency key may
  /// have created.
  async fn find_order_by_key(&self, client_key: Uuid) -> Result<Option<Order>, StoreError>;
  async fn insert_order(&self, order: NewOrder) -> Result<InsertedOrder, StoreError>;
  async fn insert_order_lines(&self, lines: &[NewOrderLine]) -> Result<Vec<OrderLine>, StoreError>;
  async fn order_lines_for(&self, order_id: Uuid) -> Result<Vec<OrderLine>, StoreError>;
  /// Removes an order header and its lines. Used to compensate orphaned
  /// or rolled-back checkouts.
  async fn delete_order(&self, order_id: Uuid) -> Result<(), StoreError>;

  // --- users ---
  async fn find_user_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, StoreError>;
}
