// src/models/cart_line.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One (user, product, quantity) reservation intent, not yet committed to
/// an order. Unique per (user_id, product_id); a second add for the same
/// product accumulates into the existing row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CartLine {
  pub id: Uuid,
  pub user_id: Uuid,
  pub product_id: Uuid,
  pub quantity: i64,
  pub added_at: DateTime<Utc>,
}

/// A cart line joined with the product fields the cart screen needs.
///
/// `stock` here is denormalized at query time; the cart service overlays
/// the freshest fetched stock snapshot on top of it, so consumers always
/// see the most recent truth the client has.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CartLineView {
  pub id: Uuid,
  pub user_id: Uuid,
  pub product_id: Uuid,
  pub quantity: i64,
  pub added_at: DateTime<Utc>,
  pub name: String,
  pub price_cents: i64,
  pub description: Option<String>,
  pub category_id: Option<String>,
  pub image_url: Option<String>,
  pub stock: i64,
}

impl CartLineView {
  /// Line subtotal in cents. Integer arithmetic, no rounding drift.
  pub fn subtotal_cents(&self) -> i64 {
    self.quantity * self.price_cents
  }
}
