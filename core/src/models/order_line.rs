// src/models/order_line.rs

use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// An immutable order line item. `price_at_purchase_cents` is the product
/// price captured at order time, decoupled from later price changes.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderLine {
  pub id: Uuid,
  pub order_id: Uuid,
  pub product_id: Uuid,
  pub quantity: i64,
  pub price_at_purchase_cents: i64,
}
