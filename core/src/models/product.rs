// src/models/product.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// The stock-relevant projection of a catalog product. `stock` is the
/// authoritative available-unit counter, mutated by admin tooling (out of
/// scope) and by the checkout reconciler's reservation step, never by
/// cart edits.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Product {
  pub id: Uuid,
  pub name: String,
  pub description: Option<String>,
  pub price_cents: i64,
  pub stock: i64,
  pub category_id: Option<String>,
  pub image_url: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}
