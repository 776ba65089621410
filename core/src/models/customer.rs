// src/models/customer.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Profile fields stored in the users table. All optional; the checkout
/// reconciler falls back to identity-provider metadata when absent.
#[derive(Debug, Clone, Default, Serialize, FromRow)]
pub struct UserProfile {
  pub full_name: Option<String>,
  pub email: Option<String>,
  pub phone: Option<String>,
}

/// The customer details stamped onto an order header.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerInfo {
  pub name: String,
  pub email: String,
  pub phone: String,
}
