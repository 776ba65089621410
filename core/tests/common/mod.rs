// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use poolside_core::{CurrentUser, DataStore, MemoryStore, Product, UserMetadata, UserProfile};

pub fn setup_tracing() {
  let _ = tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_test_writer()
    .try_init();
}

pub fn product(name: &str, price_cents: i64, stock: i64) -> Product {
  let now = Utc::now();
  Product {
    id: Uuid::new_v4(),
    name: name.to_string(),
    description: None,
    price_cents,
    stock,
    category_id: Some("pool-care".to_string()),
    image_url: None,
    created_at: now,
    updated_at: now,
  }
}

/// A signed-in shopper with a proper profile row in the users table.
pub fn shopper_with_profile(store: &MemoryStore, full_name: &str) -> CurrentUser {
  let user = CurrentUser {
    id: Uuid::new_v4(),
    email: Some("shopper@example.com".to_string()),
    metadata: UserMetadata::default(),
  };
  store.seed_user(
    user.id,
    UserProfile {
      full_name: Some(full_name.to_string()),
      email: Some("shopper@example.com".to_string()),
      phone: Some("0915 000 0000".to_string()),
    },
  );
  user
}

/// A signed-in shopper with no users row, only identity metadata.
pub fn shopper_with_metadata(full_name: &str) -> CurrentUser {
  CurrentUser {
    id: Uuid::new_v4(),
    email: Some("meta@example.com".to_string()),
    metadata: UserMetadata {
      full_name: Some(full_name.to_string()),
      name: None,
      phone: Some("0915 111 1111".to_string()),
    },
  }
}

pub async fn add_line(store: &Arc<MemoryStore>, user: &CurrentUser, product: &Product, quantity: i64) {
  store
    .upsert_cart_line(user.id, product.id, quantity)
    .await
    .expect("seeding cart line");
}
