// src/store/memory.rs

//! In-memory implementation of [`DataStore`] for tests and demos.
//!
//! Reservation runs under one mutex, so it has the same "decrement only
//! if sufficient, atomically" semantics as the Postgres conditional
//! update. Failure-injection toggles let saga tests exercise the
//! compensation and idempotent-replay paths without a real backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::errors::StoreError;
use crate::models::{CartLine, CartLineView, Order, OrderLine, OrderStatus, PaymentStatus, Product, UserProfile};
use crate::store::{DataStore, InsertedOrder, NewOrder, NewOrderLine, ReserveOutcome, StockLevel};

#[derive(Default)]
struct Inner {
  products: HashMap<Uuid, Product>,
  cart: Vec<CartLine>,
  orders: Vec<Order>,
  order_lines: Vec<OrderLine>,
  users: HashMap<Uuid, UserProfile>,
}

#[derive(Default)]
pub struct MemoryStore {
  inner: Mutex<Inner>,
  /// When set, `insert_order_lines` fails, leaving an orphaned header
  /// for the reconciler to compensate.
  pub fail_order_lines: AtomicBool,
  /// When set, `clear_cart` fails; checkout must treat that as non-fatal.
  pub fail_clear_cart: AtomicBool,
  /// When set, `insert_order` fails before any side effect.
  pub fail_insert_order: AtomicBool,
  /// When set, `delete_order` fails, so compensation for an orphaned
  /// header cannot complete and the header stays behind.
  pub fail_delete_order: AtomicBool,
  /// When set to a product id, reservations for that product report
  /// insufficiency without decrementing; models a competing checkout
  /// taking the units between validation and reservation.
  pub force_reserve_shortfall: Mutex<Option<Uuid>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    MemoryStore::default()
  }

  // --- seeding helpers ---

  pub fn seed_product(&self, product: Product) {
    self.inner.lock().products.insert(product.id, product);
  }

  pub fn seed_user(&self, user_id: Uuid, profile: UserProfile) {
    self.inner.lock().users.insert(user_id, profile);
  }

  // --- inspection helpers ---

  pub fn product_stock(&self, product_id: Uuid) -> Option<i64> {
    self.inner.lock().products.get(&product_id).map(|p| p.stock)
  }

  pub fn orders(&self) -> Vec<Order> {
    self.inner.lock().orders.clone()
  }

  pub fn order_count(&self) -> usize {
    self.inner.lock().orders.len()
  }

  pub fn cart_line_count(&self, user_id: Uuid) -> usize {
    self.inner.lock().cart.iter().filter(|l| l.user_id == user_id).count()
  }
}

#[async_trait]
impl DataStore for MemoryStore {
  async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
    let mut products: Vec<Product> = self.inner.lock().products.values().cloned().collect();
    products.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(products)
  }

  async fn find_product(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
    Ok(self.inner.lock().products.get(&id).cloned())
  }

  async fn stock_levels(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, StockLevel>, StoreError> {
    let inner = self.inner.lock();
    Ok(
      ids
        .iter()
        .filter_map(|id| {
          inner.products.get(id).map(|p| {
            (
              *id,
              StockLevel {
                stock: p.stock,
                name: p.name.clone(),
              },
            )
          })
        })
        .collect(),
    )
  }

  async fn reserve_stock(&self, product_id: Uuid, quantity: i64) -> Result<ReserveOutcome, StoreError> {
    if *self.force_reserve_shortfall.lock() == Some(product_id) {
      return Ok(ReserveOutcome::Insufficient { available: 0 });
    }
    let mut inner = self.inner.lock();
    match inner.products.get_mut(&product_id) {
      Some(p) if p.stock >= quantity => {
        p.stock -= quantity;
        p.updated_at = Utc::now();
        Ok(ReserveOutcome::Reserved)
      }
      Some(p) => Ok(ReserveOutcome::Insufficient { available: p.stock }),
      None => Ok(ReserveOutcome::Insufficient { available: 0 }),
    }
  }

  async fn release_stock(&self, product_id: Uuid, quantity: i64) -> Result<(), StoreError> {
    if let Some(p) = self.inner.lock().products.get_mut(&product_id) {
      p.stock += quantity;
      p.updated_at = Utc::now();
    }
    Ok(())
  }

  async fn cart_lines_for_user(&self, user_id: Uuid) -> Result<Vec<CartLineView>, StoreError> {
    let inner = self.inner.lock();
    let mut views: Vec<CartLineView> = inner
      .cart
      .iter()
      .filter(|l| l.user_id == user_id)
      .filter_map(|l| {
        inner.products.get(&l.product_id).map(|p| CartLineView {
          id: l.id,
          user_id: l.user_id,
          product_id: l.product_id,
          quantity: l.quantity,
          added_at: l.added_at,
          name: p.name.clone(),
          price_cents: p.price_cents,
          description: p.description.clone(),
          category_id: p.category_id.clone(),
          image_url: p.image_url.clone(),
          stock: p.stock,
        })
      })
      .collect();
    views.sort_by(|a, b| b.added_at.cmp(&a.added_at));
    Ok(views)
  }

  async fn find_cart_line(&self, id: Uuid) -> Result<Option<CartLine>, StoreError> {
    Ok(self.inner.lock().cart.iter().find(|l| l.id == id).cloned())
  }

  async fn upsert_cart_line(&self, user_id: Uuid, product_id: Uuid, quantity: i64) -> Result<CartLine, StoreError> {
    let mut inner = self.inner.lock();
    if let Some(line) = inner
      .cart
      .iter_mut()
      .find(|l| l.user_id == user_id && l.product_id == product_id)
    {
      line.quantity += quantity;
      line.added_at = Utc::now();
      return Ok(line.clone());
    }
    let line = CartLine {
      id: Uuid::new_v4(),
      user_id,
      product_id,
      quantity,
      added_at: Utc::now(),
    };
    inner.cart.push(line.clone());
    Ok(line)
  }

  async fn update_cart_quantity(&self, id: Uuid, quantity: i64) -> Result<(), StoreError> {
    if let Some(line) = self.inner.lock().cart.iter_mut().find(|l| l.id == id) {
      line.quantity = quantity;
    }
    Ok(())
  }

  async fn delete_cart_line(&self, id: Uuid) -> Result<(), StoreError> {
    self.inner.lock().cart.retain(|l| l.id != id);
    Ok(())
  }

  async fn clear_cart(&self, user_id: Uuid) -> Result<u64, StoreError> {
    if self.fail_clear_cart.load(Ordering::SeqCst) {
      return Err(StoreError::backend("cart_items.clear.write", anyhow!("injected failure")));
    }
    let mut inner = self.inner.lock();
    let before = inner.cart.len();
    inner.cart.retain(|l| l.user_id != user_id);
    Ok((before - inner.cart.len()) as u64)
  }

  async fn find_order_by_key(&self, client_key: Uuid) -> Result<Option<Order>, StoreError> {
    Ok(self.inner.lock().orders.iter().find(|o| o.client_key == client_key).cloned())
  }

  async fn insert_order(&self, order: NewOrder) -> Result<InsertedOrder, StoreError> {
    if self.fail_insert_order.load(Ordering::SeqCst) {
      return Err(StoreError::backend("orders.insert.write", anyhow!("injected failure")));
    }
    let mut inner = self.inner.lock();
    if let Some(existing) = inner.orders.iter().find(|o| o.client_key == order.client_key) {
      return Ok(InsertedOrder::Existing(existing.clone()));
    }
    let now = Utc::now();
    let created = Order {
      id: Uuid::new_v4(),
      user_id: order.user_id,
      customer_name: order.customer_name,
      customer_email: order.customer_email,
      customer_phone: order.customer_phone,
      total_amount_cents: order.total_amount_cents,
      status: OrderStatus::Pending,
      payment_method: order.payment_method,
      payment_status: PaymentStatus::Pending,
      channel: order.channel,
      client_key: order.client_key,
      created_at: now,
      updated_at: now,
    };
    inner.orders.push(created.clone());
    Ok(InsertedOrder::Created(created))
  }

  async fn insert_order_lines(&self, lines: &[NewOrderLine]) -> Result<Vec<OrderLine>, StoreError> {
    if self.fail_order_lines.load(Ordering::SeqCst) {
      return Err(StoreError::backend(
        "order_items.insert.write",
        anyhow!("injected failure"),
      ));
    }
    let mut inner = self.inner.lock();
    let inserted: Vec<OrderLine> = lines
      .iter()
      .map(|l| OrderLine {
        id: Uuid::new_v4(),
        order_id: l.order_id,
        product_id: l.product_id,
        quantity: l.quantity,
        price_at_purchase_cents: l.price_at_purchase_cents,
      })
      .collect();
    inner.order_lines.extend(inserted.clone());
    Ok(inserted)
  }

  async fn order_lines_for(&self, order_id: Uuid) -> Result<Vec<OrderLine>, StoreError> {
    Ok(
      self
        .inner
        .lock()
        .order_lines
        .iter()
        .filter(|l| l.order_id == order_id)
        .cloned()
        .collect(),
    )
  }

  async fn delete_order(&self, order_id: Uuid) -> Result<(), StoreError> {
    if self.fail_delete_order.load(Ordering::SeqCst) {
      return Err(StoreError::backend("orders.delete.write", anyhow!("injected failure")));
    }
    let mut inner = self.inner.lock();
    inner.orders.retain(|o| o.id != order_id);
    inner.order_lines.retain(|l| l.order_id != order_id);
    Ok(())
  }

  async fn find_user_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, StoreError> {
    Ok(self.inner.lock().users.get(&user_id).cloned())
  }
}
