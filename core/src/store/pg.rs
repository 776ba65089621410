// src/store/pg.rs

//! Postgres implementation of [`DataStore`] on top of sqlx.
//!
//! Every remote call runs under an explicit per-call timeout; stock
//! reservation is a single conditional UPDATE so two concurrent checkouts
//! can never both take the last unit.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use tokio::time::timeout;
use uuid::Uuid;

use crate::errors::StoreError;
use crate::models::{CartLine, CartLineView, Order, OrderLine, Product, UserProfile};
use crate::store::{DataStore, InsertedOrder, NewOrder, NewOrderLine, ReserveOutcome, StockLevel};

pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(15);

const ORDER_COLUMNS: &str = "id, user_id, customer_name, customer_email, customer_phone, total_amount_cents, \
   status, payment_method, payment_status, channel, client_key, created_at, updated_at";

#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
  call_timeout: Duration,
}

#[derive(FromRow)]
struct StockRow {
  id: Uuid,
  stock: i64,
  name: String,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    PgStore {
      pool,
      call_timeout: DEFAULT_CALL_TIMEOUT,
    }
  }

  pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
    self.call_timeout = call_timeout;
    self
  }

  pub async fn connect(database_url: &str, call_timeout: Duration) -> Result<Self, StoreError> {
    let pool = PgPoolOptions::new()
      .acquire_timeout(call_timeout)
      .connect(database_url)
      .await?;
    Ok(PgStore { pool, call_timeout })
  }

  pub fn pool(&self) -> &PgPool {
    &self.pool
  }

  /// Runs one remote call under the configured timeout. The op name keeps
  /// the `.read`/`.write` suffix convention used for retry classification.
  async fn call<T, F>(&self, op: &'static str, fut: F) -> Result<T, StoreError>
  where
    F: Future<Output = Result<T, sqlx::Error>>,
  {
    match timeout(self.call_timeout, fut).await {
      Ok(res) => res.map_err(StoreError::from),
      Err(_) => Err(StoreError::Timeout {
        op,
        timeout: self.call_timeout,
      }),
    }
  }
}

#[async_trait]
impl DataStore for PgStore {
  async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
    self
      .call("products.list.read", async {
        sqlx::query_as::<_, Product>(
          "SELECT id, name, description, price_cents, stock, category_id, image_url, created_at, updated_at \
           FROM products ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
      })
      .await
  }

  async fn find_product(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
    self
      .call("products.find.read", async {
        sqlx::query_as::<_, Product>(
          "SELECT id, name, description, price_cents, stock, category_id, image_url, created_at, updated_at \
           FROM products WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
      })
      .await
  }

  async fn stock_levels(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, StockLevel>, StoreError> {
    if ids.is_empty() {
      return Ok(HashMap::new());
    }
    let rows = self
      .call("products.stock.read", async {
        sqlx::query_as::<_, StockRow>("SELECT id, stock, name FROM products WHERE id = ANY($1)")
          .bind(ids.to_vec())
          .fetch_all(&self.pool)
          .await
      })
      .await?;
    Ok(
      rows
        .into_iter()
        .map(|r| (r.id, StockLevel { stock: r.stock, name: r.name }))
        .collect(),
    )
  }

  async fn reserve_stock(&self, product_id: Uuid, quantity: i64) -> Result<ReserveOutcome, StoreError> {
    self
      .call("products.reserve.write", async {
        let result =
          sqlx::query("UPDATE products SET stock = stock - $2, updated_at = NOW() WHERE id = $1 AND stock >= $2")
            .bind(product_id)
            .bind(quantity)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 1 {
          return Ok(ReserveOutcome::Reserved);
        }
        // Conditional update matched nothing: not enough units, or the
        // product row is gone. Report what is actually available.
        let available: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
          .bind(product_id)
          .fetch_optional(&self.pool)
          .await?;
        Ok(ReserveOutcome::Insufficient {
          available: available.unwrap_or(0),
        })
      })
      .await
  }

  async fn release_stock(&self, product_id: Uuid, quantity: i64) -> Result<(), StoreError> {
    self
      .call("products.release.write", async {
        sqlx::query("UPDATE products SET stock = stock + $2, updated_at = NOW() WHERE id = $1")
          .bind(product_id)
          .bind(quantity)
          .execute(&self.pool)
          .await
          .map(|_| ())
      })
      .await
  }

  async fn cart_lines_for_user(&self, user_id: Uuid) -> Result<Vec<CartLineView>, StoreError> {
    self
      .call("cart_items.list.read", async {
        sqlx::query_as::<_, CartLineView>(
          "SELECT ci.id, ci.user_id, ci.product_id, ci.quantity, ci.added_at, \
                  p.name, p.price_cents, p.description, p.category_id, p.image_url, p.stock \
           FROM cart_items ci \
           JOIN products p ON p.id = ci.product_id \
           WHERE ci.user_id = $1 \
           ORDER BY ci.added_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
      })
      .await
  }

  async fn find_cart_line(&self, id: Uuid) -> Result<Option<CartLine>, StoreError> {
    self
      .call("cart_items.find.read", async {
        sqlx::query_as::<_, CartLine>("SELECT id, user_id, product_id, quantity, added_at FROM cart_items WHERE id = $1")
          .bind(id)
          .fetch_optional(&self.pool)
          .await
      })
      .await
  }

  async fn upsert_cart_line(&self, user_id: Uuid, product_id: Uuid, quantity: i64) -> Result<CartLine, StoreError> {
    self
      .call("cart_items.upsert.write", async {
        sqlx::query_as::<_, CartLine>(
          "INSERT INTO cart_items (id, user_id, product_id, quantity, added_at) \
           VALUES ($1, $2, $3, $4, NOW()) \
           ON CONFLICT (user_id, product_id) \
           DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity, added_at = NOW() \
           RETURNING id, user_id, product_id, quantity, added_at",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .fetch_one(&self.pool)
        .await
      })
      .await
  }

  async fn update_cart_quantity(&self, id: Uuid, quantity: i64) -> Result<(), StoreError> {
    self
      .call("cart_items.update.write", async {
        sqlx::query("UPDATE cart_items SET quantity = $2 WHERE id = $1")
          .bind(id)
          .bind(quantity)
          .execute(&self.pool)
          .await
          .map(|_| ())
      })
      .await
  }

  async fn delete_cart_line(&self, id: Uuid) -> Result<(), StoreError> {
    self
      .call("cart_items.delete.write", async {
        sqlx::query("DELETE FROM cart_items WHERE id = $1")
          .bind(id)
          .execute(&self.pool)
          .await
          .map(|_| ())
      })
      .await
  }

  async fn clear_cart(&self, user_id: Uuid) -> Result<u64, StoreError> {
    self
      .call("cart_items.clear.write", async {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
          .bind(user_id)
          .execute(&self.pool)
          .await
          .map(|r| r.rows_affected())
      })
      .await
  }

  async fn find_order_by_key(&self, client_key: Uuid) -> Result<Option<Order>, StoreError> {
    self
      .call("orders.find_by_key.read", async {
        let select_sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE client_key = $1");
        sqlx::query_as::<_, Order>(&select_sql)
          .bind(client_key)
          .fetch_optional(&self.pool)
          .await
      })
      .await
  }

  async fn insert_order(&self, order: NewOrder) -> Result<InsertedOrder, StoreError> {
    self
      .call("orders.insert.write", async {
        let insert_sql = format!(
          "INSERT INTO orders (id, user_id, customer_name, customer_email, customer_phone, total_amount_cents, \
                               status, payment_method, payment_status, channel, client_key, created_at, updated_at) \
           VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7, 'pending', $8, $9, NOW(), NOW()) \
           ON CONFLICT (client_key) DO NOTHING \
           RETURNING {ORDER_COLUMNS}"
        );
        let inserted = sqlx::query_as::<_, Order>(&insert_sql)
          .bind(Uuid::new_v4())
          .bind(order.user_id)
          .bind(&order.customer_name)
          .bind(&order.customer_email)
          .bind(&order.customer_phone)
          .bind(order.total_amount_cents)
          .bind(&order.payment_method)
          .bind(&order.channel)
          .bind(order.client_key)
          .fetch_optional(&self.pool)
          .await?;
        if let Some(created) = inserted {
          return Ok(InsertedOrder::Created(created));
        }
        // The key already has an order: this is a retried checkout attempt.
        let select_sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE client_key = $1");
        let existing = sqlx::query_as::<_, Order>(&select_sql)
          .bind(order.client_key)
          .fetch_one(&self.pool)
          .await?;
        Ok(InsertedOrder::Existing(existing))
      })
      .await
  }

  async fn insert_order_lines(&self, lines: &[NewOrderLine]) -> Result<Vec<OrderLine>, StoreError> {
    let order_ids: Vec<Uuid> = lines.iter().map(|l| l.order_id).collect();
    let product_ids: Vec<Uuid> = lines.iter().map(|l| l.product_id).collect();
    let quantities: Vec<i64> = lines.iter().map(|l| l.quantity).collect();
    let prices: Vec<i64> = lines.iter().map(|l| l.price_at_purchase_cents).collect();
    self
      .call("order_items.insert.write", async {
        // Single batch statement so the line set lands atomically.
        sqlx::query_as::<_, OrderLine>(
          "INSERT INTO order_items (id, order_id, product_id, quantity, price_at_purchase_cents) \
           SELECT gen_random_uuid(), t.order_id, t.product_id, t.quantity, t.price \
           FROM UNNEST($1::uuid[], $2::uuid[], $3::bigint[], $4::bigint[]) AS t(order_id, product_id, quantity, price) \
           RETURNING id, order_id, product_id, quantity, price_at_purchase_cents",
        )
        .bind(order_ids)
        .bind(product_ids)
        .bind(quantities)
        .bind(prices)
        .fetch_all(&self.pool)
        .await
      })
      .await
  }

  async fn order_lines_for(&self, order_id: Uuid) -> Result<Vec<OrderLine>, StoreError> {
    self
      .call("order_items.list.read", async {
        sqlx::query_as::<_, OrderLine>(
          "SELECT id, order_id, product_id, quantity, price_at_purchase_cents FROM order_items WHERE order_id = $1",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
      })
      .await
  }

  async fn delete_order(&self, order_id: Uuid) -> Result<(), StoreError> {
    self
      .call("orders.delete.write", async {
        // order_items rows go with it via ON DELETE CASCADE.
        sqlx::query("DELETE FROM orders WHERE id = $1")
          .bind(order_id)
          .execute(&self.pool)
          .await
          .map(|_| ())
      })
      .await
  }

  async fn find_user_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, StoreError> {
    self
      .call("users.profile.read", async {
        sqlx::query_as::<_, UserProfile>("SELECT full_name, email, phone FROM users WHERE id = $1")
          .bind(user_id)
          .fetch_optional(&self.pool)
          .await
      })
      .await
  }
}
