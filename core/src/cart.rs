// src/cart.rs

//! The cart/stock read path.
//!
//! `fetch_stocks` is the only place live stock truth enters the client;
//! every stock decision on the cart screen derives from the snapshot it
//! maintains, falling back to the denormalized per-line stock only before
//! the first fetch completes. Cart edits never touch product stock: a
//! cart quantity is a reservation intent, not a hold.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::CartError;
use crate::identity::CurrentUser;
use crate::models::{CartLine, CartLineView};
use crate::store::{DataStore, StockLevel};

/// Result of a quantity edit. Quantities below 1 are removal requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuantityChange {
  Updated { line_id: Uuid, quantity: i64 },
  Removed { line_id: Uuid },
}

pub struct CartService {
  store: Arc<dyn DataStore>,
  stocks: RwLock<HashMap<Uuid, StockLevel>>,
}

impl CartService {
  pub fn new(store: Arc<dyn DataStore>) -> Self {
    CartService {
      store,
      stocks: RwLock::new(HashMap::new()),
    }
  }

  /// Loads the user's cart joined with product fields, newest first, and
  /// refreshes the stock snapshot for exactly the product ids present.
  /// No identity or no rows is an empty cart, not an error.
  #[instrument(name = "cart::load", skip(self, user))]
  pub async fn load_cart(&self, user: Option<&CurrentUser>) -> Result<Vec<CartLineView>, CartError> {
    let Some(user) = user else {
      return Ok(Vec::new());
    };
    let mut views = self.store.cart_lines_for_user(user.id).await?;
    let mut product_ids: Vec<Uuid> = views.iter().map(|v| v.product_id).collect();
    product_ids.dedup();
    let levels = self.fetch_stocks(&product_ids).await?;
    for view in &mut views {
      if let Some(level) = levels.get(&view.product_id) {
        view.stock = level.stock;
      }
    }
    info!(user_id = %user.id, lines = views.len(), "cart loaded");
    Ok(views)
  }

  /// Re-fetches authoritative stock for the given products and replaces
  /// the cached entries.
  pub async fn fetch_stocks(&self, product_ids: &[Uuid]) -> Result<HashMap<Uuid, StockLevel>, CartError> {
    if product_ids.is_empty() {
      return Ok(HashMap::new());
    }
    let levels = self.store.stock_levels(product_ids).await?;
    let mut cache = self.stocks.write();
    for (id, level) in &levels {
      cache.insert(*id, level.clone());
    }
    Ok(levels)
  }

  pub fn cached_stock(&self, product_id: Uuid) -> Option<StockLevel> {
    self.stocks.read().get(&product_id).cloned()
  }

  /// Adds a product to the cart, accumulating quantity into an existing
  /// line for the same product. Stock is checked but not decremented;
  /// reservation happens at order time.
  #[instrument(name = "cart::add", skip(self, user), fields(user_id = %user.id, product_id = %product_id, quantity))]
  pub async fn add_to_cart(&self, user: &CurrentUser, product_id: Uuid, quantity: i64) -> Result<CartLine, CartError> {
    if quantity <= 0 {
      return Err(CartError::InvalidQuantity(quantity));
    }
    let product = self
      .store
      .find_product(product_id)
      .await?
      .ok_or(CartError::ProductNotFound(product_id))?;
    if quantity > product.stock {
      return Err(CartError::InsufficientStock {
        product_id,
        name: product.name.clone(),
        available: product.stock,
        requested: quantity,
      });
    }
    let line = self.store.upsert_cart_line(user.id, product_id, quantity).await?;
    self.stocks.write().insert(
      product_id,
      StockLevel {
        stock: product.stock,
        name: product.name,
      },
    );
    info!(line_id = %line.id, new_quantity = line.quantity, "cart line upserted");
    Ok(line)
  }

  /// Persists a new quantity for a cart line. Quantities below 1 delegate
  /// to removal; quantities above live stock are rejected with the
  /// available amount.
  #[instrument(name = "cart::set_quantity", skip(self))]
  pub async fn set_quantity(&self, line_id: Uuid, new_quantity: i64) -> Result<QuantityChange, CartError> {
    let line = self
      .store
      .find_cart_line(line_id)
      .await?
      .ok_or(CartError::LineNotFound(line_id))?;

    if new_quantity < 1 {
      self.remove_line(line_id).await?;
      return Ok(QuantityChange::Removed { line_id });
    }

    let level = match self.cached_stock(line.product_id) {
      Some(level) => level,
      None => {
        // Cache miss: the snapshot has not seen this product yet.
        self.fetch_stocks(&[line.product_id]).await?;
        self
          .cached_stock(line.product_id)
          .ok_or(CartError::StockUnavailable(line.product_id))?
      }
    };

    if new_quantity > level.stock {
      warn!(product_id = %line.product_id, available = level.stock, requested = new_quantity, "quantity edit exceeds stock");
      return Err(CartError::InsufficientStock {
        product_id: line.product_id,
        name: level.name,
        available: level.stock,
        requested: new_quantity,
      });
    }

    self.store.update_cart_quantity(line_id, new_quantity).await?;
    Ok(QuantityChange::Updated {
      line_id,
      quantity: new_quantity,
    })
  }

  /// Deletes a cart line unconditionally and evicts its cached stock
  /// entry. Any user confirmation happens at the UI boundary.
  #[instrument(name = "cart::remove", skip(self))]
  pub async fn remove_line(&self, line_id: Uuid) -> Result<(), CartError> {
    let line = self.store.find_cart_line(line_id).await?;
    self.store.delete_cart_line(line_id).await?;
    if let Some(line) = line {
      self.stocks.write().remove(&line.product_id);
    }
    Ok(())
  }
}
