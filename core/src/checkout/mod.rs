// src/checkout/mod.rs

//! The checkout reconciler.
//!
//! Owns the sequence: validate cart against live stock -> resolve customer
//! (name gate) -> create order header -> create line items -> reserve
//! stock per product -> clear the cart -> report the outcome.
//!
//! The flow is safe to retry: every attempt carries a client-generated
//! idempotency key, checked before stock validation, and a duplicate key
//! collapses onto the order it already created; a header the previous
//! attempt left without line items resumes from line insertion.
//! Partial failures compensate explicitly instead of leaving orphans:
//! a failed line insert deletes the header, and a reservation shortfall
//! releases whatever was already reserved and removes the order.

pub mod customer;
pub mod validate;

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::errors::CheckoutError;
use crate::identity::CurrentUser;
use crate::models::{CartLineView, CustomerInfo, Order, OrderLine};
use crate::store::{DataStore, InsertedOrder, NewOrder, NewOrderLine, ReserveOutcome};

pub use customer::{acceptable_name, MIN_NAME_LEN};
pub use validate::{classify, StockIssue, StockReport, StockWarning, LOW_STOCK_THRESHOLD};

const PAYMENT_METHOD_CASH: &str = "cash";
const CHANNEL_MOBILE_APP: &str = "mobile_app";

/// One checkout attempt. The key makes a retried attempt collapse onto
/// the order it already created instead of duplicating it.
#[derive(Debug, Clone, Copy)]
pub struct CheckoutAttempt {
  pub key: Uuid,
}

impl CheckoutAttempt {
  pub fn new() -> Self {
    CheckoutAttempt { key: Uuid::new_v4() }
  }

  pub fn with_key(key: Uuid) -> Self {
    CheckoutAttempt { key }
  }
}

impl Default for CheckoutAttempt {
  fn default() -> Self {
    CheckoutAttempt::new()
  }
}

/// What a checkout invocation produced.
#[derive(Debug)]
pub enum CheckoutOutcome {
  Completed(Receipt),
  /// The resolved customer name failed the quality gate; the caller must
  /// collect a real name and resume via [`CheckoutService::resume_with_name`].
  NeedsCustomerName { prefill: CustomerInfo },
}

#[derive(Debug)]
pub struct Receipt {
  pub order: Order,
  pub lines: Vec<OrderLine>,
  pub low_stock: Vec<StockWarning>,
  /// False when the best-effort cart clear failed; the order still stands.
  pub cart_cleared: bool,
  /// True when this attempt's key matched an already-created order and no
  /// new writes were issued.
  pub replayed: bool,
}

pub struct CheckoutService {
  store: Arc<dyn DataStore>,
}

impl CheckoutService {
  pub fn new(store: Arc<dyn DataStore>) -> Self {
    CheckoutService { store }
  }

  /// Starts a checkout for the current user's cart.
  #[instrument(name = "checkout::begin", skip(self, user, attempt), fields(attempt_key = %attempt.key))]
  pub async fn begin(
    &self,
    user: Option<&CurrentUser>,
    attempt: &CheckoutAttempt,
  ) -> Result<CheckoutOutcome, CheckoutError> {
    let user = user.ok_or(CheckoutError::NotAuthenticated)?;
    let lines = self.store.cart_lines_for_user(user.id).await?;
    // A key that already has an order short-circuits everything below,
    // including stock validation: the attempt may have consumed the very
    // stock a fresh validation would now demand.
    if let Some(order) = self.store.find_order_by_key(attempt.key).await? {
      let receipt = self.resume_existing(user, order, &lines).await?;
      return Ok(CheckoutOutcome::Completed(receipt));
    }
    if lines.is_empty() {
      return Err(CheckoutError::EmptyCart);
    }

    let prefill = customer::resolve_customer(self.store.as_ref(), user).await;
    if !customer::acceptable_name(&prefill.name) {
      info!(user_id = %user.id, "customer name failed quality gate; prompting");
      return Ok(CheckoutOutcome::NeedsCustomerName { prefill });
    }

    self.finalize(user, prefill, lines, attempt).await
  }

  /// Resumes a checkout after the caller collected a real customer name.
  /// Only the minimum-length rule applies to the replacement name.
  #[instrument(name = "checkout::resume", skip(self, user, name, attempt), fields(attempt_key = %attempt.key))]
  pub async fn resume_with_name(
    &self,
    user: Option<&CurrentUser>,
    name: &str,
    attempt: &CheckoutAttempt,
  ) -> Result<CheckoutOutcome, CheckoutError> {
    let user = user.ok_or(CheckoutError::NotAuthenticated)?;
    let name = name.trim();
    if name.chars().count() < customer::MIN_NAME_LEN {
      return Err(CheckoutError::InvalidCustomerName {
        reason: format!("must be at least {} characters", customer::MIN_NAME_LEN),
      });
    }
    let lines = self.store.cart_lines_for_user(user.id).await?;
    if let Some(order) = self.store.find_order_by_key(attempt.key).await? {
      let receipt = self.resume_existing(user, order, &lines).await?;
      return Ok(CheckoutOutcome::Completed(receipt));
    }
    if lines.is_empty() {
      return Err(CheckoutError::EmptyCart);
    }
    let mut info = customer::resolve_customer(self.store.as_ref(), user).await;
    info.name = name.to_string();
    self.finalize(user, info, lines, attempt).await
  }

  /// Re-fetches live stock for the cart's products and classifies every
  /// line. This is the single validation, run immediately before order
  /// creation to keep the race window minimal.
  pub async fn validate_stock(&self, lines: &[CartLineView]) -> Result<StockReport, CheckoutError> {
    let product_ids: Vec<Uuid> = lines.iter().map(|l| l.product_id).collect();
    let live = self.store.stock_levels(&product_ids).await?;
    Ok(validate::classify(lines, &live))
  }

  async fn finalize(
    &self,
    user: &CurrentUser,
    customer: CustomerInfo,
    lines: Vec<CartLineView>,
    attempt: &CheckoutAttempt,
  ) -> Result<CheckoutOutcome, CheckoutError> {
    let report = self.validate_stock(&lines).await?;
    if !report.is_clear() {
      warn!(user_id = %user.id, offending = report.blocking.len(), "checkout refused by stock validation");
      return Err(CheckoutError::InsufficientStock(report.blocking));
    }
    let receipt = self.place_order(user, customer, &lines, report.low_stock, attempt).await?;
    Ok(CheckoutOutcome::Completed(receipt))
  }

  async fn place_order(
    &self,
    user: &CurrentUser,
    customer: CustomerInfo,
    lines: &[CartLineView],
    low_stock: Vec<StockWarning>,
    attempt: &CheckoutAttempt,
  ) -> Result<Receipt, CheckoutError> {
    let total_amount_cents: i64 = lines.iter().map(CartLineView::subtotal_cents).sum();

    // Step 1: order header. Fails with no side effects.
    let new_order = NewOrder {
      user_id: user.id,
      customer_name: customer.name,
      customer_email: customer.email,
      customer_phone: customer.phone,
      total_amount_cents,
      payment_method: PAYMENT_METHOD_CASH.to_string(),
      channel: CHANNEL_MOBILE_APP.to_string(),
      client_key: attempt.key,
    };
    let order = match self.store.insert_order(new_order).await {
      Ok(InsertedOrder::Created(order)) => order,
      Ok(InsertedOrder::Existing(order)) => {
        // Lost a race against a concurrent attempt carrying the same key.
        return self.resume_existing(user, order, lines).await;
      }
      Err(source) => return Err(CheckoutError::OrderCreationFailed(source)),
    };

    self.run_saga_tail(user, order, lines, low_stock, false).await
  }

  /// Picks a checkout attempt back up on the order its key already
  /// created. An order that got as far as line items finished the
  /// stock-affecting steps, so only the idempotent cart clear is
  /// re-attempted; a bare header means the previous attempt died between
  /// the header insert and the line insert (an ambiguous write timeout,
  /// or a line failure whose compensation also failed), and the saga
  /// resumes from line insertion.
  async fn resume_existing(
    &self,
    user: &CurrentUser,
    order: Order,
    lines: &[CartLineView],
  ) -> Result<Receipt, CheckoutError> {
    let existing_lines = self.store.order_lines_for(order.id).await?;
    if !existing_lines.is_empty() {
      info!(order_id = %order.id, attempt_key = %order.client_key, "checkout replayed onto existing order");
      let cart_cleared = self.clear_cart_best_effort(user.id).await;
      return Ok(Receipt {
        order,
        lines: existing_lines,
        low_stock: Vec::new(),
        cart_cleared,
        replayed: true,
      });
    }
    warn!(order_id = %order.id, "existing order has no line items; resuming checkout from line insertion");
    self.run_saga_tail(user, order, lines, Vec::new(), true).await
  }

  /// Steps 2-4 of the order saga: line items, stock reservation, cart
  /// clear. Runs exactly once per order, either directly after the header
  /// insert or when a resumed attempt finds the header bare.
  async fn run_saga_tail(
    &self,
    user: &CurrentUser,
    order: Order,
    lines: &[CartLineView],
    low_stock: Vec<StockWarning>,
    replayed: bool,
  ) -> Result<Receipt, CheckoutError> {
    // Step 2: line items, one per cart line, prices snapshotted now.
    let new_lines: Vec<NewOrderLine> = lines
      .iter()
      .map(|l| NewOrderLine {
        order_id: order.id,
        product_id: l.product_id,
        quantity: l.quantity,
        price_at_purchase_cents: l.price_cents,
      })
      .collect();
    let order_lines = match self.store.insert_order_lines(&new_lines).await {
      Ok(inserted) => inserted,
      Err(source) => {
        // Compensate the orphaned header rather than leaving it behind.
        let compensated = match self.store.delete_order(order.id).await {
          Ok(()) => true,
          Err(delete_error) => {
            error!(order_id = %order.id, %delete_error, "failed to remove orphaned order header");
            false
          }
        };
        return Err(CheckoutError::OrderLinesFailed {
          order_id: order.id,
          compensated,
          source,
        });
      }
    };

    // Step 3: reserve stock per distinct product, concurrently, awaited
    // collectively. Insufficiency rolls the whole checkout back; a plain
    // storage error on one product is logged and does not block the sale.
    let mut wanted: HashMap<Uuid, i64> = HashMap::new();
    for line in lines {
      *wanted.entry(line.product_id).or_insert(0) += line.quantity;
    }
    let reservations = join_all(wanted.iter().map(|(&product_id, &quantity)| {
      let store = Arc::clone(&self.store);
      async move { (product_id, quantity, store.reserve_stock(product_id, quantity).await) }
    }))
    .await;

    let mut reserved: Vec<(Uuid, i64)> = Vec::new();
    let mut shortfalls: Vec<StockIssue> = Vec::new();
    for (product_id, quantity, outcome) in reservations {
      match outcome {
        Ok(ReserveOutcome::Reserved) => reserved.push((product_id, quantity)),
        Ok(ReserveOutcome::Insufficient { available }) => shortfalls.push(StockIssue {
          product_id,
          name: lines
            .iter()
            .find(|l| l.product_id == product_id)
            .map(|l| l.name.clone())
            .unwrap_or_default(),
          available,
          requested: quantity,
        }),
        Err(store_error) => {
          warn!(product_id = %product_id, %store_error, "stock decrement failed; order proceeds");
        }
      }
    }

    if !shortfalls.is_empty() {
      warn!(order_id = %order.id, shortfalls = shortfalls.len(), "reservation shortfall; rolling checkout back");
      for (product_id, quantity) in reserved {
        if let Err(release_error) = self.store.release_stock(product_id, quantity).await {
          error!(product_id = %product_id, %release_error, "failed to release reserved stock during rollback");
        }
      }
      if let Err(delete_error) = self.store.delete_order(order.id).await {
        error!(order_id = %order.id, %delete_error, "failed to remove order after reservation shortfall");
      }
      return Err(CheckoutError::InsufficientStock(shortfalls));
    }

    // Step 4: clear the cart. The order is the source of truth from here
    // on, so a failure is logged, never fatal.
    let cart_cleared = self.clear_cart_best_effort(user.id).await;

    info!(
      order_id = %order.id,
      user_id = %user.id,
      total_amount_cents = order.total_amount_cents,
      lines = order_lines.len(),
      cart_cleared,
      "checkout completed"
    );
    Ok(Receipt {
      order,
      lines: order_lines,
      low_stock,
      cart_cleared,
      replayed,
    })
  }

  async fn clear_cart_best_effort(&self, user_id: Uuid) -> bool {
    match self.store.clear_cart(user_id).await {
      Ok(_) => true,
      Err(clear_error) => {
        warn!(%user_id, %clear_error, "cart clear failed after checkout");
        false
      }
    }
  }
}
