// tests/checkout_tests.rs
mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::*;
use poolside_core::{
  CheckoutAttempt, CheckoutError, CheckoutOutcome, CheckoutService, MemoryStore, OrderStatus, PaymentStatus,
};

fn checkout_over(store: &Arc<MemoryStore>) -> CheckoutService {
  CheckoutService::new(store.clone())
}

fn completed(outcome: CheckoutOutcome) -> poolside_core::Receipt {
  match outcome {
    CheckoutOutcome::Completed(receipt) => receipt,
    other => panic!("expected completed checkout, got {other:?}"),
  }
}

#[tokio::test]
async fn test_happy_path_creates_order_decrements_stock_and_clears_cart() {
  setup_tracing();
  let store = Arc::new(MemoryStore::new());
  let product_a = product("Product A", 10_000, 5);
  store.seed_product(product_a.clone());
  let user = shopper_with_profile(&store, "Juan Dela Cruz");
  add_line(&store, &user, &product_a, 2).await;

  let checkout = checkout_over(&store);
  let receipt = completed(checkout.begin(Some(&user), &CheckoutAttempt::new()).await.unwrap());

  assert_eq!(receipt.order.total_amount_cents, 20_000);
  assert_eq!(receipt.order.customer_name, "Juan Dela Cruz");
  assert_eq!(receipt.order.status, OrderStatus::Pending);
  assert_eq!(receipt.order.payment_status, PaymentStatus::Pending);
  assert_eq!(receipt.order.payment_method, "cash");
  assert_eq!(receipt.lines.len(), 1);
  assert_eq!(receipt.lines[0].quantity, 2);
  assert_eq!(receipt.lines[0].price_at_purchase_cents, 10_000);
  assert!(receipt.cart_cleared);
  assert!(!receipt.replayed);

  assert_eq!(store.product_stock(product_a.id), Some(3));
  assert_eq!(store.cart_line_count(user.id), 0);
  assert_eq!(store.order_count(), 1);
}

#[tokio::test]
async fn test_insufficient_stock_refuses_checkout_before_any_write() {
  setup_tracing();
  let store = Arc::new(MemoryStore::new());
  let product_b = product("Product B", 15_000, 1);
  store.seed_product(product_b.clone());
  let user = shopper_with_profile(&store, "Juan Dela Cruz");
  add_line(&store, &user, &product_b, 3).await;

  let checkout = checkout_over(&store);
  let err = checkout.begin(Some(&user), &CheckoutAttempt::new()).await.unwrap_err();

  match err {
    CheckoutError::InsufficientStock(issues) => {
      assert_eq!(issues.len(), 1);
      assert_eq!(issues[0].name, "Product B");
      assert_eq!(issues[0].available, 1);
      assert_eq!(issues[0].requested, 3);
    }
    other => panic!("unexpected error: {other:?}"),
  }
  assert_eq!(store.order_count(), 0);
  assert_eq!(store.product_stock(product_b.id), Some(1));
  assert_eq!(store.cart_line_count(user.id), 1);
}

#[tokio::test]
async fn test_all_offending_lines_are_surfaced_together() {
  setup_tracing();
  let store = Arc::new(MemoryStore::new());
  let a = product("A", 10_000, 0);
  let b = product("B", 10_000, 2);
  let c = product("C", 10_000, 50);
  for p in [&a, &b, &c] {
    store.seed_product(p.clone());
  }
  let user = shopper_with_profile(&store, "Juan Dela Cruz");
  add_line(&store, &user, &a, 1).await;
  add_line(&store, &user, &b, 5).await;
  add_line(&store, &user, &c, 1).await;

  let checkout = checkout_over(&store);
  let err = checkout.begin(Some(&user), &CheckoutAttempt::new()).await.unwrap_err();
  match err {
    CheckoutError::InsufficientStock(issues) => assert_eq!(issues.len(), 2),
    other => panic!("unexpected error: {other:?}"),
  }
}

#[tokio::test]
async fn test_low_stock_warns_but_completes() {
  setup_tracing();
  let store = Arc::new(MemoryStore::new());
  let last_few = product("Filter Cartridge", 80_000, 4);
  store.seed_product(last_few.clone());
  let user = shopper_with_profile(&store, "Juan Dela Cruz");
  add_line(&store, &user, &last_few, 1).await;

  let checkout = checkout_over(&store);
  let receipt = completed(checkout.begin(Some(&user), &CheckoutAttempt::new()).await.unwrap());

  assert_eq!(receipt.low_stock.len(), 1);
  assert_eq!(receipt.low_stock[0].remaining, 4);
  assert_eq!(store.product_stock(last_few.id), Some(3));
}

#[tokio::test]
async fn test_total_is_exact_integer_sum_across_lines() {
  setup_tracing();
  let store = Arc::new(MemoryStore::new());
  let a = product("A", 19_999, 10);
  let b = product("B", 333, 10);
  store.seed_product(a.clone());
  store.seed_product(b.clone());
  let user = shopper_with_profile(&store, "Juan Dela Cruz");
  add_line(&store, &user, &a, 3).await;
  add_line(&store, &user, &b, 7).await;

  let checkout = checkout_over(&store);
  let receipt = completed(checkout.begin(Some(&user), &CheckoutAttempt::new()).await.unwrap());

  assert_eq!(receipt.order.total_amount_cents, 3 * 19_999 + 7 * 333);
  let sum_of_lines: i64 = receipt
    .lines
    .iter()
    .map(|l| l.quantity * l.price_at_purchase_cents)
    .sum();
  assert_eq!(receipt.order.total_amount_cents, sum_of_lines);
}

#[tokio::test]
async fn test_not_authenticated_halts_checkout() {
  setup_tracing();
  let store = Arc::new(MemoryStore::new());
  let checkout = checkout_over(&store);

  assert!(matches!(
    checkout.begin(None, &CheckoutAttempt::new()).await,
    Err(CheckoutError::NotAuthenticated)
  ));
}

#[tokio::test]
async fn test_empty_cart_halts_checkout() {
  setup_tracing();
  let store = Arc::new(MemoryStore::new());
  let user = shopper_with_profile(&store, "Juan Dela Cruz");

  let checkout = checkout_over(&store);
  assert!(matches!(
    checkout.begin(Some(&user), &CheckoutAttempt::new()).await,
    Err(CheckoutError::EmptyCart)
  ));
}

#[tokio::test]
async fn test_generic_profile_name_routes_to_prompt_then_resumes() {
  setup_tracing();
  let store = Arc::new(MemoryStore::new());
  let net = product("Pool Net", 25_000, 10);
  store.seed_product(net.clone());
  let user = shopper_with_profile(&store, "Customer");
  add_line(&store, &user, &net, 1).await;

  let checkout = checkout_over(&store);
  let attempt = CheckoutAttempt::new();

  let outcome = checkout.begin(Some(&user), &attempt).await.unwrap();
  let prefill = match outcome {
    CheckoutOutcome::NeedsCustomerName { prefill } => prefill,
    other => panic!("expected name prompt, got {other:?}"),
  };
  assert_eq!(prefill.email, "shopper@example.com");
  // Nothing was written while waiting on the prompt.
  assert_eq!(store.order_count(), 0);
  assert_eq!(store.product_stock(net.id), Some(10));

  let receipt = completed(
    checkout
      .resume_with_name(Some(&user), "Maria Santos", &attempt)
      .await
      .unwrap(),
  );
  assert_eq!(receipt.order.customer_name, "Maria Santos");
  assert_eq!(store.order_count(), 1);
}

#[tokio::test]
async fn test_resume_rejects_replacement_name_below_two_characters() {
  setup_tracing();
  let store = Arc::new(MemoryStore::new());
  let net = product("Pool Net", 25_000, 10);
  store.seed_product(net.clone());
  let user = shopper_with_profile(&store, "Customer");
  add_line(&store, &user, &net, 1).await;

  let checkout = checkout_over(&store);
  assert!(matches!(
    checkout.resume_with_name(Some(&user), " a ", &CheckoutAttempt::new()).await,
    Err(CheckoutError::InvalidCustomerName { .. })
  ));
  assert_eq!(store.order_count(), 0);
}

#[tokio::test]
async fn test_customer_details_fall_back_to_identity_metadata() {
  setup_tracing();
  let store = Arc::new(MemoryStore::new());
  let net = product("Pool Net", 25_000, 10);
  store.seed_product(net.clone());
  // No users row for this shopper; the metadata carries the real name.
  let user = shopper_with_metadata("Maria Santos");
  add_line(&store, &user, &net, 1).await;

  let checkout = checkout_over(&store);
  let receipt = completed(checkout.begin(Some(&user), &CheckoutAttempt::new()).await.unwrap());

  assert_eq!(receipt.order.customer_name, "Maria Santos");
  assert_eq!(receipt.order.customer_email, "meta@example.com");
  assert_eq!(receipt.order.customer_phone, "0915 111 1111");
}

#[tokio::test]
async fn test_line_insert_failure_compensates_the_orphaned_header() {
  setup_tracing();
  let store = Arc::new(MemoryStore::new());
  let net = product("Pool Net", 25_000, 10);
  store.seed_product(net.clone());
  let user = shopper_with_profile(&store, "Juan Dela Cruz");
  add_line(&store, &user, &net, 2).await;
  store.fail_order_lines.store(true, Ordering::SeqCst);

  let checkout = checkout_over(&store);
  let err = checkout.begin(Some(&user), &CheckoutAttempt::new()).await.unwrap_err();

  match err {
    CheckoutError::OrderLinesFailed { compensated, .. } => assert!(compensated),
    other => panic!("unexpected error: {other:?}"),
  }
  // No orphaned header, no stock movement, cart untouched.
  assert_eq!(store.order_count(), 0);
  assert_eq!(store.product_stock(net.id), Some(10));
  assert_eq!(store.cart_line_count(user.id), 1);
}

#[tokio::test]
async fn test_header_insert_failure_has_no_side_effects() {
  setup_tracing();
  let store = Arc::new(MemoryStore::new());
  let net = product("Pool Net", 25_000, 10);
  store.seed_product(net.clone());
  let user = shopper_with_profile(&store, "Juan Dela Cruz");
  add_line(&store, &user, &net, 2).await;
  store.fail_insert_order.store(true, Ordering::SeqCst);

  let checkout = checkout_over(&store);
  let err = checkout.begin(Some(&user), &CheckoutAttempt::new()).await.unwrap_err();
  assert!(matches!(err, CheckoutError::OrderCreationFailed(_)));
  assert_eq!(store.order_count(), 0);
  assert_eq!(store.product_stock(net.id), Some(10));
}

#[tokio::test]
async fn test_cart_clear_failure_is_nonfatal_and_reported_on_receipt() {
  setup_tracing();
  let store = Arc::new(MemoryStore::new());
  let net = product("Pool Net", 25_000, 10);
  store.seed_product(net.clone());
  let user = shopper_with_profile(&store, "Juan Dela Cruz");
  add_line(&store, &user, &net, 1).await;
  store.fail_clear_cart.store(true, Ordering::SeqCst);

  let checkout = checkout_over(&store);
  let receipt = completed(checkout.begin(Some(&user), &CheckoutAttempt::new()).await.unwrap());

  assert!(!receipt.cart_cleared);
  assert_eq!(store.order_count(), 1);
  assert_eq!(store.product_stock(net.id), Some(9));
}

#[tokio::test]
async fn test_retrying_a_checkout_with_the_same_key_creates_one_order() {
  setup_tracing();
  let store = Arc::new(MemoryStore::new());
  let net = product("Pool Net", 25_000, 10);
  store.seed_product(net.clone());
  let user = shopper_with_profile(&store, "Juan Dela Cruz");
  add_line(&store, &user, &net, 2).await;

  // First attempt completes the order but the cart clear fails, so the
  // client sees an incomplete-looking state and retries.
  store.fail_clear_cart.store(true, Ordering::SeqCst);
  let checkout = checkout_over(&store);
  let attempt = CheckoutAttempt::new();
  let first = completed(checkout.begin(Some(&user), &attempt).await.unwrap());
  assert!(!first.cart_cleared);

  store.fail_clear_cart.store(false, Ordering::SeqCst);
  let second = completed(checkout.begin(Some(&user), &attempt).await.unwrap());

  assert!(second.replayed);
  assert_eq!(second.order.id, first.order.id);
  assert_eq!(store.order_count(), 1);
  // Stock was decremented exactly once, and the replay cleared the cart.
  assert_eq!(store.product_stock(net.id), Some(8));
  assert_eq!(store.cart_line_count(user.id), 0);
}

#[tokio::test]
async fn test_replay_succeeds_even_after_the_attempt_consumed_the_last_stock() {
  setup_tracing();
  let store = Arc::new(MemoryStore::new());
  let heater = product("Heater", 500_000, 2);
  store.seed_product(heater.clone());
  let user = shopper_with_profile(&store, "Juan Dela Cruz");
  add_line(&store, &user, &heater, 2).await;

  // The first attempt takes every remaining unit but fails to clear the
  // cart, so the client retries with the same key against a product that
  // now has zero stock.
  store.fail_clear_cart.store(true, Ordering::SeqCst);
  let checkout = checkout_over(&store);
  let attempt = CheckoutAttempt::new();
  let first = completed(checkout.begin(Some(&user), &attempt).await.unwrap());
  assert_eq!(store.product_stock(heater.id), Some(0));

  store.fail_clear_cart.store(false, Ordering::SeqCst);
  let second = completed(checkout.begin(Some(&user), &attempt).await.unwrap());

  // The retry must collapse onto the existing order, not be refused by a
  // fresh stock validation the original reservation already satisfied.
  assert!(second.replayed);
  assert_eq!(second.order.id, first.order.id);
  assert_eq!(second.lines.len(), 1);
  assert_eq!(store.order_count(), 1);
  assert_eq!(store.product_stock(heater.id), Some(0));
  assert_eq!(store.cart_line_count(user.id), 0);
}

#[tokio::test]
async fn test_retry_resumes_an_order_left_without_line_items() {
  setup_tracing();
  let store = Arc::new(MemoryStore::new());
  let net = product("Pool Net", 25_000, 10);
  store.seed_product(net.clone());
  let user = shopper_with_profile(&store, "Juan Dela Cruz");
  add_line(&store, &user, &net, 2).await;

  // Line insert fails and so does the compensating header delete, leaving
  // a bare order header carrying the attempt's key: no lines, no stock
  // movement, cart intact.
  store.fail_order_lines.store(true, Ordering::SeqCst);
  store.fail_delete_order.store(true, Ordering::SeqCst);
  let checkout = checkout_over(&store);
  let attempt = CheckoutAttempt::new();
  let err = checkout.begin(Some(&user), &attempt).await.unwrap_err();
  match err {
    CheckoutError::OrderLinesFailed { compensated, .. } => assert!(!compensated),
    other => panic!("unexpected error: {other:?}"),
  }
  assert_eq!(store.order_count(), 1);
  assert_eq!(store.product_stock(net.id), Some(10));

  // The retry with the same key must finish the job, not report a
  // zero-line order as placed.
  store.fail_order_lines.store(false, Ordering::SeqCst);
  store.fail_delete_order.store(false, Ordering::SeqCst);
  let receipt = completed(checkout.begin(Some(&user), &attempt).await.unwrap());

  assert!(receipt.replayed);
  assert_eq!(receipt.lines.len(), 1);
  assert_eq!(receipt.lines[0].quantity, 2);
  assert_eq!(store.order_count(), 1);
  assert_eq!(store.product_stock(net.id), Some(8));
  assert_eq!(store.cart_line_count(user.id), 0);
}

#[tokio::test]
async fn test_concurrent_checkouts_never_oversell_the_last_unit() {
  setup_tracing();
  let store = Arc::new(MemoryStore::new());
  let last_unit = product("Last Heater", 500_000, 1);
  store.seed_product(last_unit.clone());

  let alice = shopper_with_profile(&store, "Maria Santos");
  let bob = shopper_with_profile(&store, "Juan Dela Cruz");
  add_line(&store, &alice, &last_unit, 1).await;
  add_line(&store, &bob, &last_unit, 1).await;

  let checkout = Arc::new(checkout_over(&store));
  let (a, b) = {
    let (c1, c2) = (checkout.clone(), checkout.clone());
    let (u1, u2) = (alice.clone(), bob.clone());
    let h1 = tokio::spawn(async move { c1.begin(Some(&u1), &CheckoutAttempt::new()).await });
    let h2 = tokio::spawn(async move { c2.begin(Some(&u2), &CheckoutAttempt::new()).await });
    (h1.await.unwrap(), h2.await.unwrap())
  };

  let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
  assert_eq!(successes, 1, "exactly one checkout may take the last unit");
  for result in [a, b] {
    if let Err(err) = result {
      assert!(matches!(err, CheckoutError::InsufficientStock(_)), "loser must observe insufficient stock, got {err:?}");
    }
  }
  assert_eq!(store.product_stock(last_unit.id), Some(0), "stock must end at zero, never negative");
  assert_eq!(store.order_count(), 1);
}

#[tokio::test]
async fn test_reservation_shortfall_rolls_back_order_and_releases_reserved_stock() {
  setup_tracing();
  let store = Arc::new(MemoryStore::new());
  let plenty = product("Brush", 12_000, 10);
  let scarce = product("Skimmer", 60_000, 2);
  store.seed_product(plenty.clone());
  store.seed_product(scarce.clone());
  let user = shopper_with_profile(&store, "Juan Dela Cruz");
  add_line(&store, &user, &plenty, 2).await;
  add_line(&store, &user, &scarce, 2).await;

  let checkout = checkout_over(&store);
  // A competing checkout takes the scarce units in the window between
  // this checkout's validation and its reservation.
  *store.force_reserve_shortfall.lock() = Some(scarce.id);

  let err = checkout.begin(Some(&user), &CheckoutAttempt::new()).await.unwrap_err();
  match err {
    CheckoutError::InsufficientStock(issues) => {
      assert_eq!(issues.len(), 1);
      assert_eq!(issues[0].name, "Skimmer");
    }
    other => panic!("unexpected error: {other:?}"),
  }

  // The order was rolled back and the plentiful product's reservation
  // was released; nothing moved, the cart is intact.
  assert_eq!(store.order_count(), 0);
  assert_eq!(store.product_stock(plenty.id), Some(10));
  assert_eq!(store.product_stock(scarce.id), Some(2));
  assert_eq!(store.cart_line_count(user.id), 2);
}
