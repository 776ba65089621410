// src/web/handlers/checkout_handlers.rs

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;
use poolside_core::{CheckoutAttempt, CheckoutOutcome, Receipt};

// Re-using the placeholder AuthenticatedUser extractor from cart_handlers
use super::cart_handlers::AuthenticatedUser;

#[derive(Deserialize, Debug)]
pub struct SubmitNameRequestPayload {
  pub name: String,
  pub idempotency_key: Option<Uuid>,
}

/// The idempotency key for this attempt: the client's `Idempotency-Key`
/// header when present, otherwise a fresh one. The response always echoes
/// the key so a retry after an ambiguous failure can reuse it.
fn attempt_from(req: &HttpRequest, payload_key: Option<Uuid>) -> CheckoutAttempt {
  let header_key = req
    .headers()
    .get("Idempotency-Key")
    .and_then(|v| v.to_str().ok())
    .and_then(|s| Uuid::parse_str(s).ok());
  match payload_key.or(header_key) {
    Some(key) => CheckoutAttempt::with_key(key),
    None => CheckoutAttempt::new(),
  }
}

fn receipt_response(receipt: Receipt, attempt: &CheckoutAttempt) -> HttpResponse {
  HttpResponse::Ok().json(json!({
    "message": "Order placed successfully.",
    "orderId": receipt.order.id,
    "customerName": receipt.order.customer_name,
    "totalAmountCents": receipt.order.total_amount_cents,
    "orderLines": receipt.lines,
    "lowStock": receipt.low_stock,
    "cartCleared": receipt.cart_cleared,
    "replayed": receipt.replayed,
    "idempotencyKey": attempt.key
  }))
}

#[instrument(name = "handler::start_checkout", skip(app_state, req, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn start_checkout_handler(
  app_state: web::Data<AppState>,
  req: HttpRequest,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let attempt = attempt_from(&req, None);
  let current = auth_user.current_user();
  info!(attempt_key = %attempt.key, "checkout initiated");

  match app_state.checkout.begin(Some(&current), &attempt).await? {
    CheckoutOutcome::Completed(receipt) => Ok(receipt_response(receipt, &attempt)),
    CheckoutOutcome::NeedsCustomerName { prefill } => {
      warn!(user_id = %auth_user.user_id, "checkout paused for customer name");
      Ok(HttpResponse::Ok().json(json!({
        "needsCustomerName": true,
        "message": "Please enter your full name for the order (minimum 2 characters).",
        "prefill": prefill,
        "idempotencyKey": attempt.key
      })))
    }
  }
}

#[instrument(name = "handler::submit_checkout_name", skip(app_state, req, req_payload, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn submit_checkout_name_handler(
  app_state: web::Data<AppState>,
  req: HttpRequest,
  req_payload: web::Json<SubmitNameRequestPayload>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let attempt = attempt_from(&req, req_payload.idempotency_key);
  let current = auth_user.current_user();

  match app_state
    .checkout
    .resume_with_name(Some(&current), &req_payload.name, &attempt)
    .await?
  {
    CheckoutOutcome::Completed(receipt) => Ok(receipt_response(receipt, &attempt)),
    // resume_with_name never re-runs the gate, so this arm is unreachable
    // in practice; answer it anyway rather than panic.
    CheckoutOutcome::NeedsCustomerName { prefill } => Ok(HttpResponse::Ok().json(json!({
      "needsCustomerName": true,
      "prefill": prefill,
      "idempotencyKey": attempt.key
    }))),
  }
}
