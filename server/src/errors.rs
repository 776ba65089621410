// src/errors.rs

use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use poolside_core::{CartError, CheckoutError, StoreError};

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error(transparent)]
  Cart(#[from] CartError),

  #[error(transparent)]
  Checkout(#[from] CheckoutError),

  #[error(transparent)]
  Store(#[from] StoreError),

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

/// Only the actionable failures get specific messages; the rest collapse
/// to an opaque 500 so internals never leak into responses.
impl ResponseError for AppError {
  fn error_response(&self) -> HttpResponse {
    // Log the full error when it's turned into a response
    tracing::error!(application_error = %self, "Responding with error");
    match self {
      AppError::Validation(m) => HttpResponse::BadRequest().json(json!({"error": m})),
      AppError::Auth(m) => HttpResponse::Unauthorized().json(json!({"error": m})),
      AppError::NotFound(m) => HttpResponse::NotFound().json(json!({"error": m})),
      AppError::Config(m) => {
        HttpResponse::InternalServerError().json(json!({"error": "Configuration issue", "detail": m}))
      }
      AppError::Cart(cart_error) => cart_response(cart_error),
      AppError::Checkout(checkout_error) => checkout_response(checkout_error),
      AppError::Store(store_error) => store_response(store_error),
      AppError::Internal(m) => {
        HttpResponse::InternalServerError().json(json!({"error": "An internal error occurred", "detail": m}))
      }
    }
  }
}

fn cart_response(error: &CartError) -> HttpResponse {
  match error {
    CartError::LineNotFound(_) | CartError::ProductNotFound(_) => {
      HttpResponse::NotFound().json(json!({"error": error.to_string()}))
    }
    CartError::InvalidQuantity(_) => HttpResponse::BadRequest().json(json!({"error": error.to_string()})),
    CartError::InsufficientStock {
      name,
      available,
      requested,
      ..
    } => HttpResponse::Conflict().json(json!({
      "error": error.to_string(),
      "item": {"name": name, "available": available, "requested": requested}
    })),
    CartError::StockUnavailable(_) => {
      HttpResponse::ServiceUnavailable().json(json!({"error": "Could not check product availability"}))
    }
    CartError::Store(store_error) => store_response(store_error),
  }
}

fn checkout_response(error: &CheckoutError) -> HttpResponse {
  match error {
    CheckoutError::NotAuthenticated => {
      HttpResponse::Unauthorized().json(json!({"error": "Please login to checkout"}))
    }
    CheckoutError::EmptyCart => HttpResponse::BadRequest().json(json!({"error": "Cart is empty"})),
    CheckoutError::InsufficientStock(items) => HttpResponse::Conflict().json(json!({
      "error": "Some items in your cart have stock issues",
      "items": items
    })),
    CheckoutError::InvalidCustomerName { reason } => {
      HttpResponse::UnprocessableEntity().json(json!({"error": format!("Please enter your real name: {reason}")}))
    }
    CheckoutError::OrderCreationFailed(source) => {
      if matches!(source, StoreError::Timeout { .. }) {
        // Ambiguous write: the order may or may not exist. The client
        // should retry with the same Idempotency-Key, never a fresh one.
        HttpResponse::InternalServerError().json(json!({
          "error": "Order creation timed out in an ambiguous state",
          "retry": "Repeat the request with the same Idempotency-Key"
        }))
      } else {
        HttpResponse::InternalServerError().json(json!({"error": "Failed to create order"}))
      }
    }
    CheckoutError::OrderLinesFailed { .. } => {
      HttpResponse::InternalServerError().json(json!({"error": "Failed to create order"}))
    }
    CheckoutError::Store(store_error) => store_response(store_error),
  }
}

fn store_response(error: &StoreError) -> HttpResponse {
  match error {
    StoreError::Timeout { .. } if error.is_transient() => {
      HttpResponse::GatewayTimeout().json(json!({"error": "Data store timed out, please retry"}))
    }
    _ => HttpResponse::InternalServerError().json(json!({"error": "Database operation failed"})),
  }
}

// Define a Result type alias for the application
pub type Result<T, E = AppError> = std::result::Result<T, E>;
