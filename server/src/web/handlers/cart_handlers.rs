// src/web/handlers/cart_handlers.rs

use actix_web::{web, FromRequest, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;
use poolside_core::{CurrentUser, QuantityChange, UserMetadata};

// --- Custom Extractor for Authenticated User (Placeholder) ---
// The real identity provider lives outside this service. Until the
// gateway injects a verified identity, user id and email are taken from
// headers; swap this extractor out when real auth middleware lands.
#[derive(Debug)]
pub struct AuthenticatedUser {
  pub user_id: Uuid,
  pub email: Option<String>,
}

impl AuthenticatedUser {
  pub fn current_user(&self) -> CurrentUser {
    CurrentUser {
      id: self.user_id,
      email: self.email.clone(),
      metadata: UserMetadata::default(),
    }
  }
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = futures_util::future::Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
    let email = req
      .headers()
      .get("X-User-Email")
      .and_then(|v| v.to_str().ok())
      .map(str::to_string);
    if let Some(user_id_header) = req.headers().get("X-User-ID") {
      if let Ok(user_id_str) = user_id_header.to_str() {
        if let Ok(user_id) = Uuid::parse_str(user_id_str) {
          return futures_util::future::ready(Ok(AuthenticatedUser { user_id, email }));
        }
      }
    }
    warn!("AuthenticatedUser extractor: Missing or invalid X-User-ID header.");
    futures_util::future::ready(Err(AppError::Auth(
      "User authentication required. Missing or invalid X-User-ID header.".to_string(),
    )))
  }
}

// --- Request DTOs ---
#[derive(Deserialize, Debug)]
pub struct AddToCartRequestPayload {
  pub product_id: Uuid,
  pub quantity: i64,
}

#[derive(Deserialize, Debug)]
pub struct SetQuantityRequestPayload {
  pub quantity: i64,
}

// --- Handler Implementations ---

#[instrument(name = "handler::get_cart", skip(app_state, auth_user))]
pub async fn get_cart_handler(
  app_state: web::Data<AppState>,
  auth_user: Option<AuthenticatedUser>,
) -> Result<HttpResponse, AppError> {
  // No identity means an empty cart, not an error.
  let current = auth_user.map(|a| a.current_user());
  let lines = app_state.cart.load_cart(current.as_ref()).await?;
  let subtotal_cents: i64 = lines.iter().map(|l| l.subtotal_cents()).sum();
  Ok(HttpResponse::Ok().json(json!({
    "cartItems": lines,
    "subtotalCents": subtotal_cents
  })))
}

#[instrument(
  name = "handler::add_to_cart",
  skip(app_state, req_payload, auth_user),
  fields(user_id = %auth_user.user_id, product_id = %req_payload.product_id, quantity = %req_payload.quantity)
)]
pub async fn add_to_cart_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<AddToCartRequestPayload>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let current = auth_user.current_user();
  let line = app_state
    .cart
    .add_to_cart(&current, req_payload.product_id, req_payload.quantity)
    .await?;
  info!(line_id = %line.id, new_quantity = line.quantity, "item added to cart");
  Ok(HttpResponse::Ok().json(json!({
    "message": "Item added to cart successfully.",
    "cartItem": line
  })))
}

#[instrument(name = "handler::set_quantity", skip(app_state, req_payload, _auth_user), fields(line_id = %path.as_ref()))]
pub async fn set_quantity_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  req_payload: web::Json<SetQuantityRequestPayload>,
  _auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let line_id = path.into_inner();
  match app_state.cart.set_quantity(line_id, req_payload.quantity).await? {
    QuantityChange::Updated { quantity, .. } => Ok(HttpResponse::Ok().json(json!({
      "message": "Quantity updated.",
      "lineId": line_id,
      "quantity": quantity
    }))),
    QuantityChange::Removed { .. } => Ok(HttpResponse::Ok().json(json!({
      "message": "Item removed from cart.",
      "lineId": line_id
    }))),
  }
}

#[instrument(name = "handler::remove_cart_line", skip(app_state, _auth_user), fields(line_id = %path.as_ref()))]
pub async fn remove_cart_line_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  _auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let line_id = path.into_inner();
  app_state.cart.remove_line(line_id).await?;
  Ok(HttpResponse::Ok().json(json!({
    "message": "Item removed from cart.",
    "lineId": line_id
  })))
}
