// src/state.rs
use crate::config::AppConfig;
use poolside_core::{CartService, CheckoutService, DataStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub store: Arc<dyn DataStore>,
  pub cart: Arc<CartService>,
  pub checkout: Arc<CheckoutService>,
  pub config: Arc<AppConfig>, // Share loaded config
}

impl AppState {
  pub fn new(store: Arc<dyn DataStore>, config: Arc<AppConfig>) -> Self {
    AppState {
      cart: Arc::new(CartService::new(store.clone())),
      checkout: Arc::new(CheckoutService::new(store.clone())),
      store,
      config,
    }
  }
}
