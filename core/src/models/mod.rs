// src/models/mod.rs

//! Data structures representing the storefront's database entities.

pub mod cart_line;
pub mod customer;
pub mod order;
pub mod order_line;
pub mod product;

// Re-export the model structs for convenient access
pub use cart_line::{CartLine, CartLineView};
pub use customer::{CustomerInfo, UserProfile};
pub use order::{Order, OrderStatus, PaymentStatus};
pub use order_line::OrderLine;
pub use product::Product;
