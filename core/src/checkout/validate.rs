// src/checkout/validate.rs

//! Pre-checkout stock validation. Hard stops (out of stock, requested
//! above available) refuse the whole checkout with the complete list of
//! offending lines; low stock is a non-blocking warning the caller may
//! acknowledge and proceed past.

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::models::CartLineView;
use crate::store::StockLevel;

/// Below this many remaining units a product is flagged as running low.
pub const LOW_STOCK_THRESHOLD: i64 = 5;

/// One cart line that cannot be fulfilled at current stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockIssue {
  pub product_id: Uuid,
  pub name: String,
  pub available: i64,
  pub requested: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockWarning {
  pub product_id: Uuid,
  pub name: String,
  pub remaining: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StockReport {
  pub blocking: Vec<StockIssue>,
  pub low_stock: Vec<StockWarning>,
}

impl StockReport {
  pub fn is_clear(&self) -> bool {
    self.blocking.is_empty()
  }
}

/// Classifies every cart line against the live stock snapshot. A product
/// missing from the snapshot counts as out of stock.
pub fn classify(lines: &[CartLineView], live: &HashMap<Uuid, StockLevel>) -> StockReport {
  let mut report = StockReport::default();
  for line in lines {
    let stock = live.get(&line.product_id).map(|l| l.stock).unwrap_or(0);
    if stock == 0 || line.quantity > stock {
      report.blocking.push(StockIssue {
        product_id: line.product_id,
        name: line.name.clone(),
        available: stock,
        requested: line.quantity,
      });
    } else if stock < LOW_STOCK_THRESHOLD {
      report.low_stock.push(StockWarning {
        product_id: line.product_id,
        name: line.name.clone(),
        remaining: stock,
      });
    }
  }
  report
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Utc;

  fn view(product_id: Uuid, name: &str, quantity: i64, denormalized_stock: i64) -> CartLineView {
    CartLineView {
      id: Uuid::new_v4(),
      user_id: Uuid::new_v4(),
      product_id,
      quantity,
      added_at: Utc::now(),
      name: name.to_string(),
      price_cents: 10_000,
      description: None,
      category_id: None,
      image_url: None,
      stock: denormalized_stock,
    }
  }

  fn live(entries: &[(Uuid, &str, i64)]) -> HashMap<Uuid, StockLevel> {
    entries
      .iter()
      .map(|(id, name, stock)| {
        (
          *id,
          StockLevel {
            stock: *stock,
            name: name.to_string(),
          },
        )
      })
      .collect()
  }

  #[test]
  fn test_over_requested_line_is_blocking_with_amounts() {
    let pid = Uuid::new_v4();
    let report = classify(&[view(pid, "Chlorine Tabs", 3, 1)], &live(&[(pid, "Chlorine Tabs", 1)]));
    assert_eq!(report.blocking.len(), 1);
    assert_eq!(report.blocking[0].available, 1);
    assert_eq!(report.blocking[0].requested, 3);
    assert!(report.low_stock.is_empty());
  }

  #[test]
  fn test_out_of_stock_is_blocking_even_for_quantity_zero_stock() {
    let pid = Uuid::new_v4();
    let report = classify(&[view(pid, "Pool Net", 1, 4)], &live(&[(pid, "Pool Net", 0)]));
    assert_eq!(report.blocking.len(), 1);
    assert_eq!(report.blocking[0].available, 0);
  }

  #[test]
  fn test_all_offending_lines_are_reported_not_just_the_first() {
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let c = Uuid::new_v4();
    let report = classify(
      &[view(a, "A", 5, 9), view(b, "B", 2, 9), view(c, "C", 1, 9)],
      &live(&[(a, "A", 1), (b, "B", 0), (c, "C", 10)]),
    );
    assert_eq!(report.blocking.len(), 2);
  }

  #[test]
  fn test_low_stock_is_a_warning_not_a_block() {
    let pid = Uuid::new_v4();
    let report = classify(&[view(pid, "Algaecide", 2, 4)], &live(&[(pid, "Algaecide", 4)]));
    assert!(report.is_clear());
    assert_eq!(report.low_stock.len(), 1);
    assert_eq!(report.low_stock[0].remaining, 4);
  }

  #[test]
  fn test_product_missing_from_snapshot_counts_as_out_of_stock() {
    let pid = Uuid::new_v4();
    let report = classify(&[view(pid, "Ghost", 1, 7)], &HashMap::new());
    assert_eq!(report.blocking.len(), 1);
    assert_eq!(report.blocking[0].available, 0);
  }
}
