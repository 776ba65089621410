// src/checkout/customer.rs

//! Customer identity resolution and the name-quality gate.
//!
//! Profile fields come from the users table, falling back to the identity
//! provider's metadata, falling back to empty strings. The gate rejecting
//! generic placeholder names is a business rule inherited from the
//! storefront and reproduced exactly.

use tracing::warn;

use crate::identity::CurrentUser;
use crate::models::CustomerInfo;
use crate::store::DataStore;

/// Names containing any of these (case-insensitive) are treated as absent
/// and routed to a re-prompt for a real name.
const GENERIC_NAMES: [&str; 5] = ["customer", "user", "placeholder", "test", "default"];

/// Minimum accepted length for a customer name, in characters.
pub const MIN_NAME_LEN: usize = 2;

/// True when the resolved name is usable on an order as-is.
pub fn acceptable_name(raw: &str) -> bool {
  let name = raw.trim();
  if name.chars().count() < MIN_NAME_LEN {
    return false;
  }
  let lower = name.to_lowercase();
  !GENERIC_NAMES.iter().any(|generic| lower.contains(generic))
}

/// Resolves the customer details for an order. Never fails: a profile
/// lookup error degrades to the identity metadata, and missing fields
/// degrade to empty strings.
pub(crate) async fn resolve_customer(store: &dyn DataStore, user: &CurrentUser) -> CustomerInfo {
  let profile = match store.find_user_profile(user.id).await {
    Ok(profile) => profile,
    Err(error) => {
      warn!(user_id = %user.id, %error, "profile lookup failed; falling back to identity metadata");
      None
    }
  };
  let meta = &user.metadata;
  match profile {
    Some(profile) => CustomerInfo {
      name: profile
        .full_name
        .or_else(|| meta.full_name.clone())
        .unwrap_or_default()
        .trim()
        .to_string(),
      email: profile.email.or_else(|| user.email.clone()).unwrap_or_default(),
      phone: profile.phone.or_else(|| meta.phone.clone()).unwrap_or_default(),
    },
    None => CustomerInfo {
      name: meta
        .full_name
        .clone()
        .or_else(|| meta.name.clone())
        .unwrap_or_default()
        .trim()
        .to_string(),
      email: user.email.clone().unwrap_or_default(),
      phone: meta.phone.clone().unwrap_or_default(),
    },
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_generic_placeholder_names_are_rejected() {
    for name in ["Customer", "user1", "a", "", "TEST123", "placeholder", "Default User"] {
      assert!(!acceptable_name(name), "expected {name:?} to be rejected");
    }
  }

  #[test]
  fn test_real_names_are_accepted() {
    for name in ["Maria Santos", "Juan Dela Cruz", "  Li Wei  ", "Ana"] {
      assert!(acceptable_name(name), "expected {name:?} to be accepted");
    }
  }

  #[test]
  fn test_whitespace_only_name_is_rejected() {
    assert!(!acceptable_name("   "));
  }

  #[test]
  fn test_substring_match_is_case_insensitive() {
    assert!(!acceptable_name("Valued CUSTOMER"));
    assert!(!acceptable_name("TestAccount"));
  }
}
