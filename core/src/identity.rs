// src/identity.rs

//! The opaque current-user identity handed in by the external identity
//! provider. Authentication itself is out of scope; the storefront only
//! ever sees the resolved user, or nothing.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Profile metadata attached to the identity by the provider. Used as the
/// fallback source for customer details when the users table has no row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserMetadata {
  pub full_name: Option<String>,
  pub name: Option<String>,
  pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
  pub id: Uuid,
  pub email: Option<String>,
  #[serde(default)]
  pub metadata: UserMetadata,
}

impl CurrentUser {
  pub fn new(id: Uuid) -> Self {
    CurrentUser {
      id,
      email: None,
      metadata: UserMetadata::default(),
    }
  }
}
