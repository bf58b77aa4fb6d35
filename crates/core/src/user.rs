//! User - a credential record
//!
//! Holds only salted hashes, never raw secrets. The optional `customer_ref`
//! is a public-facing identifier that links several accounts (registered
//! under different usernames) to one customer.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A credential record. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Storage-assigned identifier
    pub id: i64,
    /// Unique login name
    pub username: String,
    /// Salted password hash (hex SHA-256)
    pub password_hash: String,
    /// Per-record password salt
    pub password_salt: String,
    /// Salted PIN hash (hex SHA-256, PIN namespace)
    pub pin_hash: String,
    /// Per-record PIN salt
    pub pin_salt: String,
    /// Public-facing customer reference (e.g. UID-1B2C3D4E), shared by
    /// records registered for the same customer
    pub customer_ref: Option<String>,
}

impl User {
    /// Generate a fresh customer reference: `UID-` plus 8 uppercase hex
    /// chars drawn from a v4 UUID.
    pub fn generate_customer_ref() -> String {
        let raw = Uuid::new_v4().simple().to_string();
        format!("UID-{}", raw[..8].to_uppercase())
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never render hashes or salts
        write!(f, "User {} ({})", self.id, self.username)
    }
}
