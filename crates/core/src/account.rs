//! Account - a balance-carrying bank account owned by a user

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A bank account.
///
/// The balance is a scale-2 decimal and is never negative: it is only
/// mutated inside a locked, committed ledger operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Storage-assigned identifier
    pub id: i64,
    /// Owning credential record
    pub user_id: i64,
    /// Unique public account number (e.g. ACC-1B2C3D4E)
    pub account_number: String,
    /// Current balance, always >= 0
    pub balance: Decimal,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Generate a fresh account number: `ACC-` plus 8 uppercase hex chars
    /// drawn from a v4 UUID.
    pub fn generate_account_number() -> String {
        let raw = Uuid::new_v4().simple().to_string();
        format!("ACC-{}", raw[..8].to_uppercase())
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (balance: {})", self.account_number, self.balance)
    }
}
