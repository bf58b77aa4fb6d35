//! Database schema definitions
//!
//! Row types for sqlx mapping from SQLite tables. Balances and key material
//! are stored as TEXT and converted at the edge. The `transactions` table
//! has no row type here: its columns vary between the encrypted schema and
//! legacy plaintext databases, so the repo maps it by hand.

use crate::error::{PersistenceError, PersistenceResult};
use chrono::{DateTime, Utc};
use num_bigint::BigUint;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use vaultbank_core::{Account, User};
use vaultbank_crypto::RsaKeyPair;

/// Row type for the `users` table
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub password_salt: String,
    pub pin_hash: String,
    pub pin_salt: String,
    pub customer_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UserRow {
    pub fn into_user(self) -> User {
        User {
            id: self.id,
            username: self.username,
            password_hash: self.password_hash,
            password_salt: self.password_salt,
            pin_hash: self.pin_hash,
            pin_salt: self.pin_salt,
            customer_ref: self.customer_ref,
        }
    }
}

/// Row type for the `accounts` table
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct AccountRow {
    pub id: i64,
    pub user_id: i64,
    pub account_number: String,
    /// Decimal stored as TEXT
    pub balance: String,
    pub created_at: DateTime<Utc>,
}

impl AccountRow {
    /// Parse the TEXT balance column
    pub fn balance(&self) -> PersistenceResult<Decimal> {
        Decimal::from_str(&self.balance)
            .map_err(|_| PersistenceError::InvalidDecimal(self.balance.clone()))
    }

    pub fn into_account(self) -> PersistenceResult<Account> {
        let balance = self.balance()?;
        Ok(Account {
            id: self.id,
            user_id: self.user_id,
            account_number: self.account_number,
            balance,
            created_at: self.created_at,
        })
    }
}

/// Row type for the `system_keys` table (decimal-string encoded integers)
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SystemKeyRow {
    pub id: i64,
    pub key_name: String,
    pub modulus: String,
    pub public_exponent: String,
    pub private_exponent: String,
    pub created_at: DateTime<Utc>,
}

impl SystemKeyRow {
    pub fn into_key_pair(self) -> PersistenceResult<RsaKeyPair> {
        let parse = |field: &str, value: &str| {
            BigUint::from_str(value).map_err(|e| PersistenceError::InvalidKeyMaterial {
                key_name: self.key_name.clone(),
                detail: format!("{field}: {e}"),
            })
        };
        Ok(RsaKeyPair {
            modulus: parse("modulus", &self.modulus)?,
            public_exponent: parse("public_exponent", &self.public_exponent)?,
            private_exponent: parse("private_exponent", &self.private_exponent)?,
        })
    }
}
