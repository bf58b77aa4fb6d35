//! Business layer errors
//!
//! Every caller-visible failure mode of the ledger and authentication
//! services gets its own variant so the CLI can render it precisely.

use rust_decimal::Decimal;
use thiserror::Error;

/// Business operation errors
#[derive(Debug, Error)]
pub enum BusinessError {
    // === Validation errors ===
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
    },

    #[error("Cannot transfer an account to itself")]
    SameAccountTransfer,

    // === Authentication errors ===
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Invalid PIN")]
    InvalidPin,

    #[error("Username already taken: {0}")]
    UsernameTaken(String),

    // === Not found errors ===
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Customer reference not found: {0}")]
    CustomerRefNotFound(String),

    // === Wrapped errors ===
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Persistence error: {0}")]
    Persistence(#[from] vaultbank_persistence::PersistenceError),

    #[error("Crypto error: {0}")]
    Crypto(#[from] vaultbank_crypto::CryptoError),

    #[error("Core error: {0}")]
    Core(#[from] vaultbank_core::CoreError),
}

/// Result type alias for business operations
pub type BusinessResult<T> = Result<T, BusinessError>;

impl BusinessError {
    /// Create an insufficient funds error
    pub fn insufficient_funds(required: Decimal, available: Decimal) -> Self {
        Self::InsufficientFunds {
            required,
            available,
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
