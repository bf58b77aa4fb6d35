//! Core domain errors

use rust_decimal::Decimal;
use thiserror::Error;

/// Core domain errors - business rules only, no infrastructure concerns.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Amount must be at least {minimum}: got {amount}")]
    AmountTooSmall { amount: Decimal, minimum: Decimal },

    #[error("Amount cannot exceed {maximum}: got {amount}")]
    AmountTooLarge { amount: Decimal, maximum: Decimal },

    #[error("Amount cannot have more than 2 decimal places: got {0}")]
    TooManyDecimalPlaces(Decimal),
}

/// Result type alias with CoreError
pub type CoreResult<T> = Result<T, CoreError>;
