//! Transaction amount rules
//!
//! The bounds exist for more than taste: the plaintext rendering of an
//! amount must stay within the field cipher's per-value byte budget, so the
//! ledger rejects anything outside [0.01, 1,000,000.00] or with more than
//! two decimal digits before any storage write happens.

use crate::error::{CoreError, CoreResult};
use rust_decimal::Decimal;

/// Maximum memo length in characters, kept under the cipher's per-field
/// byte budget at the production key size.
pub const MAX_DESCRIPTION_CHARS: usize = 200;

/// Smallest accepted transaction amount: 0.01
pub fn min_transaction_amount() -> Decimal {
    Decimal::new(1, 2)
}

/// Largest accepted transaction amount: 1,000,000.00
pub fn max_transaction_amount() -> Decimal {
    Decimal::new(100_000_000, 2)
}

/// Validate an amount for deposit, withdraw, or transfer.
///
/// Rejects values below 0.01, above 1,000,000.00, and values carrying more
/// than two decimal digits of precision (trailing zeros are not precision).
pub fn validate_transaction_amount(amount: Decimal) -> CoreResult<()> {
    let minimum = min_transaction_amount();
    if amount < minimum {
        return Err(CoreError::AmountTooSmall { amount, minimum });
    }

    let maximum = max_transaction_amount();
    if amount > maximum {
        return Err(CoreError::AmountTooLarge { amount, maximum });
    }

    if amount.normalize().scale() > 2 {
        return Err(CoreError::TooManyDecimalPlaces(amount));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_valid_amounts() {
        for amount in [dec!(0.01), dec!(1), dec!(100.50), dec!(999999.99), dec!(1000000.00)] {
            assert!(validate_transaction_amount(amount).is_ok(), "{amount}");
        }
    }

    #[test]
    fn test_zero_and_negative_rejected() {
        assert!(matches!(
            validate_transaction_amount(dec!(0.00)),
            Err(CoreError::AmountTooSmall { .. })
        ));
        assert!(matches!(
            validate_transaction_amount(dec!(-5)),
            Err(CoreError::AmountTooSmall { .. })
        ));
    }

    #[test]
    fn test_maximum_enforced() {
        assert!(matches!(
            validate_transaction_amount(dec!(1000000.01)),
            Err(CoreError::AmountTooLarge { .. })
        ));
    }

    #[test]
    fn test_three_decimals_rejected() {
        assert!(matches!(
            validate_transaction_amount(dec!(1.005)),
            Err(CoreError::TooManyDecimalPlaces(_))
        ));
    }

    #[test]
    fn test_trailing_zeros_accepted() {
        // 1.0050 normalizes to 1.005 (rejected); 1.500 normalizes to 1.5 (fine)
        assert!(validate_transaction_amount(dec!(1.500)).is_ok());
        assert!(validate_transaction_amount(dec!(1.0050)).is_err());
    }
}
