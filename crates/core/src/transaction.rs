//! LedgerEntry - one immutable record of money movement
//!
//! The entry kind is encoded by which of the two account references is
//! present: destination-only for a deposit, source-only for a withdrawal,
//! both for a transfer. At rest all sensitive fields (accounts, amount,
//! memo) exist only as ciphertext; this type is the decrypted view.

use crate::amount::MAX_DESCRIPTION_CHARS;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of money movement, derived from which account references are set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Deposit,
    Withdrawal,
    Transfer,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntryKind::Deposit => "deposit",
            EntryKind::Withdrawal => "withdrawal",
            EntryKind::Transfer => "transfer",
        };
        write!(f, "{s}")
    }
}

/// One decrypted ledger entry. Append-only: created once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Storage-assigned identifier
    pub id: i64,
    /// Source account; absent for deposits
    pub from_account_id: Option<i64>,
    /// Destination account; absent for withdrawals
    pub to_account_id: Option<i64>,
    /// Moved amount, always positive
    pub amount: Decimal,
    /// Optional sanitized memo
    pub description: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Classify the entry. `None` only for a corrupted row with neither
    /// side present, which a committed write can never produce.
    pub fn kind(&self) -> Option<EntryKind> {
        match (self.from_account_id, self.to_account_id) {
            (None, Some(_)) => Some(EntryKind::Deposit),
            (Some(_), None) => Some(EntryKind::Withdrawal),
            (Some(_), Some(_)) => Some(EntryKind::Transfer),
            (None, None) => None,
        }
    }

    /// Whether this entry involves the given account on either side.
    pub fn touches(&self, account_id: i64) -> bool {
        self.from_account_id == Some(account_id) || self.to_account_id == Some(account_id)
    }
}

/// Sanitize a memo before encryption: strip `< > " ' ; \`, trim, and
/// silently truncate to [`MAX_DESCRIPTION_CHARS`] characters.
///
/// Returns `None` when nothing printable survives.
pub fn sanitize_description(description: &str) -> Option<String> {
    let cleaned: String = description
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | '"' | '\'' | ';' | '\\'))
        .collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_DESCRIPTION_CHARS).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn entry(from: Option<i64>, to: Option<i64>) -> LedgerEntry {
        LedgerEntry {
            id: 1,
            from_account_id: from,
            to_account_id: to,
            amount: dec!(100.00),
            description: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_kind_classification() {
        assert_eq!(entry(None, Some(2)).kind(), Some(EntryKind::Deposit));
        assert_eq!(entry(Some(1), None).kind(), Some(EntryKind::Withdrawal));
        assert_eq!(entry(Some(1), Some(2)).kind(), Some(EntryKind::Transfer));
        assert_eq!(entry(None, None).kind(), None);
    }

    #[test]
    fn test_touches() {
        let e = entry(Some(1), Some(2));
        assert!(e.touches(1));
        assert!(e.touches(2));
        assert!(!e.touches(3));
    }

    #[test]
    fn test_sanitize_strips_dangerous_chars() {
        assert_eq!(
            sanitize_description(r#"pay <b>rent</b>; DROP TABLE 'users' \ "now""#).as_deref(),
            Some("pay brent/b DROP TABLE users  now")
        );
    }

    #[test]
    fn test_sanitize_trims_and_drops_empty() {
        assert_eq!(sanitize_description("  hello  ").as_deref(), Some("hello"));
        assert_eq!(sanitize_description("  ;;  "), None);
        assert_eq!(sanitize_description(""), None);
    }

    #[test]
    fn test_sanitize_truncates_to_200_chars() {
        let long = "x".repeat(500);
        let sanitized = sanitize_description(&long).unwrap();
        assert_eq!(sanitized.chars().count(), 200);
    }
}
