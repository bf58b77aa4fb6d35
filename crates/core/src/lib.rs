//! VaultBank Core - Domain types
//!
//! This crate contains the fundamental types used across VaultBank:
//! - `Account`: a balance-carrying account owned by a user
//! - `User`: a credential record (salted hashes only, never raw secrets)
//! - `LedgerEntry`: one immutable record of money movement
//! - amount validation and memo sanitation rules shared by all ledger
//!   operations

pub mod account;
pub mod amount;
pub mod error;
pub mod transaction;
pub mod user;

pub use account::Account;
pub use amount::{validate_transaction_amount, MAX_DESCRIPTION_CHARS};
pub use error::{CoreError, CoreResult};
pub use transaction::{sanitize_description, EntryKind, LedgerEntry};
pub use user::User;
