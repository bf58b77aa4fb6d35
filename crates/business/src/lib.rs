//! # VaultBank Business
//!
//! Business logic layer - authentication and ledger operations.

pub mod auth;
pub mod banking;
pub mod error;

pub use auth::{AuthService, MIN_PASSWORD_CHARS, MIN_PIN_DIGITS};
pub use banking::BankingService;
pub use error::{BusinessError, BusinessResult};
