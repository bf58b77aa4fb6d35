//! Authentication - registration and credential checks
//!
//! AuthService owns the credential lifecycle: registration with salted
//! hashes, login, and PIN/password verification for sensitive operations.
//! Raw secrets never reach storage and never appear in errors or logs.

use crate::error::{BusinessError, BusinessResult};
use sqlx::SqlitePool;
use tracing::info;
use vaultbank_core::User;
use vaultbank_crypto::{
    generate_salt, hash_password, hash_pin, verify_password, verify_pin, SALT_LENGTH,
};
use vaultbank_persistence::{NewUser, UserRepo};

/// Minimum password length in characters
pub const MIN_PASSWORD_CHARS: usize = 8;

/// Minimum PIN length in digits
pub const MIN_PIN_DIGITS: usize = 4;

/// Authentication service over the credential store
pub struct AuthService {
    pool: SqlitePool,
}

impl AuthService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Register a new user with a fresh salt per secret.
    ///
    /// When `customer_ref` is given it must belong to an existing user, and
    /// the new record is linked to that customer; otherwise a fresh
    /// `UID-XXXXXXXX` reference is generated.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        pin: &str,
        customer_ref: Option<&str>,
    ) -> BusinessResult<User> {
        let username = username.trim();
        if username.is_empty() {
            return Err(BusinessError::validation("username must not be blank"));
        }
        if password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(BusinessError::validation(format!(
                "password must be at least {MIN_PASSWORD_CHARS} characters"
            )));
        }
        if pin.len() < MIN_PIN_DIGITS || !pin.chars().all(|c| c.is_ascii_digit()) {
            return Err(BusinessError::validation(format!(
                "PIN must be at least {MIN_PIN_DIGITS} digits"
            )));
        }

        let customer_ref = match customer_ref {
            Some(reference) => {
                UserRepo::find_by_customer_ref(&self.pool, reference)
                    .await?
                    .ok_or_else(|| BusinessError::CustomerRefNotFound(reference.to_string()))?;
                reference.to_string()
            }
            None => User::generate_customer_ref(),
        };

        let password_salt = generate_salt(SALT_LENGTH);
        let pin_salt = generate_salt(SALT_LENGTH);
        let new_user = NewUser {
            username: username.to_string(),
            password_hash: hash_password(password, &password_salt)?,
            password_salt,
            pin_hash: hash_pin(pin, &pin_salt)?,
            pin_salt,
            customer_ref: Some(customer_ref),
        };

        let user = UserRepo::insert(&self.pool, &new_user).await.map_err(|err| {
            if err.is_unique_violation() {
                BusinessError::UsernameTaken(username.to_string())
            } else {
                err.into()
            }
        })?;

        info!(user_id = user.id, username, "user registered");
        Ok(user)
    }

    /// Check a username/password pair. `None` on unknown username or wrong
    /// password; the two cases are indistinguishable to the caller.
    pub async fn login(&self, username: &str, password: &str) -> BusinessResult<Option<User>> {
        let Some(row) = UserRepo::find_by_username(&self.pool, username).await? else {
            return Ok(None);
        };
        let user = row.into_user();
        if verify_password(password, &user.password_salt, &user.password_hash)? {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    /// Verify a password for an already-loaded user.
    pub fn verify_password(&self, user: &User, password: &str) -> BusinessResult<bool> {
        Ok(verify_password(password, &user.password_salt, &user.password_hash)?)
    }

    /// Verify a transaction PIN for an already-loaded user.
    pub fn verify_pin(&self, user: &User, pin: &str) -> BusinessResult<bool> {
        Ok(verify_pin(pin, &user.pin_salt, &user.pin_hash)?)
    }
}
