//! Salted credential hashing for passwords and transaction PINs
//!
//! Two independent secret namespaces share the SHA-256 primitive. The PIN
//! namespace mixes a fixed `PIN:` prefix into the hashed string, so a PIN
//! hash can never collide with a password hash even under identical salts.

use crate::error::{CryptoError, CryptoResult};
use crate::sha256;
use rand::rngs::OsRng;
use rand::Rng;

/// Salt length used for credential records.
pub const SALT_LENGTH: usize = 16;

const SALT_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate a random alphanumeric salt from the OS random source.
pub fn generate_salt(length: usize) -> String {
    let mut rng = OsRng;
    (0..length)
        .map(|_| SALT_CHARS[rng.gen_range(0..SALT_CHARS.len())] as char)
        .collect()
}

/// Salted password hash: hex SHA-256 of `"{salt}:{password}"`.
pub fn hash_password(password: &str, salt: &str) -> CryptoResult<String> {
    require_non_empty(password, "password")?;
    require_non_empty(salt, "salt")?;
    Ok(sha256::hex_digest(&format!("{salt}:{password}")))
}

/// Verify a password against a stored salted hash.
pub fn verify_password(password: &str, salt: &str, expected_hash: &str) -> CryptoResult<bool> {
    let actual = hash_password(password, salt)?;
    Ok(constant_time_eq(expected_hash, &actual))
}

/// Salted PIN hash: hex SHA-256 of `"PIN:{salt}:{pin}"`.
pub fn hash_pin(pin: &str, salt: &str) -> CryptoResult<String> {
    require_non_empty(pin, "pin")?;
    require_non_empty(salt, "salt")?;
    Ok(sha256::hex_digest(&format!("PIN:{salt}:{pin}")))
}

/// Verify a PIN against a stored salted hash.
pub fn verify_pin(pin: &str, salt: &str, expected_hash: &str) -> CryptoResult<bool> {
    let actual = hash_pin(pin, salt)?;
    Ok(constant_time_eq(expected_hash, &actual))
}

fn require_non_empty(value: &str, name: &str) -> CryptoResult<()> {
    if value.is_empty() {
        return Err(CryptoError::InvalidArgument(format!("{name} must not be empty")));
    }
    Ok(())
}

/// Constant-time comparison over all byte positions. Only the length check
/// short-circuits.
fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
