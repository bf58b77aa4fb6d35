//! VaultBank Crypto - Primitives implemented from first principles
//!
//! This crate deliberately avoids platform crypto libraries. Both primitives
//! are implemented at the bit level:
//! - `sha256`: the SHA-256 compression function, used for salted credentials
//! - `rsa`: textbook (unpadded) RSA over `num_bigint::BigUint`, used to
//!   encrypt ledger fields at rest
//! - `secrets`: salted hashing and constant-time verification for passwords
//!   and transaction PINs
//!
//! None of this is production-grade cryptography. The RSA transform is
//! unpadded and deterministic, which is exactly what the ledger relies on
//! for round-trip exactness, and exactly what a real deployment would have
//! to replace with a padded, authenticated scheme.

pub mod error;
pub mod prime;
pub mod rsa;
pub mod secrets;
pub mod sha256;

pub use error::{CryptoError, CryptoResult};
pub use rsa::{generate_key_pair, RsaKeyPair, MIN_KEY_BITS};
pub use secrets::{
    generate_salt, hash_password, hash_pin, verify_password, verify_pin, SALT_LENGTH,
};
pub use sha256::{digest, hex_digest};
