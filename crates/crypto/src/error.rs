//! Crypto errors

use thiserror::Error;

/// Errors from the crypto primitives
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Key size too small: {0} bits (minimum {1} bits)")]
    KeySizeTooSmall(usize, usize),

    #[error("Value out of range: operand has {value_bits} bits, modulus has {modulus_bits} bits")]
    ValueOutOfRange { value_bits: u64, modulus_bits: u64 },

    #[error("Plaintext too long: max {max} bytes, got {got} bytes")]
    PlaintextTooLong { max: usize, got: usize },

    #[error("Decrypted bytes are not valid UTF-8")]
    InvalidUtf8,

    #[error("Malformed ciphertext: {0}")]
    MalformedCiphertext(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Result type alias for crypto operations
pub type CryptoResult<T> = Result<T, CryptoError>;
