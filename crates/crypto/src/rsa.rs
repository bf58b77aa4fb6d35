//! Textbook RSA over arbitrary-precision integers
//!
//! Key generation, modular-exponentiation encrypt/decrypt, and helpers for
//! mapping UTF-8 text to integers. This is the unpadded, deterministic
//! transform: callers must keep plaintext integers strictly below the
//! modulus, which bounds the usable plaintext to roughly
//! `key_bits / 8 - 11` bytes. It is NOT a production-grade padded scheme.

use crate::error::{CryptoError, CryptoResult};
use crate::prime;
use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{One, Signed, Zero};

/// Absolute floor for key sizes. 512 bits is already far too small for real
/// security; 2048 is the production size used by the key custodian.
pub const MIN_KEY_BITS: usize = 512;

/// Standard public exponent (F4).
const PUBLIC_EXPONENT: u32 = 65537;

/// An RSA key pair: modulus and both exponents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaKeyPair {
    pub modulus: BigUint,
    pub public_exponent: BigUint,
    pub private_exponent: BigUint,
}

impl RsaKeyPair {
    /// Conservative upper bound on the plaintext byte length this key can
    /// encrypt without the integer reaching the modulus.
    pub fn max_plaintext_bytes(&self) -> usize {
        (self.modulus.bits() as usize / 8).saturating_sub(11)
    }
}

/// Generate an RSA key pair with the given modulus size in bits.
///
/// Draws two independent probable primes of `bits / 2` bits each. If the
/// fixed public exponent is not coprime with Euler's totient, both primes
/// are resampled.
pub fn generate_key_pair(bits: usize) -> CryptoResult<RsaKeyPair> {
    if bits < MIN_KEY_BITS {
        return Err(CryptoError::KeySizeTooSmall(bits, MIN_KEY_BITS));
    }

    let e = BigUint::from(PUBLIC_EXPONENT);
    let prime_bits = bits / 2;

    loop {
        let p = prime::random_prime(prime_bits);
        let q = prime::random_prime(prime_bits);
        if p == q {
            continue;
        }

        let n = &p * &q;
        let phi = (&p - BigUint::one()) * (&q - BigUint::one());

        if phi.gcd(&e) != BigUint::one() {
            continue;
        }

        // gcd(e, phi) == 1, so the inverse exists
        let d = mod_inverse(&e, &phi).expect("e is coprime with phi");

        return Ok(RsaKeyPair {
            modulus: n,
            public_exponent: e,
            private_exponent: d,
        });
    }
}

/// `plaintext ^ e mod n`. Fails when the plaintext integer is not strictly
/// below the modulus.
pub fn encrypt(plaintext: &BigUint, public_exponent: &BigUint, modulus: &BigUint) -> CryptoResult<BigUint> {
    check_range(plaintext, modulus)?;
    Ok(plaintext.modpow(public_exponent, modulus))
}

/// `ciphertext ^ d mod n`. Fails when the ciphertext integer is not strictly
/// below the modulus.
pub fn decrypt(ciphertext: &BigUint, private_exponent: &BigUint, modulus: &BigUint) -> CryptoResult<BigUint> {
    check_range(ciphertext, modulus)?;
    Ok(ciphertext.modpow(private_exponent, modulus))
}

fn check_range(value: &BigUint, modulus: &BigUint) -> CryptoResult<()> {
    if value >= modulus {
        return Err(CryptoError::ValueOutOfRange {
            value_bits: value.bits(),
            modulus_bits: modulus.bits(),
        });
    }
    Ok(())
}

/// Interpret a UTF-8 string as a non-negative big-endian integer.
pub fn text_to_number(text: &str) -> BigUint {
    BigUint::from_bytes_be(text.as_bytes())
}

/// Reverse of [`text_to_number`]. Fails when the bytes are not valid UTF-8
/// (e.g. a ciphertext decrypted with the wrong key).
pub fn number_to_text(number: &BigUint) -> CryptoResult<String> {
    let bytes = number.to_bytes_be();
    String::from_utf8(bytes).map_err(|_| CryptoError::InvalidUtf8)
}

/// Modular inverse via the extended Euclidean algorithm.
fn mod_inverse(a: &BigUint, m: &BigUint) -> Option<BigUint> {
    let a = BigInt::from(a.clone());
    let m = BigInt::from(m.clone());

    let (mut r0, mut r1) = (m.clone(), a);
    let (mut t0, mut t1) = (BigInt::zero(), BigInt::one());

    while !r1.is_zero() {
        let q = &r0 / &r1;
        let r2 = &r0 - &q * &r1;
        let t2 = &t0 - &q * &t1;
        r0 = r1;
        r1 = r2;
        t0 = t1;
        t1 = t2;
    }

    if !r0.is_one() {
        return None;
    }

    let mut t = t0 % &m;
    if t.is_negative() {
        t += &m;
    }
    t.to_biguint()
}

#[cfg(test)]
mod tests {
    use super::*;

    // 512-bit keys keep the tests fast; key generation is the slow part.
    const TEST_KEY_BITS: usize = 512;

    #[test]
    fn test_key_size_floor() {
        assert!(matches!(
            generate_key_pair(256),
            Err(CryptoError::KeySizeTooSmall(256, MIN_KEY_BITS))
        ));
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip_int() {
        let pair = generate_key_pair(TEST_KEY_BITS).unwrap();
        let m = BigUint::from(123_456_789u64);
        let c = encrypt(&m, &pair.public_exponent, &pair.modulus).unwrap();
        assert_ne!(c, m);
        let back = decrypt(&c, &pair.private_exponent, &pair.modulus).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip_text() {
        let pair = generate_key_pair(TEST_KEY_BITS).unwrap();
        let plaintext = "transfer 50.00 to ACC-1B2C3D4E";
        let m = text_to_number(plaintext);
        let c = encrypt(&m, &pair.public_exponent, &pair.modulus).unwrap();
        let back = decrypt(&c, &pair.private_exponent, &pair.modulus).unwrap();
        assert_eq!(number_to_text(&back).unwrap(), plaintext);
    }

    #[test]
    fn test_operand_out_of_range_rejected() {
        let pair = generate_key_pair(TEST_KEY_BITS).unwrap();
        let too_big = pair.modulus.clone();
        assert!(matches!(
            encrypt(&too_big, &pair.public_exponent, &pair.modulus),
            Err(CryptoError::ValueOutOfRange { .. })
        ));
        assert!(matches!(
            decrypt(&too_big, &pair.private_exponent, &pair.modulus),
            Err(CryptoError::ValueOutOfRange { .. })
        ));
    }

    #[test]
    fn test_distinct_key_pairs() {
        let a = generate_key_pair(TEST_KEY_BITS).unwrap();
        let b = generate_key_pair(TEST_KEY_BITS).unwrap();
        assert_ne!(a.modulus, b.modulus);
    }

    #[test]
    fn test_max_plaintext_bytes() {
        let pair = generate_key_pair(TEST_KEY_BITS).unwrap();
        // 512-bit modulus: 64 bytes raw, 53 after the conservative margin
        assert_eq!(pair.max_plaintext_bytes(), 53);
    }

    #[test]
    fn test_mod_inverse() {
        // 3 * 7 = 21 = 1 mod 20
        let inv = mod_inverse(&BigUint::from(3u32), &BigUint::from(20u32)).unwrap();
        assert_eq!(inv, BigUint::from(7u32));
        // 2 has no inverse mod 4
        assert!(mod_inverse(&BigUint::from(2u32), &BigUint::from(4u32)).is_none());
    }
}
