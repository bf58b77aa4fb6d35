//! Probable-prime generation for RSA key material
//!
//! Candidates are drawn from the OS random source, screened by trial
//! division against small primes, then subjected to Miller-Rabin with
//! random bases.

use num_bigint::{BigUint, RandBigInt};
use num_traits::{One, Zero};
use rand::rngs::OsRng;
use rand::RngCore;

/// Miller-Rabin rounds. 40 rounds puts the error probability below 2^-80.
const MILLER_RABIN_ROUNDS: u32 = 40;

/// Small primes used to cheaply reject most candidates before Miller-Rabin.
const SMALL_PRIMES: [u32; 46] = [
    3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89, 97,
    101, 103, 107, 109, 113, 127, 131, 137, 139, 149, 151, 157, 163, 167, 173, 179, 181, 191, 193,
    197, 199, 211,
];

/// Generate a random probable prime of exactly `bits` bits.
///
/// The top bit is always set so the product of two such primes has the
/// intended modulus size.
pub fn random_prime(bits: usize) -> BigUint {
    assert!(bits >= 16, "prime size too small to be meaningful");
    loop {
        let candidate = random_candidate(bits);
        if is_probable_prime(&candidate, MILLER_RABIN_ROUNDS) {
            return candidate;
        }
    }
}

/// Random odd integer of exactly `bits` bits with the top bit set.
fn random_candidate(bits: usize) -> BigUint {
    let byte_len = bits.div_ceil(8);
    let mut bytes = vec![0u8; byte_len];
    OsRng.fill_bytes(&mut bytes);

    let mut n = BigUint::from_bytes_be(&bytes);
    // Clamp to `bits` bits, then force the top and bottom bits on.
    n &= (BigUint::one() << bits) - BigUint::one();
    n |= BigUint::one() << (bits - 1);
    n |= BigUint::one();
    n
}

/// Miller-Rabin probabilistic primality test with random bases.
pub fn is_probable_prime(n: &BigUint, rounds: u32) -> bool {
    let one = BigUint::one();
    let two = &one + &one;
    let three = &two + &one;

    if *n < two {
        return false;
    }
    if *n == two || *n == three {
        return true;
    }
    if (n % &two).is_zero() {
        return false;
    }
    for p in SMALL_PRIMES {
        let p = BigUint::from(p);
        if *n == p {
            return true;
        }
        if (n % &p).is_zero() {
            return false;
        }
    }

    // Write n - 1 = d * 2^s with d odd
    let n_minus_1 = n - &one;
    let mut d = n_minus_1.clone();
    let mut s = 0u64;
    while (&d % &two).is_zero() {
        d >>= 1;
        s += 1;
    }

    let mut rng = OsRng;
    'witness: for _ in 0..rounds {
        let a = rng.gen_biguint_range(&two, &n_minus_1);
        let mut x = a.modpow(&d, n);
        if x == one || x == n_minus_1 {
            continue;
        }
        for _ in 0..s - 1 {
            x = x.modpow(&two, n);
            if x == n_minus_1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}
