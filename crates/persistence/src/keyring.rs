//! Key custodian and field cipher
//!
//! The custodian owns the process-wide system key pair: it reads the
//! persisted pair on first use, generates and persists one when the table
//! is empty, and caches the result for the process lifetime. It is an
//! explicitly owned object handed to whoever encrypts, not a global.
//!
//! Creation is safe under concurrent first use: the `key_name` uniqueness
//! constraint makes the losing inserter's write fail with a unique
//! violation, after which it re-reads the winner's pair.

use crate::error::{PersistenceError, PersistenceResult};
use crate::sqlite::repos::SystemKeyRepo;
use num_bigint::BigUint;
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;
use vaultbank_crypto::{rsa, CryptoError, RsaKeyPair};

/// Logical name of the single system key pair.
pub const SYSTEM_KEY_NAME: &str = "SYSTEM_TRANSACTION_KEY";

/// Production modulus size.
pub const DEFAULT_KEY_BITS: usize = 2048;

/// Amounts render to well under 50 characters; anything longer is a bug.
const MAX_AMOUNT_CHARS: usize = 50;

/// Obtains, lazily creates, and caches the system key pair.
pub struct KeyCustodian {
    pool: SqlitePool,
    key_bits: usize,
    cached: OnceCell<Arc<RsaKeyPair>>,
}

impl KeyCustodian {
    /// Custodian with the production key size.
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_key_bits(pool, DEFAULT_KEY_BITS)
    }

    /// Custodian with an explicit key size. Tests use small (but still
    /// >= 512 bit) keys to keep generation fast.
    pub fn with_key_bits(pool: SqlitePool, key_bits: usize) -> Self {
        Self {
            pool,
            key_bits,
            cached: OnceCell::new(),
        }
    }

    /// Return the system key pair, creating and persisting it on first use.
    /// After the first successful call, storage is never touched again.
    pub async fn get_or_create(&self) -> PersistenceResult<Arc<RsaKeyPair>> {
        self.cached
            .get_or_try_init(|| self.load_or_generate())
            .await
            .cloned()
    }

    /// Field cipher bound to the system key pair.
    pub async fn field_cipher(&self) -> PersistenceResult<FieldCipher> {
        Ok(FieldCipher::new(self.get_or_create().await?))
    }

    async fn load_or_generate(&self) -> PersistenceResult<Arc<RsaKeyPair>> {
        if let Some(row) = SystemKeyRepo::find_by_name(&self.pool, SYSTEM_KEY_NAME).await? {
            return row.into_key_pair().map(Arc::new);
        }

        info!(bits = self.key_bits, "generating system key pair; first startup may take a while");
        let bits = self.key_bits;
        let pair = tokio::task::spawn_blocking(move || rsa::generate_key_pair(bits))
            .await
            .map_err(|e| PersistenceError::Other(format!("key generation task failed: {e}")))??;

        match SystemKeyRepo::insert(&self.pool, SYSTEM_KEY_NAME, &pair).await {
            Ok(()) => {
                info!("system key pair generated and stored");
                Ok(Arc::new(pair))
            }
            Err(err) if err.is_unique_violation() => {
                // Lost the creation race; the persisted pair wins.
                let row = SystemKeyRepo::find_by_name(&self.pool, SYSTEM_KEY_NAME)
                    .await?
                    .ok_or_else(|| PersistenceError::not_found("SystemKey", SYSTEM_KEY_NAME))?;
                row.into_key_pair().map(Arc::new)
            }
            Err(err) => Err(err),
        }
    }
}

/// Encrypts and decrypts individual ledger fields with the system key pair.
///
/// Ciphertexts are the decimal rendering of the RSA integer. The transform
/// is unpadded and deterministic; the ledger depends on that for exact
/// round-trips.
#[derive(Clone)]
pub struct FieldCipher {
    keys: Arc<RsaKeyPair>,
}

impl FieldCipher {
    pub fn new(keys: Arc<RsaKeyPair>) -> Self {
        Self { keys }
    }

    /// Per-field plaintext byte budget for the bound key.
    pub fn max_plaintext_bytes(&self) -> usize {
        self.keys.max_plaintext_bytes()
    }

    /// Encrypt a non-empty string to a decimal ciphertext.
    pub fn encrypt_text(&self, plaintext: &str) -> PersistenceResult<String> {
        let max = self.max_plaintext_bytes();
        let got = plaintext.len();
        if got > max {
            return Err(CryptoError::PlaintextTooLong { max, got }.into());
        }
        let m = rsa::text_to_number(plaintext);
        let c = rsa::encrypt(&m, &self.keys.public_exponent, &self.keys.modulus)?;
        Ok(c.to_string())
    }

    /// Decrypt a decimal ciphertext back to the original string.
    pub fn decrypt_text(&self, ciphertext: &str) -> PersistenceResult<String> {
        let c = BigUint::from_str(ciphertext)
            .map_err(|e| CryptoError::MalformedCiphertext(e.to_string()))?;
        let m = rsa::decrypt(&c, &self.keys.private_exponent, &self.keys.modulus)?;
        Ok(rsa::number_to_text(&m)?)
    }

    /// Encrypt an amount via its plain decimal rendering.
    pub fn encrypt_amount(&self, amount: Decimal) -> PersistenceResult<String> {
        let rendered = amount.to_string();
        if rendered.len() > MAX_AMOUNT_CHARS {
            return Err(CryptoError::PlaintextTooLong {
                max: MAX_AMOUNT_CHARS,
                got: rendered.len(),
            }
            .into());
        }
        self.encrypt_text(&rendered)
    }

    /// Decrypt an amount ciphertext back to a decimal.
    pub fn decrypt_amount(&self, ciphertext: &str) -> PersistenceResult<Decimal> {
        let rendered = self.decrypt_text(ciphertext)?;
        Decimal::from_str(&rendered).map_err(|_| PersistenceError::InvalidDecimal(rendered))
    }
}
