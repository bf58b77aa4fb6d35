//! Repository implementations for SQLite
//!
//! CRUD operations for users, accounts, the encrypted transaction trail,
//! and the persisted system key pair. Balance mutations take a
//! `&mut SqliteConnection` so they compose into the caller's transaction;
//! everything else runs against the pool.

use crate::error::{PersistenceError, PersistenceResult};
use crate::keyring::FieldCipher;
use crate::sqlite::schema::{AccountRow, SystemKeyRow, UserRow};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::str::FromStr;
use vaultbank_core::{LedgerEntry, User};
use vaultbank_crypto::RsaKeyPair;

/// Create a connection pool for an existing database.
pub async fn create_pool(db_url: &str) -> PersistenceResult<SqlitePool> {
    let pool = SqlitePool::connect(db_url).await?;
    Ok(pool)
}

/// Create the database file if missing and ensure the schema exists.
pub async fn init_database(db_url: &str) -> PersistenceResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(db_url)
        .map_err(sqlx::Error::from)?
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new().connect_with(options).await?;
    create_schema(&pool).await?;
    Ok(pool)
}

/// Create all tables. Safe to call at every startup.
pub async fn create_schema(pool: &SqlitePool) -> PersistenceResult<()> {
    sqlx::query(
        r#"
        -- Credential records: salted hashes only, never raw secrets
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            password_salt TEXT NOT NULL,
            pin_hash TEXT NOT NULL,
            pin_salt TEXT NOT NULL,
            customer_ref TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        -- Accounts: balance as TEXT decimal, mutated only inside a transaction
        CREATE TABLE IF NOT EXISTS accounts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            account_number TEXT NOT NULL UNIQUE,
            balance TEXT NOT NULL DEFAULT '0',
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (user_id) REFERENCES users(id)
        );

        -- Append-only transaction trail: all sensitive fields ciphertext
        CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            from_account_encrypted TEXT,
            to_account_encrypted TEXT,
            amount_encrypted TEXT NOT NULL,
            description_encrypted TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        -- System key pair, decimal-string encoded; key_name uniqueness
        -- makes concurrent first-use creation fail safely
        CREATE TABLE IF NOT EXISTS system_keys (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            key_name TEXT NOT NULL UNIQUE,
            modulus TEXT NOT NULL,
            public_exponent TEXT NOT NULL,
            private_exponent TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        CREATE INDEX IF NOT EXISTS idx_accounts_user ON accounts(user_id);
        CREATE INDEX IF NOT EXISTS idx_transactions_created ON transactions(created_at);
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

// ============================================================================
// User Repository
// ============================================================================

/// Fields for a new credential record
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub password_salt: String,
    pub pin_hash: String,
    pub pin_salt: String,
    pub customer_ref: Option<String>,
}

/// Repository for the `users` table
pub struct UserRepo;

impl UserRepo {
    /// Insert a new credential record, returning it with its assigned id.
    pub async fn insert(pool: &SqlitePool, new_user: &NewUser) -> PersistenceResult<User> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (username, password_hash, password_salt, pin_hash, pin_salt, customer_ref)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&new_user.username)
        .bind(&new_user.password_hash)
        .bind(&new_user.password_salt)
        .bind(&new_user.pin_hash)
        .bind(&new_user.pin_salt)
        .bind(&new_user.customer_ref)
        .execute(pool)
        .await
        .map_err(classify_unique)?;

        Ok(User {
            id: result.last_insert_rowid(),
            username: new_user.username.clone(),
            password_hash: new_user.password_hash.clone(),
            password_salt: new_user.password_salt.clone(),
            pin_hash: new_user.pin_hash.clone(),
            pin_salt: new_user.pin_salt.clone(),
            customer_ref: new_user.customer_ref.clone(),
        })
    }

    pub async fn find_by_username(
        pool: &SqlitePool,
        username: &str,
    ) -> PersistenceResult<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(pool)
            .await?;
        Ok(row)
    }

    pub async fn find_by_customer_ref(
        pool: &SqlitePool,
        customer_ref: &str,
    ) -> PersistenceResult<Option<UserRow>> {
        let row =
            sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE customer_ref = ? LIMIT 1")
                .bind(customer_ref)
                .fetch_optional(pool)
                .await?;
        Ok(row)
    }

    pub async fn get_by_id(pool: &SqlitePool, id: i64) -> PersistenceResult<UserRow> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| PersistenceError::not_found("User", id))
    }
}

// ============================================================================
// Account Repository
// ============================================================================

/// Repository for the `accounts` table
pub struct AccountRepo;

impl AccountRepo {
    /// Insert a new account with the given balance, returning its row.
    pub async fn insert(
        pool: &SqlitePool,
        user_id: i64,
        account_number: &str,
        balance: Decimal,
    ) -> PersistenceResult<AccountRow> {
        let result = sqlx::query(
            "INSERT INTO accounts (user_id, account_number, balance) VALUES (?, ?, ?)",
        )
        .bind(user_id)
        .bind(account_number)
        .bind(balance.to_string())
        .execute(pool)
        .await
        .map_err(classify_unique)?;

        Self::get_by_id(pool, result.last_insert_rowid()).await
    }

    pub async fn get_by_id(pool: &SqlitePool, id: i64) -> PersistenceResult<AccountRow> {
        sqlx::query_as::<_, AccountRow>("SELECT * FROM accounts WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| PersistenceError::not_found("Account", id))
    }

    pub async fn find_by_number(
        pool: &SqlitePool,
        account_number: &str,
    ) -> PersistenceResult<Option<AccountRow>> {
        let row = sqlx::query_as::<_, AccountRow>("SELECT * FROM accounts WHERE account_number = ?")
            .bind(account_number)
            .fetch_optional(pool)
            .await?;
        Ok(row)
    }

    pub async fn find_by_user(pool: &SqlitePool, user_id: i64) -> PersistenceResult<Vec<AccountRow>> {
        let rows = sqlx::query_as::<_, AccountRow>(
            "SELECT * FROM accounts WHERE user_id = ? ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn all_account_numbers(pool: &SqlitePool) -> PersistenceResult<Vec<String>> {
        let rows = sqlx::query("SELECT account_number FROM accounts ORDER BY account_number")
            .fetch_all(pool)
            .await?;
        Ok(rows
            .iter()
            .map(|row| row.get::<String, _>("account_number"))
            .collect())
    }

    /// Read an account inside the caller's transaction for mutation.
    ///
    /// SQLite serializes writers at the database level once the transaction
    /// writes, so the row is stable for the rest of the transaction. A
    /// storage engine with true row locks would add `FOR UPDATE` here.
    pub async fn lock_for_update(
        conn: &mut SqliteConnection,
        id: i64,
    ) -> PersistenceResult<Option<AccountRow>> {
        let row = sqlx::query_as::<_, AccountRow>("SELECT * FROM accounts WHERE id = ?")
            .bind(id)
            .fetch_optional(conn)
            .await?;
        Ok(row)
    }

    /// Overwrite the balance inside the caller's transaction.
    pub async fn update_balance(
        conn: &mut SqliteConnection,
        id: i64,
        new_balance: Decimal,
    ) -> PersistenceResult<()> {
        sqlx::query("UPDATE accounts SET balance = ? WHERE id = ?")
            .bind(new_balance.to_string())
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }
}

// ============================================================================
// Transaction Repository
// ============================================================================

/// Repository for the encrypted `transactions` trail.
///
/// Rows are mapped by hand: the encrypted columns are the source of truth,
/// but databases migrated in place from an unencrypted schema may still
/// carry plaintext `from_account_id` / `to_account_id` / `amount` /
/// `description` columns, which are read as a fallback only.
pub struct TransactionRepo;

impl TransactionRepo {
    /// Append one entry inside the caller's transaction, encrypting every
    /// sensitive field with the system key pair first.
    pub async fn insert(
        conn: &mut SqliteConnection,
        cipher: &FieldCipher,
        from_account_id: Option<i64>,
        to_account_id: Option<i64>,
        amount: Decimal,
        description: Option<&str>,
    ) -> PersistenceResult<()> {
        let from_encrypted = match from_account_id {
            Some(id) => Some(cipher.encrypt_text(&id.to_string())?),
            None => None,
        };
        let to_encrypted = match to_account_id {
            Some(id) => Some(cipher.encrypt_text(&id.to_string())?),
            None => None,
        };
        let amount_encrypted = cipher.encrypt_amount(amount)?;
        let description_encrypted = match description {
            Some(text) if !text.is_empty() => Some(cipher.encrypt_text(text)?),
            _ => None,
        };

        sqlx::query(
            r#"
            INSERT INTO transactions
                (from_account_encrypted, to_account_encrypted, amount_encrypted, description_encrypted)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(from_encrypted)
        .bind(to_encrypted)
        .bind(amount_encrypted)
        .bind(description_encrypted)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Decrypt the full trail, newest first.
    pub async fn find_all(
        pool: &SqlitePool,
        cipher: &FieldCipher,
    ) -> PersistenceResult<Vec<LedgerEntry>> {
        let rows = sqlx::query("SELECT * FROM transactions ORDER BY created_at DESC, id DESC")
            .fetch_all(pool)
            .await?;
        rows.iter().map(|row| Self::map_row(row, cipher)).collect()
    }

    /// History for one account. Source and destination are ciphertext, so
    /// this necessarily decrypts every entry and filters afterwards; the
    /// storage layer cannot index or filter on them.
    pub async fn find_by_account(
        pool: &SqlitePool,
        cipher: &FieldCipher,
        account_id: i64,
    ) -> PersistenceResult<Vec<LedgerEntry>> {
        let all = Self::find_all(pool, cipher).await?;
        Ok(all.into_iter().filter(|e| e.touches(account_id)).collect())
    }

    fn map_row(row: &SqliteRow, cipher: &FieldCipher) -> PersistenceResult<LedgerEntry> {
        let id: i64 = row.try_get("id")?;

        let from_account_id =
            Self::read_account_ref(row, cipher, id, "from_account_encrypted", "from_account_id")?;
        let to_account_id =
            Self::read_account_ref(row, cipher, id, "to_account_encrypted", "to_account_id")?;

        let amount = match non_empty(row.try_get("amount_encrypted")?) {
            Some(ciphertext) => cipher.decrypt_amount(&ciphertext)?,
            None => {
                // Legacy plaintext column, if the database has one
                let legacy: Option<String> = legacy_column(row, "amount");
                let text = legacy.ok_or_else(|| PersistenceError::CorruptEntry {
                    id,
                    detail: "no encrypted or plaintext amount".into(),
                })?;
                Decimal::from_str(&text).map_err(|_| PersistenceError::InvalidDecimal(text))?
            }
        };

        let description = match non_empty(row.try_get("description_encrypted")?) {
            Some(ciphertext) => Some(cipher.decrypt_text(&ciphertext)?),
            None => legacy_column(row, "description"),
        };

        let created_at: DateTime<Utc> = row.try_get("created_at")?;

        Ok(LedgerEntry {
            id,
            from_account_id,
            to_account_id,
            amount,
            description,
            created_at,
        })
    }

    fn read_account_ref(
        row: &SqliteRow,
        cipher: &FieldCipher,
        entry_id: i64,
        encrypted_column: &str,
        legacy_column_name: &str,
    ) -> PersistenceResult<Option<i64>> {
        match non_empty(row.try_get(encrypted_column)?) {
            Some(ciphertext) => {
                let plaintext = cipher.decrypt_text(&ciphertext)?;
                let id = plaintext
                    .parse::<i64>()
                    .map_err(|_| PersistenceError::CorruptEntry {
                        id: entry_id,
                        detail: format!("{encrypted_column} did not decrypt to an account id"),
                    })?;
                Ok(Some(id))
            }
            None => Ok(legacy_column(row, legacy_column_name)),
        }
    }
}

/// Read an optional column that may not exist in this database's schema.
/// A missing column is simply treated as absent.
fn legacy_column<T>(row: &SqliteRow, column: &str) -> Option<T>
where
    T: for<'r> sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get::<Option<T>, _>(column).ok().flatten()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

// ============================================================================
// System Key Repository
// ============================================================================

/// Repository for the `system_keys` table
pub struct SystemKeyRepo;

impl SystemKeyRepo {
    pub async fn find_by_name(
        pool: &SqlitePool,
        key_name: &str,
    ) -> PersistenceResult<Option<SystemKeyRow>> {
        let row = sqlx::query_as::<_, SystemKeyRow>("SELECT * FROM system_keys WHERE key_name = ?")
            .bind(key_name)
            .fetch_optional(pool)
            .await?;
        Ok(row)
    }

    /// Persist a key pair. A second inserter racing on the same name gets a
    /// `UniqueViolation` and should re-read instead of failing.
    pub async fn insert(
        pool: &SqlitePool,
        key_name: &str,
        pair: &RsaKeyPair,
    ) -> PersistenceResult<()> {
        sqlx::query(
            r#"
            INSERT INTO system_keys (key_name, modulus, public_exponent, private_exponent)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(key_name)
        .bind(pair.modulus.to_string())
        .bind(pair.public_exponent.to_string())
        .bind(pair.private_exponent.to_string())
        .execute(pool)
        .await
        .map_err(classify_unique)?;
        Ok(())
    }
}

/// Turn sqlx unique-constraint failures into `UniqueViolation`.
fn classify_unique(err: sqlx::Error) -> PersistenceError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            PersistenceError::UniqueViolation(db.message().to_string())
        }
        _ => PersistenceError::Database(err),
    }
}
