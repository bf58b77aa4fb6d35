//! VaultBank Persistence - storage layer
//!
//! SQLite-backed repositories for users, accounts, and the encrypted
//! transaction trail, plus the key custodian that owns the system key
//! pair. Higher layers talk to the repos through a [`Database`] handle.

pub mod error;
pub mod keyring;
pub mod sqlite;

pub use error::{PersistenceError, PersistenceResult};
pub use keyring::{FieldCipher, KeyCustodian, DEFAULT_KEY_BITS, SYSTEM_KEY_NAME};
pub use sqlite::{
    create_pool, create_schema, init_database, AccountRepo, AccountRow, NewUser, SystemKeyRepo,
    SystemKeyRow, TransactionRepo, UserRepo, UserRow,
};

use sqlx::SqlitePool;

/// Handle to an open database.
#[derive(Clone)]
pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    /// Connect to an existing database file.
    pub async fn connect(db_url: &str) -> PersistenceResult<Self> {
        let pool = create_pool(db_url).await?;
        Ok(Self { pool })
    }

    /// Create the database file if missing, ensure the schema, and connect.
    pub async fn init(db_url: &str) -> PersistenceResult<Self> {
        let pool = init_database(db_url).await?;
        Ok(Self { pool })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;
    use vaultbank_core::{Account, EntryKind};

    const TEST_KEY_BITS: usize = 512;

    async fn test_db() -> (TempDir, Database) {
        let dir = TempDir::new().unwrap();
        let url = format!("sqlite:{}/test.db", dir.path().display());
        let db = Database::init(&url).await.unwrap();
        (dir, db)
    }

    fn sample_user(username: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            password_hash: "hash".into(),
            password_salt: "salt".into(),
            pin_hash: "pinhash".into(),
            pin_salt: "pinsalt".into(),
            customer_ref: Some(format!("UID-{username}")),
        }
    }

    #[tokio::test]
    async fn test_user_insert_and_lookup() {
        let (_dir, db) = test_db().await;
        let user = UserRepo::insert(&db.pool, &sample_user("alice")).await.unwrap();
        assert!(user.id > 0);

        let found = UserRepo::find_by_username(&db.pool, "alice")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(found.customer_ref.as_deref(), Some("UID-alice"));

        let by_ref = UserRepo::find_by_customer_ref(&db.pool, "UID-alice")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_ref.id, user.id);

        assert!(UserRepo::find_by_username(&db.pool, "nobody")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_is_unique_violation() {
        let (_dir, db) = test_db().await;
        UserRepo::insert(&db.pool, &sample_user("bob")).await.unwrap();

        let mut dup = sample_user("bob");
        dup.customer_ref = Some("UID-other".into());
        let err = UserRepo::insert(&db.pool, &dup).await.unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn test_account_insert_and_balance_update() {
        let (_dir, db) = test_db().await;
        let user = UserRepo::insert(&db.pool, &sample_user("carol")).await.unwrap();

        let number = Account::generate_account_number();
        let account = AccountRepo::insert(&db.pool, user.id, &number, dec!(0))
            .await
            .unwrap();
        assert_eq!(account.balance().unwrap(), dec!(0));

        let mut tx = db.pool.begin().await.unwrap();
        let locked = AccountRepo::lock_for_update(&mut tx, account.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(locked.id, account.id);
        AccountRepo::update_balance(&mut tx, account.id, dec!(75.50))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let reread = AccountRepo::get_by_id(&db.pool, account.id).await.unwrap();
        assert_eq!(reread.balance().unwrap(), dec!(75.50));
    }

    #[tokio::test]
    async fn test_transaction_trail_roundtrip() {
        let (_dir, db) = test_db().await;
        let custodian = KeyCustodian::with_key_bits(db.pool.clone(), TEST_KEY_BITS);
        let cipher = custodian.field_cipher().await.unwrap();

        let mut tx = db.pool.begin().await.unwrap();
        TransactionRepo::insert(&mut tx, &cipher, None, Some(1), dec!(100.00), Some("Deposit"))
            .await
            .unwrap();
        TransactionRepo::insert(&mut tx, &cipher, Some(1), Some(2), dec!(25.00), None)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        // Ciphertext on disk: no column carries the plaintext memo or amount
        let raw: Vec<(Option<String>, String)> = sqlx::query_as(
            "SELECT description_encrypted, amount_encrypted FROM transactions",
        )
        .fetch_all(&db.pool)
        .await
        .unwrap();
        for (description, amount) in &raw {
            assert_ne!(amount, "100.00");
            assert_ne!(amount, "25.00");
            if let Some(d) = description {
                assert_ne!(d, "Deposit");
            }
        }

        let all = TransactionRepo::find_all(&db.pool, &cipher).await.unwrap();
        assert_eq!(all.len(), 2);
        // Newest first
        assert_eq!(all[0].kind(), Some(EntryKind::Transfer));
        assert_eq!(all[0].amount, dec!(25.00));
        assert_eq!(all[1].kind(), Some(EntryKind::Deposit));
        assert_eq!(all[1].amount, dec!(100.00));
        assert_eq!(all[1].description.as_deref(), Some("Deposit"));

        let for_two = TransactionRepo::find_by_account(&db.pool, &cipher, 2)
            .await
            .unwrap();
        assert_eq!(for_two.len(), 1);
        assert_eq!(for_two[0].amount, dec!(25.00));
    }

    #[tokio::test]
    async fn test_legacy_plaintext_columns_still_read() {
        let (_dir, db) = test_db().await;
        let custodian = KeyCustodian::with_key_bits(db.pool.clone(), TEST_KEY_BITS);
        let cipher = custodian.field_cipher().await.unwrap();

        // Simulate a database migrated in place from an unencrypted schema
        sqlx::query("ALTER TABLE transactions ADD COLUMN from_account_id INTEGER")
            .execute(&db.pool)
            .await
            .unwrap();
        sqlx::query("ALTER TABLE transactions ADD COLUMN to_account_id INTEGER")
            .execute(&db.pool)
            .await
            .unwrap();
        sqlx::query("ALTER TABLE transactions ADD COLUMN amount TEXT")
            .execute(&db.pool)
            .await
            .unwrap();
        sqlx::query("ALTER TABLE transactions ADD COLUMN description TEXT")
            .execute(&db.pool)
            .await
            .unwrap();
        sqlx::query(
            r#"
            INSERT INTO transactions
                (amount_encrypted, from_account_id, to_account_id, amount, description)
            VALUES ('', NULL, 7, '40.00', 'old deposit')
            "#,
        )
        .execute(&db.pool)
        .await
        .unwrap();

        let all = TransactionRepo::find_all(&db.pool, &cipher).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].to_account_id, Some(7));
        assert_eq!(all[0].from_account_id, None);
        assert_eq!(all[0].amount, dec!(40.00));
        assert_eq!(all[0].description.as_deref(), Some("old deposit"));
    }
}
