//! Database initialization and status

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use std::path::Path;
use vaultbank_persistence::{Database, KeyCustodian};

/// Initialize the database: schema plus the system key pair, so the first
/// transaction does not pay the key generation cost.
pub async fn init_database(db_path: &Path, force: bool) -> Result<()> {
    if force && db_path.exists() {
        std::fs::remove_file(db_path).context("Failed to remove existing database")?;
        println!("Removed existing database");
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());
    let db = Database::init(&db_url)
        .await
        .context("Failed to initialize database")?;

    println!("Schema created");
    println!("Generating system key pair (this can take a moment)...");
    let custodian = KeyCustodian::new(db.pool.clone());
    custodian
        .get_or_create()
        .await
        .context("Failed to create system key pair")?;
    println!("System key pair ready");

    db.pool.close().await;
    Ok(())
}

/// Show database status
pub async fn show_status(db_path: &Path) -> Result<()> {
    if !db_path.exists() {
        println!("Database not found at {:?}", db_path);
        println!("Run 'vaultbank init' to create the database");
        return Ok(());
    }

    let pool = connect(db_path).await?;

    println!("Database Status");
    println!("   Path: {:?}", db_path);
    println!();

    let user_count = count(&pool, "users").await;
    let account_count = count(&pool, "accounts").await;
    let tx_count = count(&pool, "transactions").await;
    let key_count = count(&pool, "system_keys").await;

    println!("   Users:        {user_count}");
    println!("   Accounts:     {account_count}");
    println!("   Transactions: {tx_count}");
    println!("   System keys:  {key_count}");

    pool.close().await;
    Ok(())
}

async fn count(pool: &SqlitePool, table: &str) -> i64 {
    let row: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .unwrap_or((0,));
    row.0
}

/// Connect to the database pool
pub async fn connect(db_path: &Path) -> Result<SqlitePool> {
    let db_url = format!("sqlite:{}", db_path.display());
    let db = Database::connect(&db_url)
        .await
        .context("Failed to connect to database. Run 'vaultbank init' first.")?;
    Ok(db.pool)
}
