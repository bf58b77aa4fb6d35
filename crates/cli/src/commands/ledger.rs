//! Ledger commands: deposit, withdraw, transfer, history

use anyhow::Result;
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;
use vaultbank_business::BankingService;
use vaultbank_core::EntryKind;
use vaultbank_persistence::KeyCustodian;

use crate::db;

fn banking(pool: &SqlitePool) -> BankingService {
    let keys = Arc::new(KeyCustodian::new(pool.clone()));
    BankingService::new(pool.clone(), keys)
}

/// Deposit funds into an account
pub async fn deposit(
    db_path: &Path,
    account_number: &str,
    amount: Decimal,
    memo: Option<&str>,
) -> Result<()> {
    let pool = db::connect(db_path).await?;
    let banking = banking(&pool);

    let account = banking.account_by_number(account_number).await?;
    let updated = banking.deposit(account.id, amount, memo).await?;

    println!("Deposit successful");
    println!("   Account: {}", updated.account_number);
    println!("   Amount:  {amount}");
    println!("   Balance: {}", updated.balance);

    pool.close().await;
    Ok(())
}

/// Withdraw funds from an account
pub async fn withdraw(
    db_path: &Path,
    account_number: &str,
    amount: Decimal,
    memo: Option<&str>,
) -> Result<()> {
    let pool = db::connect(db_path).await?;
    let banking = banking(&pool);

    let account = banking.account_by_number(account_number).await?;
    let updated = banking.withdraw(account.id, amount, memo).await?;

    println!("Withdrawal successful");
    println!("   Account: {}", updated.account_number);
    println!("   Amount:  {amount}");
    println!("   Balance: {}", updated.balance);

    pool.close().await;
    Ok(())
}

/// Transfer funds between two accounts
pub async fn transfer(
    db_path: &Path,
    from_number: &str,
    to_number: &str,
    amount: Decimal,
    memo: Option<&str>,
) -> Result<()> {
    let pool = db::connect(db_path).await?;
    let banking = banking(&pool);

    let from = banking.account_by_number(from_number).await?;
    let to = banking.account_by_number(to_number).await?;
    let (from_after, to_after) = banking.transfer(from.id, to.id, amount, memo).await?;

    println!("Transfer successful");
    println!("   From:   {} (balance {})", from_after.account_number, from_after.balance);
    println!("   To:     {} (balance {})", to_after.account_number, to_after.balance);
    println!("   Amount: {amount}");

    pool.close().await;
    Ok(())
}

/// Show the decrypted transaction history of an account
pub async fn history(db_path: &Path, account_number: &str) -> Result<()> {
    let pool = db::connect(db_path).await?;
    let banking = banking(&pool);

    let account = banking.account_by_number(account_number).await?;
    let entries = banking.history(account.id).await?;

    if entries.is_empty() {
        println!("No transactions for {account_number}");
        pool.close().await;
        return Ok(());
    }

    println!("History for {account_number} ({} entries, newest first):", entries.len());
    for entry in entries {
        let kind = entry
            .kind()
            .map(|k| k.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let direction = match entry.kind() {
            Some(EntryKind::Deposit) => "+",
            Some(EntryKind::Withdrawal) => "-",
            Some(EntryKind::Transfer) if entry.from_account_id == Some(account.id) => "-",
            Some(EntryKind::Transfer) => "+",
            None => "?",
        };
        let memo = entry.description.as_deref().unwrap_or("");
        println!(
            "   [{}] {:<10} {}{:<12} {}",
            entry.created_at.format("%Y-%m-%d %H:%M:%S"),
            kind,
            direction,
            entry.amount,
            memo
        );
    }

    pool.close().await;
    Ok(())
}
