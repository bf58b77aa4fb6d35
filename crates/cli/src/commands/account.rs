//! User and account management commands

use anyhow::{bail, Result};
use std::path::Path;
use std::sync::Arc;
use vaultbank_business::{AuthService, BankingService};
use vaultbank_persistence::KeyCustodian;

use crate::db;
use crate::AccountAction;

/// Register a new user
pub async fn register(
    db_path: &Path,
    username: &str,
    password: &str,
    pin: &str,
    customer_ref: Option<&str>,
) -> Result<()> {
    let pool = db::connect(db_path).await?;
    let auth = AuthService::new(pool.clone());

    let user = auth.register(username, password, pin, customer_ref).await?;

    println!("User registered");
    println!("   User id:      {}", user.id);
    println!("   Username:     {}", user.username);
    if let Some(reference) = &user.customer_ref {
        println!("   Customer ref: {reference}");
    }

    pool.close().await;
    Ok(())
}

/// Check a username/password pair
pub async fn login(db_path: &Path, username: &str, password: &str) -> Result<()> {
    let pool = db::connect(db_path).await?;
    let auth = AuthService::new(pool.clone());

    match auth.login(username, password).await? {
        Some(user) => {
            println!("Login ok");
            println!("   User id:  {}", user.id);
            println!("   Username: {}", user.username);
        }
        None => {
            pool.close().await;
            bail!("Invalid username or password");
        }
    }

    pool.close().await;
    Ok(())
}

/// Handle account subcommands
pub async fn handle(db_path: &Path, action: AccountAction) -> Result<()> {
    let pool = db::connect(db_path).await?;
    let keys = Arc::new(KeyCustodian::new(pool.clone()));
    let banking = BankingService::new(pool.clone(), keys);

    match action {
        AccountAction::Open {
            user_id,
            customer_ref,
            password,
            pin,
        } => {
            let account = match (user_id, customer_ref) {
                (Some(user_id), None) => banking.open_account(user_id).await?,
                (None, Some(reference)) => {
                    // clap guarantees both when customer_ref is present
                    let password = password.unwrap_or_default();
                    let pin = pin.unwrap_or_default();
                    banking
                        .open_account_for_customer(&reference, &password, &pin)
                        .await?
                }
                _ => {
                    pool.close().await;
                    bail!("Provide either --user-id or --customer-ref");
                }
            };
            println!("Account opened");
            println!("   Number:  {}", account.account_number);
            println!("   Balance: {}", account.balance);
        }

        AccountAction::List => {
            let numbers = banking.all_account_numbers().await?;
            if numbers.is_empty() {
                println!("No accounts");
            } else {
                println!("Accounts ({}):", numbers.len());
                for number in numbers {
                    println!("   {number}");
                }
            }
        }

        AccountAction::Show { account } => {
            let account = banking.account_by_number(&account).await?;
            println!("Account {}", account.account_number);
            println!("   Id:      {}", account.id);
            println!("   User id: {}", account.user_id);
            println!("   Balance: {}", account.balance);
            println!("   Opened:  {}", account.created_at);
        }
    }

    pool.close().await;
    Ok(())
}
