//! VaultBank CLI - Banking operations from command line
//!
//! Usage:
//! ```bash
//! vaultbank init
//! vaultbank register alice --password "correct horse" --pin 4821
//! vaultbank account open --user-id 1
//! vaultbank deposit ACC-1B2C3D4E 100.00 --memo "payday"
//! vaultbank transfer ACC-1B2C3D4E ACC-9F8E7D6C 50.00
//! vaultbank history ACC-1B2C3D4E
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;

mod commands;
mod db;

use commands::{account, ledger};

/// VaultBank - an encrypted-at-rest account ledger
#[derive(Parser)]
#[command(name = "vaultbank")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Database file path
    #[arg(long, default_value = "data/vaultbank.db", global = true)]
    pub db: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database schema and system key pair
    Init {
        /// Force re-initialization (drops existing data)
        #[arg(long)]
        force: bool,
    },

    /// Show database status
    Status,

    /// Register a new user
    Register {
        /// Login name
        username: String,
        /// Password (at least 8 characters)
        #[arg(long)]
        password: String,
        /// Transaction PIN (at least 4 digits)
        #[arg(long)]
        pin: String,
        /// Link to an existing customer reference (UID-XXXXXXXX)
        #[arg(long)]
        customer_ref: Option<String>,
    },

    /// Check a username/password pair
    Login {
        username: String,
        #[arg(long)]
        password: String,
    },

    /// Account management
    Account {
        #[command(subcommand)]
        action: AccountAction,
    },

    /// Deposit funds into an account
    Deposit {
        /// Account number (ACC-XXXXXXXX)
        account: String,
        /// Amount (0.01 to 1,000,000.00, at most 2 decimals)
        amount: Decimal,
        /// Optional memo
        #[arg(long)]
        memo: Option<String>,
    },

    /// Withdraw funds from an account
    Withdraw {
        /// Account number
        account: String,
        /// Amount
        amount: Decimal,
        /// Optional memo
        #[arg(long)]
        memo: Option<String>,
    },

    /// Transfer funds between two accounts
    Transfer {
        /// Source account number
        from: String,
        /// Destination account number
        to: String,
        /// Amount
        amount: Decimal,
        /// Optional memo
        #[arg(long)]
        memo: Option<String>,
    },

    /// Show the decrypted transaction history of an account
    History {
        /// Account number
        account: String,
    },
}

#[derive(Subcommand)]
pub enum AccountAction {
    /// Open a new zero-balance account
    Open {
        /// Owning user id
        #[arg(long, conflicts_with_all = ["customer_ref", "password", "pin"])]
        user_id: Option<i64>,
        /// Customer reference to open under (requires --password and --pin)
        #[arg(long, requires = "password", requires = "pin")]
        customer_ref: Option<String>,
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        pin: Option<String>,
    },
    /// List all account numbers
    List,
    /// Show one account
    Show {
        /// Account number
        account: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Some(parent) = cli.db.parent() {
        std::fs::create_dir_all(parent).ok();
    }

    match cli.command {
        Commands::Init { force } => {
            db::init_database(&cli.db, force).await?;
            println!("Database initialized at {:?}", cli.db);
        }

        Commands::Status => {
            db::show_status(&cli.db).await?;
        }

        Commands::Register {
            username,
            password,
            pin,
            customer_ref,
        } => {
            account::register(&cli.db, &username, &password, &pin, customer_ref.as_deref()).await?;
        }

        Commands::Login { username, password } => {
            account::login(&cli.db, &username, &password).await?;
        }

        Commands::Account { action } => {
            account::handle(&cli.db, action).await?;
        }

        Commands::Deposit {
            account,
            amount,
            memo,
        } => {
            ledger::deposit(&cli.db, &account, amount, memo.as_deref()).await?;
        }

        Commands::Withdraw {
            account,
            amount,
            memo,
        } => {
            ledger::withdraw(&cli.db, &account, amount, memo.as_deref()).await?;
        }

        Commands::Transfer {
            from,
            to,
            amount,
            memo,
        } => {
            ledger::transfer(&cli.db, &from, &to, amount, memo.as_deref()).await?;
        }

        Commands::History { account } => {
            ledger::history(&cli.db, &account).await?;
        }
    }

    Ok(())
}
