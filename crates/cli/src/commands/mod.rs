//! CLI command handlers

pub mod account;
pub mod ledger;
