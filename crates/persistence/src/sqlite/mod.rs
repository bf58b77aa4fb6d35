//! SQLite storage backend

pub mod repos;
pub mod schema;

pub use repos::{
    create_pool, create_schema, init_database, AccountRepo, NewUser, SystemKeyRepo,
    TransactionRepo, UserRepo,
};
pub use schema::{AccountRow, SystemKeyRow, UserRow};
