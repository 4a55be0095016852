//! Persistence layer - SQLite storage of budget state

mod budget_store;
mod connection;
pub mod migrations;

pub use budget_store::SqliteBudgetStore;
pub use connection::{ConnectionPool, DatabaseError, create_pool};
