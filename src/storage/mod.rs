//! Persistent storage for accounts, sessions, and document metadata

mod database;

pub use database::Database;
