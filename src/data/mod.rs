//! Data layer module
//!
//! Handles credential persistence in SQLite.

mod database;
mod models;

pub use database::Database;
pub use models::*;
