//! Public API: the database handle and the SELECT result cursor.

pub mod database;
pub mod rows;

pub use database::Database;
pub use rows::{ResultColumn, Rows};
