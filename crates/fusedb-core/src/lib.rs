//! # FuseDB
//!
//! A small embedded relational database engine. Each table lives in its
//! own file as a sequence of fixed 4 KiB pages behind a per-table buffer
//! pool; a binary catalog in `main.db` describes tables, columns, and
//! constraints. A hand-written state-machine parser accepts a minimal SQL
//! dialect, of which CREATE TABLE, INSERT, and SELECT execute.
//!
//! ## Quick start
//!
//! ```no_run
//! use fusedb_core::Database;
//!
//! let db = Database::open("./my_database")?;
//!
//! db.execute("CREATE TABLE 'users' (id INT PRIMARY KEY, name CHAR(32), active BOOL)")?;
//! db.execute("INSERT INTO 'users' (name, active) VALUES ('alice', 'true')")?;
//!
//! let rows = db.execute("SELECT * FROM 'users'")?.unwrap();
//! for row in rows {
//!     println!("{row:?}");
//! }
//! # Ok::<(), fusedb_core::Error>(())
//! ```

pub mod api;
pub mod catalog;
pub mod encoding;
pub mod error;
pub mod parser;
pub mod storage;
pub mod types;

pub use api::{Database, ResultColumn, Rows};
pub use error::{Error, Result};
pub use parser::{Query, QueryKind, parse};
pub use types::Value;
