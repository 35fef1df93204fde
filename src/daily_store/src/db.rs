//! Database utilities for connections and schema migrations.
//!
//! - [`connection::connect_sqlite`] opens a connection with WAL journaling,
//!   `foreign_keys=ON` and a 5000ms `busy_timeout`.
//! - [`migrate::run_sqlite`] applies the embedded migrations.
//!
//! Example:
//! ```no_run
//! use daily_store::db::{connection, migrate};
//!
//! let db_path = std::env::temp_dir().join("daily_store_example.db");
//! migrate::run_sqlite(db_path.to_str().unwrap()).expect("migrations");
//! let _conn = connection::connect_sqlite(db_path.to_str().unwrap()).expect("connect");
//! ```

pub mod connection;
pub mod migrate;

/// Accepts `sqlite://path`, `sqlite:path` or a bare file path.
pub fn sqlite_path(database_url: &str) -> &str {
    database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url)
}
