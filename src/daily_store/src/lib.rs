//! SQLite persistence for the daily snapshot of screened instruments.

pub mod db;
pub mod repo;
pub mod schema;
pub mod sink;
