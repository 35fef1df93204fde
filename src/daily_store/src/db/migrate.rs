//! Embedded schema migrations.

use anyhow::anyhow;
use diesel::{Connection, SqliteConnection, connection::SimpleConnection};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};

use crate::db::sqlite_path;

/// Embedded Diesel migrations bundled with this crate.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Runs pending migrations on the SQLite database at `url`, creating the file
/// (and its parent directory) when missing. Returns the number of migrations applied.
pub fn run_sqlite(url: &str) -> anyhow::Result<usize> {
    let path = sqlite_path(url);
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut conn = SqliteConnection::establish(path)?;
    conn.batch_execute("PRAGMA journal_mode=WAL;")?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow!(e))?;
    tracing::info!(database = path, applied = applied.len(), "migrations applied");
    Ok(applied.len())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn migrations_apply_on_temp_file() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        let path = temp.path().to_string_lossy().to_string();

        assert_eq!(run_sqlite(&path).expect("migration run"), 1);
        // second run is a no-op
        assert_eq!(run_sqlite(&path).expect("migration rerun"), 0);

        let mut conn = SqliteConnection::establish(&path).unwrap();
        conn.batch_execute(
            "INSERT INTO daily_snapshot (universe, trade_date, code, name, open, high, low, close, volume, updated_at)
             VALUES ('primary', '2025-03-07', '005930', 'x', 1, 1, 1, 1, 1, '2025-03-07T00:00:00Z')",
        )
        .unwrap();
    }
}
