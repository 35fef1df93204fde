use async_trait::async_trait;
use chrono::Utc;
use market_data::io::sink::{SinkError, SnapshotRow, SnapshotSink, UnavailableSnafu, WriteSnafu};
use market_data::models::instrument::Universe;

use crate::db::connection::connect_sqlite;
use crate::repo::SnapshotRepo;

/// [`SnapshotSink`] backed by the SQLite `daily_snapshot` table.
///
/// Each write opens its own connection on the blocking pool; a run writes
/// once per universe, so there is nothing to gain from pooling.
#[derive(Debug, Clone)]
pub struct SqliteSnapshotSink {
    database_url: String,
}

impl SqliteSnapshotSink {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
        }
    }

    /// Verifies the database opens and the snapshot table is queryable.
    pub async fn check_ready(&self) -> Result<(), SinkError> {
        let url = self.database_url.clone();
        let joined = tokio::task::spawn_blocking(move || -> Result<(), SinkError> {
            let mut conn = connect_sqlite(&url).map_err(unavailable)?;
            SnapshotRepo::count_day(&mut conn, Utc::now().date_naive())
                .map_err(|e| unavailable(e.context("snapshot table missing, run --init-db")))?;
            Ok(())
        })
        .await;

        match joined {
            Ok(result) => result,
            Err(e) => UnavailableSnafu {
                message: format!("readiness check failed: {e}"),
            }
            .fail(),
        }
    }
}

fn unavailable(e: anyhow::Error) -> SinkError {
    UnavailableSnafu {
        message: format!("{e:#}"),
    }
    .build()
}

#[async_trait]
impl SnapshotSink for SqliteSnapshotSink {
    async fn write(&self, rows: &[SnapshotRow]) -> Result<usize, SinkError> {
        let url = self.database_url.clone();
        let rows = rows.to_vec();

        let joined = tokio::task::spawn_blocking(move || -> Result<usize, SinkError> {
            let mut conn = connect_sqlite(&url).map_err(unavailable)?;
            let mut written = 0;
            for universe in Universe::ALL {
                let part: Vec<SnapshotRow> =
                    rows.iter().filter(|r| r.universe == universe).cloned().collect();
                if part.is_empty() {
                    continue;
                }
                written += SnapshotRepo::store_daily_snapshot(&mut conn, universe, &part)
                    .map_err(|e| {
                        WriteSnafu {
                            message: format!("{e:#}"),
                        }
                        .build()
                    })?;
            }
            Ok(written)
        })
        .await;

        match joined {
            Ok(result) => result,
            Err(e) => WriteSnafu {
                message: format!("storage task failed: {e}"),
            }
            .fail(),
        }
    }
}
