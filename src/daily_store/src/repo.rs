//! Daily snapshot repository.

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use diesel::prelude::*;
use diesel::{SqliteConnection, insert_into};
use market_data::io::sink::SnapshotRow;
use market_data::models::instrument::Universe;
use thiserror::Error;

use crate::schema::daily_snapshot;
use crate::schema::daily_snapshot::dsl as ds;

const DATE_FMT: &str = "%Y-%m-%d";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("stored row {code} has an unknown universe {value:?}")]
    UnknownUniverse { code: String, value: String },

    #[error("stored row {code} has an invalid trade date {value:?}")]
    InvalidDate { code: String, value: String },
}

#[derive(Insertable, AsChangeset, Debug)]
#[diesel(table_name = daily_snapshot)]
#[diesel(treat_none_as_null = true)]
struct NewSnapshotRow<'a> {
    universe: &'a str,
    trade_date: String,
    code: &'a str,
    name: &'a str,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    change_rate: Option<f64>,
    updated_at: &'a str,
}

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = daily_snapshot)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct StoredRow {
    universe: String,
    trade_date: String,
    code: String,
    name: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    change_rate: Option<f64>,
}

impl TryFrom<StoredRow> for SnapshotRow {
    type Error = StoreError;

    fn try_from(r: StoredRow) -> Result<Self, Self::Error> {
        let universe = Universe::from_code(&r.universe).ok_or_else(|| StoreError::UnknownUniverse {
            code: r.code.clone(),
            value: r.universe.clone(),
        })?;
        let date = NaiveDate::parse_from_str(&r.trade_date, DATE_FMT).map_err(|_| {
            StoreError::InvalidDate {
                code: r.code.clone(),
                value: r.trade_date.clone(),
            }
        })?;
        Ok(SnapshotRow {
            universe,
            date,
            code: r.code,
            name: r.name,
            open: r.open,
            high: r.high,
            low: r.low,
            close: r.close,
            volume: r.volume,
            change_rate: r.change_rate,
        })
    }
}

/// Repository for the `daily_snapshot` table.
pub struct SnapshotRepo;

impl SnapshotRepo {
    /// Upserts one universe's rows for a run.
    ///
    /// Rows are keyed by `(trade_date, code)`: storing the same day twice
    /// overwrites the earlier values instead of duplicating them. All rows
    /// are written in one transaction. Returns the number of rows written.
    pub fn store_daily_snapshot(
        conn: &mut SqliteConnection,
        universe: Universe,
        rows: &[SnapshotRow],
    ) -> anyhow::Result<usize> {
        let now = Utc::now().to_rfc3339();
        let universe_code = universe.code();

        conn.transaction::<_, anyhow::Error, _>(|conn| {
            let mut written = 0;
            for row in rows {
                let new_row = NewSnapshotRow {
                    universe: universe_code,
                    trade_date: row.date.format(DATE_FMT).to_string(),
                    code: &row.code,
                    name: &row.name,
                    open: row.open,
                    high: row.high,
                    low: row.low,
                    close: row.close,
                    volume: row.volume,
                    change_rate: row.change_rate,
                    updated_at: &now,
                };
                written += insert_into(daily_snapshot::table)
                    .values(&new_row)
                    .on_conflict((ds::trade_date, ds::code))
                    .do_update()
                    .set(&new_row)
                    .execute(conn)
                    .with_context(|| format!("upsert snapshot {} {}", row.code, row.date))?;
            }
            Ok(written)
        })
    }

    /// Loads every stored row for `date`, ordered by universe then code.
    pub fn load_day(conn: &mut SqliteConnection, date: NaiveDate) -> anyhow::Result<Vec<SnapshotRow>> {
        let rows: Vec<StoredRow> = ds::daily_snapshot
            .filter(ds::trade_date.eq(date.format(DATE_FMT).to_string()))
            .order((ds::universe.asc(), ds::code.asc()))
            .select(StoredRow::as_select())
            .load(conn)
            .context("load daily snapshot")?;

        rows.into_iter()
            .map(|r| SnapshotRow::try_from(r).map_err(anyhow::Error::from))
            .collect()
    }

    /// Number of stored rows for `date`.
    pub fn count_day(conn: &mut SqliteConnection, date: NaiveDate) -> anyhow::Result<i64> {
        let n = ds::daily_snapshot
            .filter(ds::trade_date.eq(date.format(DATE_FMT).to_string()))
            .count()
            .get_result(conn)?;
        Ok(n)
    }
}
