use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use snafu::{Backtrace, Snafu};

use crate::models::instrument::{Instrument, Universe};
use crate::models::series::Series;

/// One instrument's last bar, flattened for storage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotRow {
    pub universe: Universe,
    pub date: NaiveDate,
    pub code: String,
    pub name: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    /// Close-to-close change in percent; absent for a single-bar series.
    pub change_rate: Option<f64>,
}

impl SnapshotRow {
    /// Builds the row for the last bar of `series`, or `None` when it is empty.
    pub fn from_series(instrument: &Instrument, series: &Series) -> Option<Self> {
        let last = series.last()?;
        Some(Self {
            universe: instrument.universe,
            date: last.date,
            code: instrument.code.clone(),
            name: instrument.name.clone(),
            open: last.open,
            high: last.high,
            low: last.low,
            close: last.close,
            volume: last.volume,
            change_rate: series.last_change_rate(),
        })
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SinkError {
    /// The destination rejected the write.
    #[snafu(display("Failed to write snapshot: {message}"))]
    Write {
        message: String,
        backtrace: Backtrace,
    },

    /// The destination could not be opened.
    #[snafu(display("Snapshot destination unavailable: {message}"))]
    Unavailable {
        message: String,
        backtrace: Backtrace,
    },
}

#[async_trait]
pub trait SnapshotSink: Send + Sync {
    /// Stores the rows of one run. Writing the same `(date, code)` twice must
    /// leave a single row holding the latest values.
    ///
    /// Returns the number of rows written.
    async fn write(&self, rows: &[SnapshotRow]) -> Result<usize, SinkError>;
}
