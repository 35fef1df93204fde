//! Canonical in-memory representation of one trading day (OHLCV).
//!
//! This struct is the standard output of every [`SeriesProvider`](crate::providers::SeriesProvider)
//! implementation, regardless of the exchange it talks to.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single daily bar (OHLCV).
///
/// Bars are plain values: once recorded they are never mutated, only
/// collected into a [`Series`](crate::models::series::Series).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Trading date in the exchange's local calendar.
    pub date: NaiveDate,

    /// Opening price.
    pub open: f64,

    /// Highest price during the session.
    pub high: f64,

    /// Lowest price during the session.
    pub low: f64,

    /// Closing price.
    pub close: f64,

    /// Volume traded during the session. Never negative.
    pub volume: f64,
}

impl Bar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Percentage change of this bar's close against `prev_close`.
    ///
    /// Returns `None` when the previous close is not positive.
    pub fn change_rate(&self, prev_close: f64) -> Option<f64> {
        if prev_close > 0.0 {
            Some((self.close - prev_close) / prev_close * 100.0)
        } else {
            None
        }
    }
}
