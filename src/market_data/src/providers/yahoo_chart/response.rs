use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Deserialize;

use crate::models::bar::Bar;

#[derive(Deserialize, Debug)]
pub struct ChartResponse {
    pub chart: Chart,
}

#[derive(Deserialize, Debug)]
pub struct Chart {
    pub result: Option<Vec<ChartResult>>,
    pub error: Option<ChartError>,
}

#[derive(Deserialize, Debug)]
pub struct ChartError {
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl ChartError {
    /// The endpoint reports unknown or delisted symbols with this code.
    pub fn is_not_found(&self) -> bool {
        self.code.eq_ignore_ascii_case("Not Found")
    }
}

#[derive(Deserialize, Debug)]
pub struct ChartResult {
    pub meta: ChartMeta,
    #[serde(default)]
    pub timestamp: Vec<i64>,
    pub indicators: Indicators,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ChartMeta {
    pub symbol: String,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub exchange_timezone_name: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct Indicators {
    #[serde(default)]
    pub quote: Vec<Quote>,
}

/// Column-oriented OHLCV arrays; halted sessions show up as `null`.
#[derive(Deserialize, Debug, Default)]
pub struct Quote {
    #[serde(default)]
    pub open: Vec<Option<f64>>,
    #[serde(default)]
    pub high: Vec<Option<f64>>,
    #[serde(default)]
    pub low: Vec<Option<f64>>,
    #[serde(default)]
    pub close: Vec<Option<f64>>,
    #[serde(default)]
    pub volume: Vec<Option<f64>>,
}

impl ChartResult {
    fn timezone(&self) -> Tz {
        self.meta
            .exchange_timezone_name
            .as_deref()
            .and_then(|name| name.parse::<Tz>().ok())
            .unwrap_or(Tz::UTC)
    }

    /// Converts the columnar payload into daily bars.
    ///
    /// Timestamps are mapped to the exchange's local calendar date. Rows with
    /// any missing price are dropped, a missing volume counts as zero, and when
    /// two rows land on the same date the later one wins (the endpoint appends
    /// a live row for the current session).
    pub fn into_bars(self) -> Vec<Bar> {
        let tz = self.timezone();
        let quote = self.indicators.quote.into_iter().next().unwrap_or_default();
        let mut by_date: BTreeMap<NaiveDate, Bar> = BTreeMap::new();

        for (i, ts) in self.timestamp.iter().enumerate() {
            let Some(utc) = DateTime::<Utc>::from_timestamp(*ts, 0) else {
                continue;
            };
            let date = utc.with_timezone(&tz).date_naive();
            let cell = |col: &[Option<f64>]| col.get(i).copied().flatten();
            let (Some(open), Some(high), Some(low), Some(close)) = (
                cell(&quote.open),
                cell(&quote.high),
                cell(&quote.low),
                cell(&quote.close),
            ) else {
                continue;
            };
            let volume = cell(&quote.volume).unwrap_or(0.0).max(0.0);
            by_date.insert(date, Bar::new(date, open, high, low, close, volume));
        }

        by_date.into_values().collect()
    }
}
