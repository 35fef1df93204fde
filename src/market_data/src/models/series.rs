//! A validated, date-ordered collection of daily bars for a single instrument.

use chrono::{Datelike, IsoWeek, NaiveDate};
use thiserror::Error;

use crate::models::bar::Bar;

#[derive(Debug, Error, PartialEq)]
pub enum SeriesError {
    #[error("bars for {code} are not strictly increasing at {date} (previous {prev})")]
    NonIncreasingDates {
        code: String,
        prev: NaiveDate,
        date: NaiveDate,
    },

    #[error("bar for {code} on {date} has negative volume {volume}")]
    NegativeVolume {
        code: String,
        date: NaiveDate,
        volume: f64,
    },
}

/// Represents the complete daily history of one instrument over a lookback window.
///
/// Invariant: dates are strictly increasing. Gaps (weekends, holidays) are
/// allowed and never filled.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    code: String,
    bars: Vec<Bar>,
}

impl Series {
    /// Builds a series, rejecting duplicate or out-of-order dates and negative volume.
    pub fn new(code: impl Into<String>, bars: Vec<Bar>) -> Result<Self, SeriesError> {
        let code = code.into();
        for (i, bar) in bars.iter().enumerate() {
            if bar.volume < 0.0 {
                return Err(SeriesError::NegativeVolume {
                    code,
                    date: bar.date,
                    volume: bar.volume,
                });
            }
            if i > 0 && bars[i - 1].date >= bar.date {
                return Err(SeriesError::NonIncreasingDates {
                    code,
                    prev: bars[i - 1].date,
                    date: bar.date,
                });
            }
        }
        Ok(Self { code, bars })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// The bar before the last one, if any.
    pub fn prev(&self) -> Option<&Bar> {
        self.bars.len().checked_sub(2).map(|i| &self.bars[i])
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.low).collect()
    }

    /// Close-to-close change of the last bar, in percent.
    pub fn last_change_rate(&self) -> Option<f64> {
        let last = self.last()?;
        let prev = self.prev()?;
        last.change_rate(prev.close)
    }

    /// The first `n` bars as a new series (the view a run on that day would have seen).
    pub fn truncate_to(&self, n: usize) -> Series {
        Series {
            code: self.code.clone(),
            bars: self.bars[..n.min(self.bars.len())].to_vec(),
        }
    }

    /// Aggregates daily bars into ISO-week bars.
    ///
    /// Open is the week's first open, high/low the extremes, close the last
    /// close and volume the sum. The weekly bar carries the date of the last
    /// trading day of that week, so ordering is preserved.
    pub fn to_weekly(&self) -> Series {
        let mut weekly: Vec<Bar> = Vec::new();
        let mut current: Option<(IsoWeek, Bar)> = None;

        for bar in &self.bars {
            let week = bar.date.iso_week();
            match current.as_mut() {
                Some((w, agg)) if *w == week => {
                    agg.high = agg.high.max(bar.high);
                    agg.low = agg.low.min(bar.low);
                    agg.close = bar.close;
                    agg.volume += bar.volume;
                    agg.date = bar.date;
                }
                _ => {
                    if let Some((_, done)) = current.take() {
                        weekly.push(done);
                    }
                    current = Some((week, *bar));
                }
            }
        }
        if let Some((_, done)) = current {
            weekly.push(done);
        }

        Series {
            code: self.code.clone(),
            bars: weekly,
        }
    }
}
