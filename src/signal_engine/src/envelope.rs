//! Moving-average envelope recommendation for a single leveraged ETF.
//!
//! Below the long SMA the position is parked in short-term treasuries
//! (`SGOV`); between the SMA and the envelope the leveraged fund is held
//! (`TQQQ`); above the envelope exposure moves to an unleveraged index fund
//! (`SPLG`).

use std::fmt;

use chrono::NaiveDate;
use market_data::models::series::Series;
use serde::Serialize;

use crate::config::EnvelopeConfig;
use crate::errors::{IndicatorValue, require};
use crate::indicators::sma;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Recommendation {
    Sgov,
    Tqqq,
    Splg,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Recommendation::Sgov => "SGOV",
            Recommendation::Tqqq => "TQQQ",
            Recommendation::Splg => "SPLG",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvelopeReport {
    pub symbol: String,
    pub date: NaiveDate,
    pub close: f64,
    pub sma: f64,
    pub envelope: f64,
    pub change_rate: Option<f64>,
    pub recommendation: Recommendation,
}

impl EnvelopeReport {
    /// Distance of the close from the SMA.
    pub fn diff(&self) -> f64 {
        self.close - self.sma
    }
}

pub fn recommend(close: f64, sma: f64, envelope: f64) -> Recommendation {
    if close < sma {
        Recommendation::Sgov
    } else if close < envelope {
        Recommendation::Tqqq
    } else {
        Recommendation::Splg
    }
}

pub fn analyze(series: &Series, config: &EnvelopeConfig) -> IndicatorValue<EnvelopeReport> {
    require("envelope", series.len(), config.sma_window.max(1))?;
    let closes = series.closes();
    let sma = sma(&closes, config.sma_window)?;
    let envelope = sma * (1.0 + config.envelope_pct);
    let close = closes[closes.len() - 1];
    let date = series.last().map(|b| b.date).unwrap_or_default();

    Ok(EnvelopeReport {
        symbol: config.symbol.clone(),
        date,
        close,
        sma,
        envelope,
        change_rate: series.last_change_rate(),
        recommendation: recommend(close, sma, envelope),
    })
}
