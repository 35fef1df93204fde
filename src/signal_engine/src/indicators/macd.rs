use serde::Serialize;

use crate::errors::{IndicatorValue, require};
use crate::indicators::moving_average::ema_series;

/// Cross of the MACD line over its signal line on the last bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MacdCross {
    BullishCross,
    BearishCross,
    None,
}

impl MacdCross {
    /// Compares `line - signal` on the previous and the current bar.
    ///
    /// Only a strict change of sign counts; touching zero is not a cross.
    pub fn from_diffs(prev: f64, cur: f64) -> Self {
        if prev < 0.0 && cur > 0.0 {
            MacdCross::BullishCross
        } else if prev > 0.0 && cur < 0.0 {
            MacdCross::BearishCross
        } else {
            MacdCross::None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Macd {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
    pub cross: MacdCross,
    /// Last three histogram values strictly increasing and the last positive.
    pub histogram_rising: bool,
}

/// MACD(fast, slow, signal) on the last bar. Needs `slow + signal` closes.
pub fn macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> IndicatorValue<Macd> {
    require("macd", closes.len(), (slow + signal).max(3))?;

    let fast_ema = ema_series(closes, fast);
    let slow_ema = ema_series(closes, slow);
    let line: Vec<f64> = fast_ema.iter().zip(&slow_ema).map(|(f, s)| f - s).collect();
    let signal_line = ema_series(&line, signal);
    let hist: Vec<f64> = line.iter().zip(&signal_line).map(|(l, s)| l - s).collect();

    let last = hist.len() - 1;
    let h = &hist[last - 2..];
    Ok(Macd {
        line: line[last],
        signal: signal_line[last],
        histogram: hist[last],
        cross: MacdCross::from_diffs(hist[last - 1], hist[last]),
        histogram_rising: h[0] < h[1] && h[1] < h[2] && h[2] > 0.0,
    })
}
