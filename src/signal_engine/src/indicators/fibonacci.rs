use serde::Serialize;

use crate::errors::{IndicatorError, IndicatorValue, require};

/// Retracement ratios measured down from the high.
pub const FIB_RATIOS: [f64; 5] = [0.236, 0.382, 0.5, 0.618, 0.786];

/// The pair of adjacent ratios bracketing the close. `0.0` is the high and
/// `1.0` the low of the lookback window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FibZone {
    pub from: f64,
    pub to: f64,
}

impl FibZone {
    /// Whether the zone lies entirely inside `[lo, hi]`.
    pub fn within(&self, lo: f64, hi: f64) -> bool {
        self.from >= lo - 1e-9 && self.to <= hi + 1e-9
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fibonacci {
    pub high: f64,
    pub low: f64,
    /// `(ratio, price)` for each of [`FIB_RATIOS`].
    pub levels: Vec<(f64, f64)>,
    /// How far the close has retraced: 0 at the high, 1 at the low.
    pub depth: f64,
    pub zone: FibZone,
}

/// Retracement levels over the last `lookback` closes.
pub fn fibonacci(closes: &[f64], lookback: usize) -> IndicatorValue<Fibonacci> {
    let lookback = lookback.max(2);
    require("fibonacci", closes.len(), lookback)?;

    let window = &closes[closes.len() - lookback..];
    let high = window.iter().copied().fold(f64::MIN, f64::max);
    let low = window.iter().copied().fold(f64::MAX, f64::min);
    let range = high - low;
    if range <= 0.0 {
        return Err(IndicatorError::Undefined {
            indicator: "fibonacci",
            reason: "no price range in lookback window",
        });
    }

    let close = window[lookback - 1];
    let depth = ((high - close) / range).clamp(0.0, 1.0);
    let levels = FIB_RATIOS.iter().map(|r| (*r, high - r * range)).collect();

    Ok(Fibonacci {
        high,
        low,
        levels,
        depth,
        zone: zone_for(depth),
    })
}

fn zone_for(depth: f64) -> FibZone {
    let mut bounds = Vec::with_capacity(FIB_RATIOS.len() + 2);
    bounds.push(0.0);
    bounds.extend_from_slice(&FIB_RATIOS);
    bounds.push(1.0);

    for pair in bounds.windows(2) {
        if depth < pair[1] {
            return FibZone {
                from: pair[0],
                to: pair[1],
            };
        }
    }
    FibZone {
        from: FIB_RATIOS[FIB_RATIOS.len() - 1],
        to: 1.0,
    }
}
