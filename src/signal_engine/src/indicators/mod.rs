//! Pure indicator functions over closing prices and volumes.
//!
//! Inputs are oldest-first slices; every function looks at the end of the
//! slice (the last bar) and fails with [`IndicatorError`](crate::IndicatorError)
//! when the history is too short or the value is mathematically undefined.

pub mod bollinger;
pub mod fibonacci;
pub mod macd;
pub mod moving_average;
pub mod obv;
pub mod rsi;
pub mod volume;

pub use bollinger::{Bollinger, bollinger};
pub use fibonacci::{FibZone, Fibonacci, fibonacci};
pub use macd::{Macd, MacdCross, macd};
pub use moving_average::{ema_series, sma, sma_series};
pub use obv::{obv, obv_rising};
pub use rsi::{rsi, rsi_series};
pub use volume::{up_streak, volume_contraction, volume_surge_ratio};

#[cfg(test)]
pub(crate) fn assert_close(a: f64, b: f64) {
    assert!((a - b).abs() < 1e-9, "{a} != {b}");
}
