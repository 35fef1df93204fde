//! Indicator values of one series as of its last bar.

use chrono::NaiveDate;
use market_data::models::series::Series;

use crate::config::{ScreenerConfig, WaveConfig};
use crate::errors::{IndicatorError, IndicatorValue};
use crate::indicators::{
    self, Bollinger, Fibonacci, Macd, bollinger, fibonacci, macd, obv_rising, rsi_series, sma,
    volume_contraction, volume_surge_ratio,
};

/// Window sizes used to compute a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotParams {
    pub ma_short: usize,
    pub ma_long: usize,
    pub ma_trend: usize,
    pub rsi_period: usize,
    pub macd: (usize, usize, usize),
    pub bollinger_period: usize,
    pub bollinger_k: f64,
    pub fib_lookback: usize,
    pub volume_window: usize,
    pub up_streak_window: usize,
    pub obv_window: usize,
}

impl Default for SnapshotParams {
    fn default() -> Self {
        Self {
            ma_short: 5,
            ma_long: 20,
            ma_trend: 240,
            rsi_period: 14,
            macd: (12, 26, 9),
            bollinger_period: 20,
            bollinger_k: 2.0,
            fib_lookback: 20,
            volume_window: 20,
            up_streak_window: 10,
            obv_window: 10,
        }
    }
}

impl From<&ScreenerConfig> for SnapshotParams {
    fn from(cfg: &ScreenerConfig) -> Self {
        Self {
            ma_short: cfg.ma_short,
            ma_long: cfg.ma_long,
            ma_trend: cfg.ma240_window,
            volume_window: cfg.volume_window,
            up_streak_window: cfg.up_streak_window,
            ..Default::default()
        }
    }
}

impl From<&WaveConfig> for SnapshotParams {
    fn from(cfg: &WaveConfig) -> Self {
        Self {
            ma_trend: cfg.ma240_window,
            rsi_period: cfg.rsi_period,
            macd: (cfg.macd_fast, cfg.macd_slow, cfg.macd_signal),
            bollinger_period: cfg.bollinger_period,
            bollinger_k: cfg.bollinger_k,
            fib_lookback: cfg.fib_lookback,
            obv_window: cfg.obv_window,
            ..Default::default()
        }
    }
}

/// Derived view of a series as of its last bar.
///
/// Every value is an [`IndicatorValue`]: a short history or an undefined
/// quantity is carried as an error, never as a stand-in number.
#[derive(Debug, Clone)]
pub struct IndicatorSnapshot {
    pub date: NaiveDate,
    pub close: f64,
    pub prev_close: Option<f64>,
    pub change_rate: Option<f64>,
    pub bars: usize,
    pub sma_short: IndicatorValue<f64>,
    pub sma_long: IndicatorValue<f64>,
    pub prev_sma_short: IndicatorValue<f64>,
    pub prev_sma_long: IndicatorValue<f64>,
    pub sma_trend: IndicatorValue<f64>,
    pub rsi: IndicatorValue<f64>,
    /// Last three RSI values strictly increasing.
    pub rsi_rising: IndicatorValue<bool>,
    pub macd: IndicatorValue<Macd>,
    pub bollinger: IndicatorValue<Bollinger>,
    pub fibonacci: IndicatorValue<Fibonacci>,
    pub volume_avg: IndicatorValue<f64>,
    pub volume_surge_ratio: IndicatorValue<f64>,
    /// Up-day streak within the trailing window.
    pub up_streak: IndicatorValue<usize>,
    pub obv_rising: IndicatorValue<bool>,
    pub volume_contraction: IndicatorValue<bool>,
}

impl IndicatorSnapshot {
    /// Computes the snapshot. Returns `None` for an empty series.
    pub fn compute(series: &Series, params: &SnapshotParams) -> Option<Self> {
        let last = series.last()?;
        let closes = series.closes();
        let volumes = series.volumes();
        let prior = &closes[..closes.len() - 1];

        let rsi_hist = rsi_series(&closes, params.rsi_period);
        let rsi = rsi_hist
            .as_ref()
            .map(|s| s[s.len() - 1])
            .map_err(Clone::clone);
        let rsi_rising = rsi_hist.and_then(|s| {
            if s.len() < 3 {
                return Err(IndicatorError::InsufficientHistory {
                    indicator: "rsi_rising",
                    required: params.rsi_period + 3,
                    available: closes.len(),
                });
            }
            let t = &s[s.len() - 3..];
            Ok(t[0] < t[1] && t[1] < t[2])
        });

        let volume_avg = if volumes.len() > params.volume_window {
            sma(&volumes[..volumes.len() - 1], params.volume_window)
        } else {
            Err(IndicatorError::InsufficientHistory {
                indicator: "volume_avg",
                required: params.volume_window + 1,
                available: volumes.len(),
            })
        };

        let (fast, slow, signal) = params.macd;
        Some(Self {
            date: last.date,
            close: last.close,
            prev_close: series.prev().map(|b| b.close),
            change_rate: series.last_change_rate(),
            bars: series.len(),
            sma_short: sma(&closes, params.ma_short),
            sma_long: sma(&closes, params.ma_long),
            prev_sma_short: sma(prior, params.ma_short),
            prev_sma_long: sma(prior, params.ma_long),
            sma_trend: sma(&closes, params.ma_trend),
            rsi,
            rsi_rising,
            macd: macd(&closes, fast, slow, signal),
            bollinger: bollinger(&closes, params.bollinger_period, params.bollinger_k),
            fibonacci: fibonacci(&closes, params.fib_lookback),
            volume_avg,
            volume_surge_ratio: volume_surge_ratio(&volumes, params.volume_window),
            up_streak: trailing_up_streak(&closes, params.up_streak_window),
            obv_rising: obv_rising(&closes, &volumes, params.obv_window),
            volume_contraction: volume_contraction(&volumes),
        })
    }

    /// Close strictly above the previous close.
    pub fn rebounded(&self) -> bool {
        self.prev_close.is_some_and(|p| self.close > p)
    }
}

fn trailing_up_streak(closes: &[f64], window: usize) -> IndicatorValue<usize> {
    let window = window.max(1);
    crate::errors::require("up_streak", closes.len(), window + 1)?;
    Ok(indicators::up_streak(&closes[closes.len() - window - 1..]))
}
