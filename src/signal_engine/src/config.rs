//! Engine configuration.
//!
//! Every threshold and weight the strategies use lives here. The structs are
//! built once (from TOML or [`Default`]) and handed to the strategies at
//! construction; nothing mutates them afterwards. Every field has a default,
//! so an empty `[screener]` / `[wave]` / `[envelope]` table is valid.

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Which moving-average states satisfy the crossover rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MaRule {
    /// Only the bar on which the short SMA moves above the long SMA.
    CrossOnly,
    /// The cross itself, or a short SMA already above the long SMA.
    #[default]
    CrossOrAbove,
}

/// Weights of the screener rules.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScreenWeights {
    pub volume_surge: f64,
    pub ma_cross: f64,
    /// Used instead of `ma_cross` when the short SMA was already above.
    pub ma_alignment: f64,
    pub up_trend: f64,
}

impl Default for ScreenWeights {
    fn default() -> Self {
        Self {
            volume_surge: 0.4,
            ma_cross: 0.4,
            ma_alignment: 0.2,
            up_trend: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScreenerConfig {
    /// Rule A fires when the last volume is at least this multiple of the baseline.
    pub volume_surge_multiple: f64,
    /// Number of prior bars forming the volume baseline.
    pub volume_window: usize,
    pub ma_short: usize,
    pub ma_long: usize,
    pub ma_rule: MaRule,
    /// Rule C fires when the up-day streak is strictly longer than this.
    pub up_streak_threshold: usize,
    /// Trailing bars in which the streak is counted.
    pub up_streak_window: usize,
    /// Instruments with a known market cap below this are not candidates.
    pub min_market_cap: Option<f64>,
    /// Maximum relative distance of the close from the long-term SMA.
    pub max_ma240_distance: Option<f64>,
    pub ma240_window: usize,
    pub weights: ScreenWeights,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            volume_surge_multiple: 2.0,
            volume_window: 20,
            ma_short: 5,
            ma_long: 20,
            ma_rule: MaRule::CrossOrAbove,
            up_streak_threshold: 3,
            up_streak_window: 10,
            min_market_cap: None,
            max_ma240_distance: None,
            ma240_window: 240,
            weights: ScreenWeights::default(),
        }
    }
}

/// Bar granularity the wave classifier works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BarPeriod {
    Daily,
    #[default]
    Weekly,
}

/// Weights of the wave factors. The score is the sum of agreeing factor
/// weights minus `conflict_penalty` per conflict.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WaveWeights {
    pub fib_zone: f64,
    pub bollinger_oversold: f64,
    pub rsi_oversold_rebound: f64,
    pub macd_bullish_cross: f64,
    pub macd_histogram_rising: f64,
    pub obv_rising: f64,
    pub volume_contraction: f64,
    pub ma240_band: f64,
    pub market_cap: f64,
    pub conflict_penalty: f64,
}

impl Default for WaveWeights {
    fn default() -> Self {
        Self {
            fib_zone: 3.0,
            bollinger_oversold: 2.0,
            rsi_oversold_rebound: 3.0,
            macd_bullish_cross: 2.0,
            macd_histogram_rising: 1.0,
            obv_rising: 1.0,
            volume_contraction: 1.0,
            ma240_band: 1.0,
            market_cap: 1.0,
            conflict_penalty: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WaveConfig {
    pub bar_period: BarPeriod,
    /// Fewer prepared bars than this and the instrument is not classified.
    pub min_bars: usize,
    pub fib_lookback: usize,
    /// Fibonacci zone range treated as a healthy pullback.
    pub pullback_zone: (f64, f64),
    /// Retracement depth that counts as a deep correction.
    pub deep_retracement: f64,
    pub rsi_period: usize,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub bollinger_period: usize,
    pub bollinger_k: f64,
    /// Band position beyond which a close counts as stretched.
    pub bollinger_threshold: f64,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub obv_window: usize,
    pub ma240_window: usize,
    /// Close must sit within this relative distance of the long SMA.
    pub ma240_band: f64,
    pub min_market_cap: Option<f64>,
    /// Minimum normalised score for a candidate.
    pub min_score: f64,
    pub weights: WaveWeights,
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self {
            bar_period: BarPeriod::Weekly,
            min_bars: 52,
            fib_lookback: 20,
            pullback_zone: (0.236, 0.5),
            deep_retracement: 0.618,
            rsi_period: 14,
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            bollinger_period: 20,
            bollinger_k: 2.0,
            bollinger_threshold: 0.6,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            obv_window: 10,
            ma240_window: 240,
            ma240_band: 0.5,
            min_market_cap: Some(3.0e11),
            min_score: 0.5,
            weights: WaveWeights::default(),
        }
    }
}

/// Moving-average envelope on a single instrument.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EnvelopeConfig {
    pub symbol: String,
    pub sma_window: usize,
    /// Envelope offset above the SMA (0.10 = +10%).
    pub envelope_pct: f64,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            symbol: "TQQQ".to_string(),
            sma_window: 200,
            envelope_pct: 0.10,
        }
    }
}

/// All strategy settings, as they appear in the app config file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    pub screener: ScreenerConfig,
    pub wave: WaveConfig,
    pub envelope: EnvelopeConfig,
}

impl EngineConfig {
    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        let cfg: EngineConfig =
            toml::from_str(toml_str).context("failed to parse engine configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Rejects settings no strategy can work with.
    pub fn validate(&self) -> anyhow::Result<()> {
        let s = &self.screener;
        anyhow::ensure!(
            s.ma_short > 0 && s.ma_short < s.ma_long,
            "screener.ma_short ({}) must be positive and below ma_long ({})",
            s.ma_short,
            s.ma_long
        );
        anyhow::ensure!(s.volume_window > 0, "screener.volume_window must be positive");
        anyhow::ensure!(
            s.volume_surge_multiple > 0.0,
            "screener.volume_surge_multiple must be positive"
        );

        let w = &self.wave;
        anyhow::ensure!(
            w.macd_fast < w.macd_slow,
            "wave.macd_fast ({}) must be below macd_slow ({})",
            w.macd_fast,
            w.macd_slow
        );
        anyhow::ensure!(
            w.pullback_zone.0 <= w.pullback_zone.1,
            "wave.pullback_zone must be ordered"
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&w.min_score),
            "wave.min_score must be within [0, 1]"
        );

        let sw = &s.weights;
        let ww = &w.weights;
        let weights = [
            ("screener.weights.volume_surge", sw.volume_surge),
            ("screener.weights.ma_cross", sw.ma_cross),
            ("screener.weights.ma_alignment", sw.ma_alignment),
            ("screener.weights.up_trend", sw.up_trend),
            ("wave.weights.fib_zone", ww.fib_zone),
            ("wave.weights.bollinger_oversold", ww.bollinger_oversold),
            ("wave.weights.rsi_oversold_rebound", ww.rsi_oversold_rebound),
            ("wave.weights.macd_bullish_cross", ww.macd_bullish_cross),
            ("wave.weights.macd_histogram_rising", ww.macd_histogram_rising),
            ("wave.weights.obv_rising", ww.obv_rising),
            ("wave.weights.volume_contraction", ww.volume_contraction),
            ("wave.weights.ma240_band", ww.ma240_band),
            ("wave.weights.market_cap", ww.market_cap),
            ("wave.weights.conflict_penalty", ww.conflict_penalty),
        ];
        for (key, value) in weights {
            anyhow::ensure!(
                value.is_finite() && value >= 0.0,
                "{key} must be a non-negative number, got {value}"
            );
        }

        anyhow::ensure!(self.envelope.sma_window > 0, "envelope.sma_window must be positive");
        Ok(())
    }
}
