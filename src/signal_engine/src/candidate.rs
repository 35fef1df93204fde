use std::fmt;

use chrono::NaiveDate;
use market_data::models::instrument::Instrument;
use serde::Serialize;

use crate::errors::IndicatorError;
use crate::indicators::{FibZone, MacdCross};

/// Which strategy (and rule) produced a candidate.
///
/// Declaration order is the aggregator's priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum CandidateCategory {
    WavePhase,
    MaCrossover,
    VolumeSurge,
    UpTrend,
}

impl fmt::Display for CandidateCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CandidateCategory::WavePhase => "wave phase",
            CandidateCategory::MaCrossover => "MA crossover",
            CandidateCategory::VolumeSurge => "volume surge",
            CandidateCategory::UpTrend => "up-trend",
        };
        f.write_str(s)
    }
}

/// Screener rules, in tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ScreenRule {
    /// Short SMA crossed above the long SMA on the last bar.
    MaCross,
    /// Short SMA already above the long SMA.
    MaAlignment,
    VolumeSurge,
    UpTrend,
}

impl ScreenRule {
    pub fn category(self) -> CandidateCategory {
        match self {
            ScreenRule::MaCross | ScreenRule::MaAlignment => CandidateCategory::MaCrossover,
            ScreenRule::VolumeSurge => CandidateCategory::VolumeSurge,
            ScreenRule::UpTrend => CandidateCategory::UpTrend,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ScreenRule::MaCross => "MA cross",
            ScreenRule::MaAlignment => "MA aligned",
            ScreenRule::VolumeSurge => "volume surge",
            ScreenRule::UpTrend => "up-trend",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScreenMetrics {
    pub volume_ratio: Option<f64>,
    pub sma_short: Option<f64>,
    pub sma_long: Option<f64>,
    pub up_streak: Option<usize>,
}

/// Market phase assigned by the wave classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WavePhase {
    ReversalUp,
    PullbackBuy,
    MomentumUp,
    Exhaustion,
    MomentumDown,
    Indeterminate,
}

impl WavePhase {
    /// Phases that never produce a candidate.
    pub fn is_bearish(self) -> bool {
        matches!(self, WavePhase::Exhaustion | WavePhase::MomentumDown)
    }
}

impl fmt::Display for WavePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WavePhase::ReversalUp => "reversal up",
            WavePhase::PullbackBuy => "pullback buy",
            WavePhase::MomentumUp => "momentum up",
            WavePhase::Exhaustion => "exhaustion",
            WavePhase::MomentumDown => "momentum down",
            WavePhase::Indeterminate => "indeterminate",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Bucket {
    Oversold,
    Neutral,
    Overbought,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaveZones {
    pub fib_zone: Option<FibZone>,
    pub fib_depth: Option<f64>,
    pub bollinger: Option<Bucket>,
    pub rsi: Option<Bucket>,
    pub macd: Option<MacdCross>,
}

/// Bullish factors counted by the wave score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WaveFactor {
    FibPullback,
    BollingerOversold,
    RsiOversoldRebound,
    MacdBullishCross,
    MacdHistogramRising,
    ObvRising,
    VolumeContraction,
    Ma240Band,
    MarketCap,
}

impl WaveFactor {
    pub fn label(self) -> &'static str {
        match self {
            WaveFactor::FibPullback => "Fibonacci pullback",
            WaveFactor::BollingerOversold => "Bollinger oversold",
            WaveFactor::RsiOversoldRebound => "RSI oversold rebound",
            WaveFactor::MacdBullishCross => "MACD golden cross",
            WaveFactor::MacdHistogramRising => "MACD histogram rising",
            WaveFactor::ObvRising => "OBV rising",
            WaveFactor::VolumeContraction => "volume contraction",
            WaveFactor::Ma240Band => "near MA240",
            WaveFactor::MarketCap => "market cap",
        }
    }
}

/// Strategy-specific explanation of a candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CandidateDetail {
    Screen {
        matched: Vec<ScreenRule>,
        metrics: ScreenMetrics,
    },
    Wave {
        phase: WavePhase,
        zones: WaveZones,
        factors: Vec<WaveFactor>,
        conflicts: usize,
    },
}

impl CandidateDetail {
    /// Short human-readable list of what matched.
    pub fn summary(&self) -> String {
        match self {
            CandidateDetail::Screen { matched, .. } => matched
                .iter()
                .map(|r| r.label())
                .collect::<Vec<_>>()
                .join(", "),
            CandidateDetail::Wave { phase, factors, .. } => {
                let factors: Vec<_> = factors.iter().map(|f| f.label()).collect();
                if factors.is_empty() {
                    phase.to_string()
                } else {
                    format!("{phase}: {}", factors.join(", "))
                }
            }
        }
    }
}

/// An instrument flagged by one of the strategies on `date`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub instrument: Instrument,
    pub date: NaiveDate,
    pub category: CandidateCategory,
    /// Normalised strength in `[0, 1]`.
    pub score: f64,
    pub close: f64,
    pub change_rate: Option<f64>,
    pub detail: CandidateDetail,
}

/// Result of running one strategy over a universe.
#[derive(Debug, Default)]
pub struct StrategyOutcome {
    pub candidates: Vec<Candidate>,
    /// Instruments the strategy could not evaluate at all.
    pub insufficient: Vec<(Instrument, IndicatorError)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_priority_follows_declaration() {
        assert!(CandidateCategory::WavePhase < CandidateCategory::MaCrossover);
        assert!(CandidateCategory::MaCrossover < CandidateCategory::VolumeSurge);
        assert!(CandidateCategory::VolumeSurge < CandidateCategory::UpTrend);
    }

    #[test]
    fn summary_lists_matches() {
        let d = CandidateDetail::Screen {
            matched: vec![ScreenRule::MaCross, ScreenRule::VolumeSurge],
            metrics: ScreenMetrics::default(),
        };
        assert_eq!(d.summary(), "MA cross, volume surge");

        let w = CandidateDetail::Wave {
            phase: WavePhase::PullbackBuy,
            zones: WaveZones {
                fib_zone: None,
                fib_depth: None,
                bollinger: None,
                rsi: None,
                macd: None,
            },
            factors: vec![WaveFactor::ObvRising],
            conflicts: 0,
        };
        assert_eq!(w.summary(), "pullback buy: OBV rising");
    }
}
