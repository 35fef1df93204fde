//! Wave classifier: places an instrument in a market phase from Fibonacci,
//! Bollinger, RSI and MACD readings and scores how many bullish factors agree.

use market_data::models::instrument::Instrument;
use market_data::models::series::Series;
use tracing::debug;

use crate::candidate::{
    Bucket, Candidate, CandidateCategory, CandidateDetail, StrategyOutcome, WaveFactor, WavePhase,
    WaveZones,
};
use crate::config::{BarPeriod, WaveConfig};
use crate::errors::{IndicatorError, IndicatorValue};
use crate::indicators::MacdCross;
use crate::snapshot::{IndicatorSnapshot, SnapshotParams};

/// Full classification of one instrument, candidate or not.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveAssessment {
    pub phase: WavePhase,
    pub zones: WaveZones,
    pub factors: Vec<WaveFactor>,
    /// Factors that had a reading, matched or not; their weights form the denominator.
    pub evaluable: Vec<WaveFactor>,
    pub conflicts: usize,
    /// Normalised score in `[0, 1]`.
    pub score: f64,
}

pub struct WaveClassifier {
    config: WaveConfig,
    params: SnapshotParams,
}

impl WaveClassifier {
    pub fn new(config: WaveConfig) -> Self {
        let params = SnapshotParams::from(&config);
        Self { config, params }
    }

    pub fn config(&self) -> &WaveConfig {
        &self.config
    }

    /// Resamples according to `bar_period`.
    pub fn prepare(&self, series: &Series) -> Series {
        match self.config.bar_period {
            BarPeriod::Weekly => series.to_weekly(),
            BarPeriod::Daily => series.clone(),
        }
    }

    /// Classifies a daily series.
    pub fn assess(&self, instrument: &Instrument, series: &Series) -> IndicatorValue<WaveAssessment> {
        let prepared = self.prepare(series);
        if prepared.len() < self.config.min_bars {
            return Err(IndicatorError::InsufficientHistory {
                indicator: "wave",
                required: self.config.min_bars,
                available: prepared.len(),
            });
        }
        let snap = IndicatorSnapshot::compute(&prepared, &self.params).ok_or(
            IndicatorError::InsufficientHistory {
                indicator: "wave",
                required: self.config.min_bars,
                available: 0,
            },
        )?;
        Ok(self.assess_snapshot(instrument, &snap))
    }

    pub fn assess_snapshot(&self, instrument: &Instrument, snap: &IndicatorSnapshot) -> WaveAssessment {
        let cfg = &self.config;
        let zones = self.zones(snap);
        let phase = self.phase(snap, &zones);

        let mut factors = Vec::new();
        let mut evaluable = Vec::new();
        let mut possible = 0.0;
        let w = &cfg.weights;
        let mut check = |factor: WaveFactor, weight: f64, value: Option<bool>| {
            if let Some(hit) = value {
                evaluable.push(factor);
                possible += weight;
                if hit {
                    factors.push((factor, weight));
                }
            }
        };

        let in_pullback = zones
            .fib_zone
            .map(|z| z.within(cfg.pullback_zone.0, cfg.pullback_zone.1));
        check(
            WaveFactor::FibPullback,
            w.fib_zone,
            in_pullback.map(|p| p && snap.rebounded()),
        );
        check(
            WaveFactor::BollingerOversold,
            w.bollinger_oversold,
            zones.bollinger.map(|b| b == Bucket::Oversold),
        );
        check(
            WaveFactor::RsiOversoldRebound,
            w.rsi_oversold_rebound,
            match (zones.rsi, snap.rsi_rising.as_ref()) {
                (Some(bucket), Ok(rising)) => Some(bucket == Bucket::Oversold && *rising),
                _ => None,
            },
        );
        check(
            WaveFactor::MacdBullishCross,
            w.macd_bullish_cross,
            zones.macd.map(|m| m == MacdCross::BullishCross),
        );
        check(
            WaveFactor::MacdHistogramRising,
            w.macd_histogram_rising,
            snap.macd.as_ref().ok().map(|m| m.histogram_rising),
        );
        check(
            WaveFactor::ObvRising,
            w.obv_rising,
            snap.obv_rising.as_ref().ok().copied(),
        );
        check(
            WaveFactor::VolumeContraction,
            w.volume_contraction,
            snap.volume_contraction.as_ref().ok().copied(),
        );
        check(
            WaveFactor::Ma240Band,
            w.ma240_band,
            snap.sma_trend
                .as_ref()
                .ok()
                .filter(|ma| **ma > 0.0)
                .map(|ma| (snap.close / ma - 1.0).abs() <= cfg.ma240_band),
        );
        check(
            WaveFactor::MarketCap,
            w.market_cap,
            cfg.min_market_cap
                .zip(instrument.market_cap)
                .map(|(floor, cap)| cap >= floor),
        );

        let conflicts = [
            zones.rsi == Some(Bucket::Overbought) && zones.macd == Some(MacdCross::BullishCross),
            zones.bollinger == Some(Bucket::Overbought) && zones.rsi == Some(Bucket::Oversold),
            zones.macd == Some(MacdCross::BearishCross) && in_pullback == Some(true),
        ]
        .iter()
        .filter(|c| **c)
        .count();

        let earned: f64 = factors.iter().map(|(_, w)| w).sum();
        let raw = (earned - conflicts as f64 * w.conflict_penalty).max(0.0);
        let score = if possible > 0.0 {
            (raw / possible).clamp(0.0, 1.0)
        } else {
            0.0
        };

        WaveAssessment {
            phase,
            zones,
            factors: factors.into_iter().map(|(f, _)| f).collect(),
            evaluable,
            conflicts,
            score,
        }
    }

    /// Evaluates one instrument; `Ok(None)` when it is not a candidate.
    pub fn evaluate(
        &self,
        instrument: &Instrument,
        series: &Series,
    ) -> IndicatorValue<Option<Candidate>> {
        let assessment = self.assess(instrument, series)?;
        debug!(
            code = %instrument.code,
            phase = %assessment.phase,
            score = assessment.score,
            "wave assessment"
        );
        if assessment.phase.is_bearish() || assessment.score < self.config.min_score {
            return Ok(None);
        }

        // Dates, close and change rate come from the daily bars, not the resampled ones.
        let Some(last) = series.last() else {
            return Ok(None);
        };
        Ok(Some(Candidate {
            instrument: instrument.clone(),
            date: last.date,
            category: CandidateCategory::WavePhase,
            score: assessment.score,
            close: last.close,
            change_rate: series.last_change_rate(),
            detail: CandidateDetail::Wave {
                phase: assessment.phase,
                zones: assessment.zones,
                factors: assessment.factors,
                conflicts: assessment.conflicts,
            },
        }))
    }

    /// Classifies a universe; the candidate list is sorted by code.
    pub fn screen(&self, items: &[(Instrument, Series)]) -> StrategyOutcome {
        let mut outcome = StrategyOutcome::default();
        for (instrument, series) in items {
            match self.evaluate(instrument, series) {
                Ok(Some(c)) => outcome.candidates.push(c),
                Ok(None) => {}
                Err(e) => outcome.insufficient.push((instrument.clone(), e)),
            }
        }
        outcome
            .candidates
            .sort_by(|a, b| a.instrument.code.cmp(&b.instrument.code));
        outcome
    }

    fn zones(&self, snap: &IndicatorSnapshot) -> WaveZones {
        let cfg = &self.config;
        let fib = snap.fibonacci.as_ref().ok();
        WaveZones {
            fib_zone: fib.map(|f| f.zone),
            fib_depth: fib.map(|f| f.depth),
            bollinger: snap
                .bollinger
                .as_ref()
                .ok()
                .map(|b| bollinger_bucket(b.position, cfg.bollinger_threshold)),
            rsi: snap.rsi.as_ref().ok().map(|r| {
                if *r < cfg.rsi_oversold {
                    Bucket::Oversold
                } else if *r > cfg.rsi_overbought {
                    Bucket::Overbought
                } else {
                    Bucket::Neutral
                }
            }),
            macd: snap.macd.as_ref().ok().map(|m| m.cross),
        }
    }

    /// First matching row of the phase table.
    fn phase(&self, snap: &IndicatorSnapshot, zones: &WaveZones) -> WavePhase {
        let cfg = &self.config;
        let rsi_oversold = zones.rsi == Some(Bucket::Oversold);
        let rsi_overbought = zones.rsi == Some(Bucket::Overbought);
        let boll_oversold = zones.bollinger == Some(Bucket::Oversold);
        let boll_overbought = zones.bollinger == Some(Bucket::Overbought);
        let deep = zones.fib_depth.is_some_and(|d| d >= cfg.deep_retracement);
        let pullback = zones
            .fib_zone
            .is_some_and(|z| z.within(cfg.pullback_zone.0, cfg.pullback_zone.1));
        let bullish_cross = zones.macd == Some(MacdCross::BullishCross);
        let bearish_cross = zones.macd == Some(MacdCross::BearishCross);

        if rsi_oversold && boll_oversold && deep {
            WavePhase::ReversalUp
        } else if pullback && snap.rebounded() && !bearish_cross {
            WavePhase::PullbackBuy
        } else if bullish_cross && !rsi_overbought {
            WavePhase::MomentumUp
        } else if rsi_overbought && boll_overbought {
            WavePhase::Exhaustion
        } else if bearish_cross {
            WavePhase::MomentumDown
        } else {
            WavePhase::Indeterminate
        }
    }
}

/// Band position in `[-1, 1]` to a bucket; the threshold itself is neutral.
fn bollinger_bucket(position: f64, threshold: f64) -> Bucket {
    if position < -threshold {
        Bucket::Oversold
    } else if position > threshold {
        Bucket::Overbought
    } else {
        Bucket::Neutral
    }
}
