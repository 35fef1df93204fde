//! Candidate screener: volume surge, moving-average crossover and up-trend
//! rules over an [`IndicatorSnapshot`].

use market_data::models::instrument::Instrument;
use market_data::models::series::Series;
use tracing::debug;

use crate::candidate::{
    Candidate, CandidateCategory, CandidateDetail, ScreenMetrics, ScreenRule, StrategyOutcome,
};
use crate::config::{MaRule, ScreenerConfig};
use crate::errors::{IndicatorError, IndicatorValue};
use crate::snapshot::{IndicatorSnapshot, SnapshotParams};

/// Outcome of one rule: `None` when its inputs are unavailable.
struct RuleResult {
    /// Weight counted in the denominator.
    possible: f64,
    /// Matched rule and the weight it earns.
    matched: Option<(ScreenRule, f64)>,
}

pub struct Screener {
    config: ScreenerConfig,
    params: SnapshotParams,
}

impl Screener {
    pub fn new(config: ScreenerConfig) -> Self {
        let params = SnapshotParams::from(&config);
        Self { config, params }
    }

    pub fn config(&self) -> &ScreenerConfig {
        &self.config
    }

    /// Evaluates one instrument.
    ///
    /// `Ok(None)` means the instrument was evaluated and is not a candidate;
    /// an error means none of the rules had enough history.
    pub fn evaluate(
        &self,
        instrument: &Instrument,
        series: &Series,
    ) -> IndicatorValue<Option<Candidate>> {
        let Some(snap) = IndicatorSnapshot::compute(series, &self.params) else {
            return Err(self.insufficient(0));
        };
        self.evaluate_snapshot(instrument, &snap)
    }

    pub fn evaluate_snapshot(
        &self,
        instrument: &Instrument,
        snap: &IndicatorSnapshot,
    ) -> IndicatorValue<Option<Candidate>> {
        let rules = [
            self.ma_rule(snap),
            self.volume_rule(snap),
            self.up_trend_rule(snap),
        ];
        let evaluable: Vec<&RuleResult> = rules.iter().flatten().collect();
        if evaluable.is_empty() {
            return Err(self.insufficient(snap.bars));
        }

        if !self.passes_filters(instrument, snap) {
            debug!(code = %instrument.code, "filtered out before screening");
            return Ok(None);
        }

        let possible: f64 = evaluable.iter().map(|r| r.possible).sum();
        let matched: Vec<(ScreenRule, f64)> = evaluable.iter().filter_map(|r| r.matched).collect();
        if matched.is_empty() || possible <= 0.0 {
            return Ok(None);
        }
        let earned: f64 = matched.iter().map(|(_, w)| w).sum();

        // Highest weight wins; on equal weight the higher-priority category.
        let category = matched
            .iter()
            .map(|(rule, w)| (rule.category(), *w))
            .fold(None::<(CandidateCategory, f64)>, |best, (cat, w)| match best {
                Some((bc, bw)) if bw > w || (bw == w && bc <= cat) => Some((bc, bw)),
                _ => Some((cat, w)),
            })
            .map(|(cat, _)| cat)
            .unwrap_or(CandidateCategory::UpTrend);

        Ok(Some(Candidate {
            instrument: instrument.clone(),
            date: snap.date,
            category,
            score: (earned / possible).clamp(0.0, 1.0),
            close: snap.close,
            change_rate: snap.change_rate,
            detail: CandidateDetail::Screen {
                matched: matched.iter().map(|(r, _)| *r).collect(),
                metrics: ScreenMetrics {
                    volume_ratio: snap.volume_surge_ratio.as_ref().ok().copied(),
                    sma_short: snap.sma_short.as_ref().ok().copied(),
                    sma_long: snap.sma_long.as_ref().ok().copied(),
                    up_streak: snap.up_streak.as_ref().ok().copied(),
                },
            },
        }))
    }

    /// Screens a universe; the candidate list is sorted by code.
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

    fn passes_filters(&self, instrument: &Instrument, snap: &IndicatorSnapshot) -> bool {
        if let (Some(floor), Some(cap)) = (self.config.min_market_cap, instrument.market_cap) {
            if cap < floor {
                return false;
            }
        }
        if let (Some(max), Ok(trend)) = (self.config.max_ma240_distance, &snap.sma_trend) {
            if *trend > 0.0 && (snap.close / trend - 1.0).abs() > max {
                return false;
            }
        }
        true
    }

    fn volume_rule(&self, snap: &IndicatorSnapshot) -> Option<RuleResult> {
        let ratio = snap.volume_surge_ratio.as_ref().ok()?;
        let w = self.config.weights.volume_surge;
        Some(RuleResult {
            possible: w,
            matched: (*ratio >= self.config.volume_surge_multiple).then_some((ScreenRule::VolumeSurge, w)),
        })
    }

    fn ma_rule(&self, snap: &IndicatorSnapshot) -> Option<RuleResult> {
        let short = *snap.sma_short.as_ref().ok()?;
        let long = *snap.sma_long.as_ref().ok()?;
        let cross = match (&snap.prev_sma_short, &snap.prev_sma_long) {
            (Ok(ps), Ok(pl)) => Some(ps <= pl && short > long),
            _ => None,
        };
        let weights = &self.config.weights;
        let matched = match (self.config.ma_rule, cross) {
            (_, Some(true)) => Some((ScreenRule::MaCross, weights.ma_cross)),
            (MaRule::CrossOrAbove, _) if short > long => {
                Some((ScreenRule::MaAlignment, weights.ma_alignment))
            }
            (MaRule::CrossOnly, None) => return None,
            _ => None,
        };
        Some(RuleResult {
            possible: weights.ma_cross,
            matched,
        })
    }

    fn up_trend_rule(&self, snap: &IndicatorSnapshot) -> Option<RuleResult> {
        let streak = *snap.up_streak.as_ref().ok()?;
        let w = self.config.weights.up_trend;
        Some(RuleResult {
            possible: w,
            matched: (streak > self.config.up_streak_threshold).then_some((ScreenRule::UpTrend, w)),
        })
    }

    fn insufficient(&self, available: usize) -> IndicatorError {
        let c = &self.config;
        IndicatorError::InsufficientHistory {
            indicator: "screener",
            required: c
                .ma_long
                .min(c.volume_window + 1)
                .min(c.up_streak_window + 1),
            available,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate};
    use market_data::models::bar::Bar;
    use market_data::models::instrument::Universe;

    use super::*;

    fn series_from(closes: &[f64], volumes: &[f64]) -> Series {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let bars = closes
            .iter()
            .zip(volumes)
            .enumerate()
            .map(|(i, (c, v))| Bar::new(start + Duration::days(i as i64), *c, *c, *c, *c, *v))
            .collect();
        Series::new("T", bars).unwrap()
    }

    fn inst() -> Instrument {
        Instrument::new("000001", "Test", Universe::Primary)
    }

    #[test]
    fn too_short_for_any_rule() {
        let s = series_from(&[1.0, 2.0, 3.0], &[1.0; 3]);
        let err = Screener::new(ScreenerConfig::default())
            .evaluate(&inst(), &s)
            .unwrap_err();
        assert!(err.is_insufficient());
    }

    #[test]
    fn strict_cross_fires_on_the_crossing_bar() {
        // 20 flat closes then a jump: prior short == long, current short > long.
        let mut closes = vec![100.0; 20];
        closes.push(110.0);
        let s = series_from(&closes, &[1000.0; 21]);
        let cfg = ScreenerConfig {
            ma_rule: MaRule::CrossOnly,
            ..Default::default()
        };
        let c = Screener::new(cfg).evaluate(&inst(), &s).unwrap().unwrap();
        assert_eq!(c.category, CandidateCategory::MaCrossover);
        match &c.detail {
            CandidateDetail::Screen { matched, .. } => assert_eq!(matched, &vec![ScreenRule::MaCross]),
            other => panic!("unexpected detail {other:?}"),
        }
        // volume 0.4 + ma 0.4 + up-trend 0.2 evaluable; only ma matched
        assert!((c.score - 0.4).abs() < 1e-9);
    }

    #[test]
    fn cross_only_ignores_alignment() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let cfg = ScreenerConfig {
            ma_rule: MaRule::CrossOnly,
            up_streak_threshold: 100,
            ..Default::default()
        };
        let s = series_from(&closes, &[1000.0; 30]);
        assert!(Screener::new(cfg).evaluate(&inst(), &s).unwrap().is_none());
    }

    #[test]
    fn market_cap_floor_filters() {
        let mut closes = vec![100.0; 20];
        closes.push(110.0);
        let s = series_from(&closes, &[1000.0; 21]);
        let cfg = ScreenerConfig {
            min_market_cap: Some(5.0e11),
            ..Default::default()
        };
        let small = inst().with_market_cap(1.0e11);
        assert!(Screener::new(cfg.clone()).evaluate(&small, &s).unwrap().is_none());
        let unknown = inst();
        assert!(Screener::new(cfg).evaluate(&unknown, &s).unwrap().is_some());
    }

    #[test]
    fn long_trend_distance_filter() {
        let mut closes = vec![100.0; 240];
        closes.push(150.0);
        let s = series_from(&closes, &[1000.0; 241]);
        let cfg = ScreenerConfig {
            max_ma240_distance: Some(0.10),
            ..Default::default()
        };
        assert!(Screener::new(cfg).evaluate(&inst(), &s).unwrap().is_none());
    }

    #[test]
    fn volume_only_match_is_volume_category() {
        let mut volumes = vec![1000.0; 20];
        volumes.push(5000.0);
        let s = series_from(&[100.0; 21], &volumes);
        let c = Screener::new(ScreenerConfig::default())
            .evaluate(&inst(), &s)
            .unwrap()
            .unwrap();
        assert_eq!(c.category, CandidateCategory::VolumeSurge);
    }
}
