//! Orchestration of one invocation: fetch, analyse, persist, notify.
//!
//! Every collaborator sits behind a trait object, so a run can be driven by
//! scripted providers and recording notifiers in tests.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use chrono_tz::Tz;
use market_data::io::sink::{SnapshotRow, SnapshotSink};
use market_data::models::instrument::{Instrument, Universe};
use market_data::models::series::Series;
use market_data::providers::SeriesProvider;
use market_data::requests::batch::{SkipReason, SkipRecord, fetch_instrument, fetch_universe};
use market_data::universe::UniverseCatalog;
use signal_engine::IndicatorError;
use signal_engine::aggregator::aggregate;
use signal_engine::candidate::{Candidate, StrategyOutcome};
use signal_engine::config::BarPeriod;
use signal_engine::envelope;
use signal_engine::screener::Screener;
use signal_engine::wave::WaveClassifier;
use tracing::{error, info, warn};

use crate::cli::RunMode;
use crate::config::AppConfig;
use crate::notify::{Channel, Notifier};
use crate::report::{self, ReportKind, UniverseLabels};

/// Outcome of a side effect (storage or delivery) within a mode.
#[derive(Debug, Clone, PartialEq)]
pub enum StepResult {
    /// Not attempted (dry run, nothing to do, or the mode failed earlier).
    Skipped,
    Done(usize),
    Failed(String),
}

impl fmt::Display for StepResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepResult::Skipped => f.write_str("skipped"),
            StepResult::Done(n) => write!(f, "ok ({n})"),
            StepResult::Failed(e) => write!(f, "failed: {e}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModeSummary {
    pub mode: RunMode,
    pub analysed: usize,
    pub candidates: Vec<Candidate>,
    pub skipped: Vec<SkipRecord>,
    pub persisted: StepResult,
    pub notified: StepResult,
    /// Set when the mode could not complete.
    pub fatal: Option<String>,
}

impl ModeSummary {
    fn new(mode: RunMode) -> Self {
        Self {
            mode,
            analysed: 0,
            candidates: Vec::new(),
            skipped: Vec::new(),
            persisted: StepResult::Skipped,
            notified: StepResult::Skipped,
            fatal: None,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.fatal.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub trading_day: Option<NaiveDate>,
    /// True when the run was skipped because the local day is a weekend.
    pub weekend_skip: bool,
    pub modes: Vec<ModeSummary>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.modes.iter().all(|m| !m.is_fatal())
    }

    pub fn exit_code(&self) -> u8 {
        if self.is_success() { 0 } else { 1 }
    }

    /// Emits the summary through `tracing`.
    pub fn log(&self) {
        if self.weekend_skip {
            info!(day = ?self.trading_day, "weekend, nothing to do");
            return;
        }
        for m in &self.modes {
            info!(
                mode = m.mode.name(),
                analysed = m.analysed,
                candidates = m.candidates.len(),
                skipped = m.skipped.len(),
                persisted = %m.persisted,
                notified = %m.notified,
                fatal = m.fatal.as_deref().unwrap_or("-"),
                "mode finished"
            );
            for s in &m.skipped {
                info!(mode = m.mode.name(), code = %s.code, name = %s.name, reason = %s.reason, "skipped");
            }
        }
    }
}

/// True on Saturday and Sunday in `tz`.
pub fn is_weekend(now: DateTime<Utc>, tz: Tz) -> bool {
    matches!(now.with_timezone(&tz).weekday(), Weekday::Sat | Weekday::Sun)
}

pub struct Runner {
    config: AppConfig,
    tz: Tz,
    catalog: UniverseCatalog,
    provider: Arc<dyn SeriesProvider>,
    notifier: Arc<dyn Notifier>,
    sink: Option<Arc<dyn SnapshotSink>>,
}

impl Runner {
    /// `sink` is `None` for dry runs.
    pub fn new(
        config: AppConfig,
        catalog: UniverseCatalog,
        provider: Arc<dyn SeriesProvider>,
        notifier: Arc<dyn Notifier>,
        sink: Option<Arc<dyn SnapshotSink>>,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        let tz = config.tz()?;
        Ok(Self {
            config,
            tz,
            catalog,
            provider,
            notifier,
            sink,
        })
    }

    /// Runs `modes` in order as of `now`.
    pub async fn run(&self, modes: &[RunMode], now: DateTime<Utc>, force: bool) -> RunSummary {
        let today = now.with_timezone(&self.tz).date_naive();
        let mut summary = RunSummary {
            trading_day: Some(today),
            ..Default::default()
        };

        if !force && is_weekend(now, self.tz) {
            summary.weekend_skip = true;
            return summary;
        }

        for &mode in modes {
            info!(mode = mode.name(), %today, "starting mode");
            let result = match mode {
                RunMode::Tqqq => self.run_envelope().await,
                RunMode::Potential | RunMode::Wave => self.run_screen(mode, today).await,
                RunMode::All => continue,
            };
            if let Some(reason) = &result.fatal {
                error!(mode = mode.name(), reason = %reason, "mode failed");
            }
            summary.modes.push(result);
        }
        summary
    }

    async fn run_envelope(&self) -> ModeSummary {
        let cfg = &self.config.envelope;
        let mut summary = ModeSummary::new(RunMode::Tqqq);
        // The ETF is outside both index universes; the universe tag is only used for logging.
        let instrument = Instrument::new(cfg.symbol.clone(), cfg.symbol.clone(), Universe::Primary);

        let fetched = fetch_instrument(
            self.provider.as_ref(),
            &instrument,
            self.config.lookback.tqqq_days,
            &self.config.batch,
        )
        .await;

        let message = match fetched {
            Err(record) => {
                let message = report::format_envelope_failure(&cfg.symbol, &record.reason.to_string());
                summary.fatal = Some(format!("{} unavailable: {}", cfg.symbol, record.reason));
                summary.skipped.push(record);
                message
            }
            Ok(series) => match envelope::analyze(&series, cfg) {
                Ok(rep) => {
                    summary.analysed = 1;
                    info!(
                        symbol = %rep.symbol,
                        close = rep.close,
                        sma = rep.sma,
                        envelope = rep.envelope,
                        recommendation = %rep.recommendation,
                        "envelope analysis"
                    );
                    report::format_envelope(&rep, cfg.sma_window, cfg.envelope_pct)
                }
                Err(e) => {
                    let record = SkipRecord::new(&instrument, skip_reason(&e));
                    let message =
                        report::format_envelope_failure(&cfg.symbol, &record.reason.to_string());
                    summary.skipped.push(record);
                    message
                }
            },
        };

        summary.notified = self.deliver(Channel::Us, &message).await;
        summary
    }

    async fn run_screen(&self, mode: RunMode, today: NaiveDate) -> ModeSummary {
        let mut summary = ModeSummary::new(mode);
        let lookback = match mode {
            RunMode::Wave => self.config.lookback.wave_days,
            _ => self.config.lookback.potential_days,
        };

        let mut per_universe: Vec<Vec<Candidate>> = Vec::new();
        let mut rows: Vec<SnapshotRow> = Vec::new();

        for universe in Universe::ALL {
            let instruments = self
                .config
                .universe_filter
                .apply(self.catalog.instruments(universe));
            if instruments.is_empty() {
                continue;
            }
            let requested = instruments.len();
            let outcome = fetch_universe(
                Arc::clone(&self.provider),
                instruments,
                lookback,
                &self.config.batch,
            )
            .await;

            if outcome.is_source_unreachable() {
                summary.skipped.extend(outcome.skipped);
                summary.fatal = Some(format!(
                    "data source unreachable: all {requested} {} instruments failed",
                    self.catalog.label(universe)
                ));
                return summary;
            }

            info!(
                mode = mode.name(),
                %universe,
                fetched = outcome.series.len(),
                skipped = outcome.skipped.len(),
                "universe fetched"
            );
            summary.skipped.extend(outcome.skipped);
            rows.extend(
                outcome
                    .series
                    .iter()
                    .filter_map(|(inst, series)| SnapshotRow::from_series(inst, series)),
            );

            let result = self.evaluate(mode, &outcome.series);
            summary.analysed += outcome.series.len() - result.insufficient.len();
            for (inst, err) in &result.insufficient {
                summary.skipped.push(SkipRecord::new(inst, skip_reason(err)));
            }
            per_universe.push(result.candidates);
        }

        summary.candidates = aggregate(per_universe);
        summary.skipped.sort_by(|a, b| a.code.cmp(&b.code));

        summary.persisted = self.persist(&rows).await;

        let kind = match mode {
            RunMode::Wave => ReportKind::Wave {
                weekly: self.config.wave.bar_period == BarPeriod::Weekly,
            },
            _ => ReportKind::Potential,
        };
        let message = report::format_screen(
            kind,
            today,
            &summary.candidates,
            &UniverseLabels::from_catalog(&self.catalog),
            &summary.skipped,
        );
        summary.notified = self.deliver(Channel::Korea, &message).await;
        summary
    }

    fn evaluate(&self, mode: RunMode, items: &[(Instrument, Series)]) -> StrategyOutcome {
        match mode {
            RunMode::Wave => WaveClassifier::new(self.config.wave.clone()).screen(items),
            _ => Screener::new(self.config.screener.clone()).screen(items),
        }
    }

    async fn persist(&self, rows: &[SnapshotRow]) -> StepResult {
        let Some(sink) = &self.sink else {
            return StepResult::Skipped;
        };
        if rows.is_empty() {
            return StepResult::Skipped;
        }
        match sink.write(rows).await {
            Ok(n) => StepResult::Done(n),
            Err(e) => {
                warn!(error = %e, rows = rows.len(), "failed to store daily snapshot");
                StepResult::Failed(e.to_string())
            }
        }
    }

    async fn deliver(&self, channel: Channel, message: &str) -> StepResult {
        match self.notifier.notify(channel, message, None).await {
            Ok(()) => StepResult::Done(1),
            Err(e) => {
                warn!(%channel, error = %e, "failed to send notification");
                StepResult::Failed(e.to_string())
            }
        }
    }
}

fn skip_reason(err: &IndicatorError) -> SkipReason {
    match err {
        IndicatorError::InsufficientHistory {
            required,
            available,
            ..
        } => SkipReason::InsufficientHistory {
            available: *available,
            required: *required,
        },
        IndicatorError::Undefined { .. } => SkipReason::Unevaluable {
            message: err.to_string(),
        },
    }
}
