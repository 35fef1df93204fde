//! Universe-wide fetch with a bounded worker pool and per-instrument retry.
//!
//! Every instrument gets its own task; a [`Semaphore`] caps how many run at
//! once. A failing instrument never aborts the batch: it ends up in
//! [`BatchOutcome::skipped`] with the reason, and the caller decides whether
//! the run as a whole is still meaningful via
//! [`BatchOutcome::is_source_unreachable`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::{Id, JoinSet};
use tracing::{debug, warn};

use crate::models::instrument::Instrument;
use crate::models::series::Series;
use crate::providers::{ProviderError, SeriesProvider, TransientSnafu};

/// Worker pool and retry settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Maximum number of in-flight fetches.
    pub concurrency: usize,
    /// Attempts per instrument, including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for every further attempt.
    pub base_delay_ms: u64,
    /// Upper bound for a single attempt.
    pub attempt_timeout_secs: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            max_attempts: 2,
            base_delay_ms: 500,
            attempt_timeout_secs: 30,
        }
    }
}

impl BatchConfig {
    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }
}

/// Why an instrument did not make it into the analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// The provider does not know the symbol. Never retried.
    UnknownInstrument,
    /// Fetching failed after `attempts` tries.
    DataFetch { attempts: u32, message: String },
    /// Data arrived but is too short for the requested analysis.
    InsufficientHistory { available: usize, required: usize },
    /// Data arrived but an indicator the analysis needs is undefined for it.
    Unevaluable { message: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnknownInstrument => write!(f, "unknown instrument"),
            SkipReason::DataFetch { attempts, message } => {
                write!(f, "fetch failed after {attempts} attempt(s): {message}")
            }
            SkipReason::InsufficientHistory {
                available,
                required,
            } => write!(f, "insufficient history ({available}/{required} bars)"),
            SkipReason::Unevaluable { message } => write!(f, "not evaluable: {message}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkipRecord {
    pub code: String,
    pub name: String,
    pub reason: SkipReason,
    /// Whether the last error was one a retry could have fixed.
    #[serde(skip)]
    pub retryable: bool,
}

impl SkipRecord {
    pub fn new(instrument: &Instrument, reason: SkipReason) -> Self {
        Self {
            code: instrument.code.clone(),
            name: instrument.name.clone(),
            reason,
            retryable: false,
        }
    }
}

/// Result of fetching one universe; both lists are sorted by code.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub series: Vec<(Instrument, Series)>,
    pub skipped: Vec<SkipRecord>,
}

impl BatchOutcome {
    pub fn requested(&self) -> usize {
        self.series.len() + self.skipped.len()
    }

    /// True when nothing was fetched and every failure was transient, which
    /// points at the source being down rather than at individual symbols.
    pub fn is_source_unreachable(&self) -> bool {
        self.series.is_empty()
            && !self.skipped.is_empty()
            && self.skipped.iter().all(|s| s.retryable)
    }
}

/// Fetches `lookback_days` of history for every instrument.
///
/// Instruments are looked up by their `remote_symbol`. Results come back in
/// code order regardless of completion order.
pub async fn fetch_universe(
    provider: Arc<dyn SeriesProvider>,
    instruments: Vec<Instrument>,
    lookback_days: u32,
    config: &BatchConfig,
) -> BatchOutcome {
    let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));
    let mut tasks = JoinSet::new();
    let mut pending: HashMap<Id, Instrument> = HashMap::with_capacity(instruments.len());

    for instrument in instruments {
        let provider = Arc::clone(&provider);
        let semaphore = Arc::clone(&semaphore);
        let config = config.clone();
        let task_instrument = instrument.clone();
        let handle = tasks.spawn(async move {
            // The semaphore is never closed, so acquire only fails on shutdown.
            let _permit = semaphore.acquire_owned().await.ok();
            let result =
                fetch_instrument(provider.as_ref(), &task_instrument, lookback_days, &config).await;
            (task_instrument, result)
        });
        pending.insert(handle.id(), instrument);
    }

    let mut outcome = BatchOutcome::default();
    while let Some(joined) = tasks.join_next_with_id().await {
        match joined {
            Ok((id, (instrument, result))) => {
                pending.remove(&id);
                match result {
                    Ok(series) => outcome.series.push((instrument, series)),
                    Err(record) => outcome.skipped.push(record),
                }
            }
            Err(e) => {
                let Some(instrument) = pending.remove(&e.id()) else {
                    warn!(error = %e, "fetch task failed for an unknown instrument");
                    continue;
                };
                let cause = if e.is_panic() { "panicked" } else { "was cancelled" };
                warn!(code = %instrument.code, error = %e, "fetch task {cause}");
                outcome.skipped.push(SkipRecord::new(
                    &instrument,
                    SkipReason::DataFetch {
                        attempts: 0,
                        message: format!("fetch task {cause}"),
                    },
                ));
            }
        }
    }

    outcome.series.sort_by(|a, b| a.0.code.cmp(&b.0.code));
    outcome.skipped.sort_by(|a, b| a.code.cmp(&b.code));
    debug!(
        fetched = outcome.series.len(),
        skipped = outcome.skipped.len(),
        "batch fetch finished"
    );
    outcome
}

/// Fetches one instrument with the bounded retry policy of [`BatchConfig`].
///
/// Unknown instruments fail on the first attempt; other errors are retried
/// while [`ProviderError::is_retryable`] holds and attempts remain.
pub async fn fetch_instrument(
    provider: &dyn SeriesProvider,
    instrument: &Instrument,
    lookback_days: u32,
    config: &BatchConfig,
) -> Result<Series, SkipRecord> {
    let max_attempts = config.max_attempts.max(1);
    let timeout = Duration::from_secs(config.attempt_timeout_secs.max(1));
    let mut attempt = 0;

    loop {
        attempt += 1;
        let result = match tokio::time::timeout(
            timeout,
            provider.fetch_series(&instrument.remote_symbol, lookback_days),
        )
        .await
        {
            Ok(r) => r,
            Err(_) => TransientSnafu {
                message: format!("attempt timed out after {}s", timeout.as_secs()),
            }
            .fail(),
        };

        let err: ProviderError = match result {
            Ok(series) => return Ok(series),
            Err(e) => e,
        };

        if err.is_unknown_instrument() {
            warn!(code = %instrument.code, "unknown instrument, skipping");
            return Err(SkipRecord::new(instrument, SkipReason::UnknownInstrument));
        }

        let retryable = err.is_retryable();
        if !retryable || attempt >= max_attempts {
            warn!(code = %instrument.code, attempt, error = %err, "giving up on instrument");
            let mut record = SkipRecord::new(
                instrument,
                SkipReason::DataFetch {
                    attempts: attempt,
                    message: err.to_string(),
                },
            );
            record.retryable = retryable;
            return Err(record);
        }

        let delay = config.backoff(attempt);
        warn!(
            code = %instrument.code,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "fetch failed, retrying"
        );
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles() {
        let config = BatchConfig::default();
        assert_eq!(config.backoff(1), Duration::from_millis(500));
        assert_eq!(config.backoff(2), Duration::from_millis(1000));
        assert_eq!(config.backoff(3), Duration::from_millis(2000));
    }

    #[test]
    fn unreachable_requires_all_retryable_failures() {
        let inst = Instrument::new("000001", "A", crate::models::instrument::Universe::Primary);
        let mut transient = SkipRecord::new(
            &inst,
            SkipReason::DataFetch {
                attempts: 2,
                message: "timeout".into(),
            },
        );
        transient.retryable = true;

        let outcome = BatchOutcome {
            series: vec![],
            skipped: vec![transient.clone()],
        };
        assert!(outcome.is_source_unreachable());

        let outcome = BatchOutcome {
            series: vec![],
            skipped: vec![transient, SkipRecord::new(&inst, SkipReason::UnknownInstrument)],
        };
        assert!(!outcome.is_source_unreachable());

        assert!(!BatchOutcome::default().is_source_unreachable());
    }

    #[test]
    fn skip_reason_display() {
        let r = SkipReason::DataFetch {
            attempts: 2,
            message: "503".into(),
        };
        assert_eq!(r.to_string(), "fetch failed after 2 attempt(s): 503");
        assert_eq!(
            SkipReason::InsufficientHistory {
                available: 10,
                required: 52
            }
            .to_string(),
            "insufficient history (10/52 bars)"
        );
    }
}
