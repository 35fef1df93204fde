#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate, TimeZone, Utc, Weekday};
use market_data::models::bar::Bar;
use market_data::models::series::Series;
use market_data::providers::{
    ProviderError, SeriesProvider, TransientSnafu, UnknownInstrumentSnafu,
};
use market_data::universe::{UniverseCatalog, load_catalog_str};
use market_scanner::config::AppConfig;
use market_scanner::notify::{Channel, Notifier, NotifyError, RejectedSnafu};

pub const CATALOG: &str = r#"
    [universes.primary]
    label = "KOSPI"
    symbol_suffix = ".KS"
    instruments = [
        { code = "005930", name = "삼성전자" },
        { code = "000660", name = "SK하이닉스" },
        { code = "999990", name = "상장폐지" },
    ]

    [universes.secondary]
    label = "KOSDAQ"
    symbol_suffix = ".KQ"
    instruments = [
        { code = "247540", name = "에코프로비엠" },
    ]
"#;

pub fn catalog() -> UniverseCatalog {
    load_catalog_str(CATALOG).unwrap()
}

/// Config with retries that do not slow the tests down.
pub fn test_config() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.batch.base_delay_ms = 1;
    cfg.batch.attempt_timeout_secs = 5;
    cfg.universe_filter.common_stock_only = false;
    cfg
}

/// Friday 2025-03-07, 09:00 in Seoul.
pub fn friday() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 7, 0, 0, 0).unwrap()
}

/// Saturday 2025-03-08, 09:00 in Seoul.
pub fn saturday() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 8, 0, 0, 0).unwrap()
}

/// `closes.len()` weekday bars ending on 2025-03-07.
pub fn series(code: &str, closes: &[f64], volumes: &[f64]) -> Series {
    assert_eq!(closes.len(), volumes.len());
    let mut dates = Vec::with_capacity(closes.len());
    let mut d = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
    while dates.len() < closes.len() {
        if !matches!(d.weekday(), Weekday::Sat | Weekday::Sun) {
            dates.push(d);
        }
        d -= Duration::days(1);
    }
    dates.reverse();

    let bars = dates
        .into_iter()
        .zip(closes.iter().zip(volumes))
        .map(|(date, (&c, &v))| Bar::new(date, c, c * 1.01, c * 0.99, c, v))
        .collect();
    Series::new(code, bars).unwrap()
}

/// Closes rising 1% a day with flat volume, except a 30x spike on the last bar.
pub fn surging(code: &str, n: usize) -> Series {
    let closes: Vec<f64> = (0..n).map(|i| 10_000.0 * 1.01f64.powi(i as i32)).collect();
    let mut volumes = vec![1_000.0; n];
    volumes[n - 1] = 30_000.0;
    series(code, &closes, &volumes)
}

/// Flat prices and volume.
pub fn flat(code: &str, n: usize) -> Series {
    series(code, &vec![50_000.0; n], &vec![1_000.0; n])
}

pub enum Script {
    Ok(Series),
    Unknown,
    Transient,
}

/// Provider answering from a fixed table keyed by remote symbol.
#[derive(Default)]
pub struct ScriptedProvider {
    scripts: HashMap<String, Script>,
    pub calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn with(mut self, symbol: &str, script: Script) -> Self {
        self.scripts.insert(symbol.to_string(), script);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SeriesProvider for ScriptedProvider {
    async fn fetch_series(&self, code: &str, _lookback_days: u32) -> Result<Series, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.scripts.get(code) {
            Some(Script::Ok(s)) => Ok(s.clone()),
            Some(Script::Transient) => TransientSnafu { message: "connection reset" }.fail(),
            Some(Script::Unknown) | None => UnknownInstrumentSnafu { code }.fail(),
        }
    }
}

/// Notifier that keeps every message, optionally failing each delivery.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(Channel, String)>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn messages(&self) -> Vec<(Channel, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(
        &self,
        channel: Channel,
        message: &str,
        _image: Option<Vec<u8>>,
    ) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push((channel, message.to_string()));
        if self.fail {
            return RejectedSnafu {
                status: 401u16,
                description: "Unauthorized",
            }
            .fail();
        }
        Ok(())
    }
}
