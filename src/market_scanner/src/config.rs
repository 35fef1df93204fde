//! Application configuration.
//!
//! Non-secret settings come from a TOML file (every field has a default, so
//! an empty file or no file at all is valid). Secrets come from the
//! environment, after `.env` has been loaded.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use chrono_tz::Tz;
use market_data::providers::yahoo_chart::provider::YahooChartConfig;
use market_data::requests::batch::BatchConfig;
use market_data::universe::UniverseFilter;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use shared_utils::env::{get_env_var_opt, parse_env_var};
use signal_engine::config::{EngineConfig, EnvelopeConfig, ScreenerConfig, WaveConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive; `RUST_LOG` takes precedence.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// Calendar days of history requested per mode.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LookbackConfig {
    pub tqqq_days: u32,
    pub potential_days: u32,
    pub wave_days: u32,
}

impl Default for LookbackConfig {
    fn default() -> Self {
        Self {
            tqqq_days: 400,
            potential_days: 400,
            wave_days: 6 * 365,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: Option<String>,
    pub requests_per_second: u32,
    pub request_timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            requests_per_second: 5,
            request_timeout_secs: 20,
        }
    }
}

impl ProviderConfig {
    pub fn to_yahoo(&self) -> YahooChartConfig {
        let mut cfg = YahooChartConfig {
            requests_per_second: self.requests_per_second,
            request_timeout: Duration::from_secs(self.request_timeout_secs.max(1)),
            ..Default::default()
        };
        if let Some(url) = &self.base_url {
            cfg.base_url = url.clone();
        }
        cfg
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// SQLite file (or `sqlite://` URL); `DATABASE_URL` overrides it.
    pub database_url: String,
    /// IANA time zone that decides the trading day and weekend skip.
    pub timezone: String,
    pub universes_path: PathBuf,
    pub universe_filter: UniverseFilter,
    pub lookback: LookbackConfig,
    pub batch: BatchConfig,
    pub provider: ProviderConfig,
    pub log: LogConfig,
    pub screener: ScreenerConfig,
    pub wave: WaveConfig,
    pub envelope: EnvelopeConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "data/scanner.db".to_string(),
            timezone: "Asia/Seoul".to_string(),
            universes_path: PathBuf::from("configs/universes.toml"),
            universe_filter: UniverseFilter {
                common_stock_only: true,
                min_market_cap: None,
            },
            lookback: LookbackConfig::default(),
            batch: BatchConfig::default(),
            provider: ProviderConfig::default(),
            log: LogConfig::default(),
            screener: ScreenerConfig::default(),
            wave: WaveConfig::default(),
            envelope: EnvelopeConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(toml_str).context("failed to parse app config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Loads `path`, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read app config {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("in {}", path.display()))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.tz()?;
        self.engine().validate()?;
        anyhow::ensure!(self.batch.concurrency > 0, "batch.concurrency must be positive");
        anyhow::ensure!(self.batch.max_attempts > 0, "batch.max_attempts must be positive");
        anyhow::ensure!(
            self.provider.requests_per_second > 0,
            "provider.requests_per_second must be positive"
        );
        Ok(())
    }

    pub fn tz(&self) -> anyhow::Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("invalid timezone {:?}: {e}", self.timezone))
    }

    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            screener: self.screener.clone(),
            wave: self.wave.clone(),
            envelope: self.envelope.clone(),
        }
    }

    /// Applies environment overrides (`DATABASE_URL`, `SCANNER_CONCURRENCY`).
    pub fn apply_env(&mut self) -> anyhow::Result<()> {
        if let Some(url) = get_env_var_opt("DATABASE_URL") {
            self.database_url = url;
        }
        if let Some(n) = parse_env_var::<usize>("SCANNER_CONCURRENCY")? {
            self.batch.concurrency = n.max(1);
        }
        Ok(())
    }
}

/// Bot credentials for one Telegram chat.
#[derive(Debug, Clone)]
pub struct TelegramCredentials {
    pub bot_token: SecretString,
    pub chat_id: String,
}

/// Telegram credentials per channel; a missing pair disables that channel.
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    pub us: Option<TelegramCredentials>,
    pub korea: Option<TelegramCredentials>,
}

impl Secrets {
    pub fn from_env() -> Self {
        Self {
            us: credentials("TELEGRAM_BOT_TOKEN", "TELEGRAM_CHAT_ID"),
            korea: credentials("KOSPI_TELEGRAM_BOT_TOKEN", "KOSPI_TELEGRAM_CHAT_ID"),
        }
    }
}

fn credentials(token_var: &str, chat_var: &str) -> Option<TelegramCredentials> {
    match (get_env_var_opt(token_var), get_env_var_opt(chat_var)) {
        (Some(token), Some(chat_id)) => Some(TelegramCredentials {
            bot_token: SecretString::new(token.into()),
            chat_id,
        }),
        _ => {
            tracing::warn!(token_var, chat_var, "telegram credentials missing, channel disabled");
            None
        }
    }
}
