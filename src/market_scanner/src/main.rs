use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use daily_store::db::migrate;
use daily_store::sink::SqliteSnapshotSink;
use market_data::io::sink::SnapshotSink;
use market_data::providers::SeriesProvider;
use market_data::providers::yahoo_chart::provider::YahooChartProvider;
use market_data::universe::{UniverseCatalog, load_catalog_path};
use market_scanner::cli::{Cli, RunMode};
use market_scanner::config::{AppConfig, Secrets};
use market_scanner::logging::init_logging;
use market_scanner::notify::telegram::TelegramNotifier;
use market_scanner::notify::{ConsoleNotifier, Notifier};
use market_scanner::runner::Runner;
use shared_utils::env::load_dotenv;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let dotenv = load_dotenv();
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            // logging is not configured yet
            eprintln!("configuration error: {e:#}");
            return ExitCode::from(1);
        }
    };
    init_logging(&config.log);
    if let Some(path) = dotenv {
        info!(path = %path.display(), "loaded .env");
    }

    match run(cli, config).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("run aborted: {e:#}");
            ExitCode::from(1)
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_env()?;
    if let Some(path) = &cli.universes {
        config.universes_path = path.clone();
    }
    config.validate()?;
    Ok(config)
}

async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<u8> {
    if cli.init_db {
        let applied = migrate::run_sqlite(&config.database_url)
            .with_context(|| format!("initialise database {}", config.database_url))?;
        info!(database = %config.database_url, applied, "database ready");
    }

    let modes = cli.modes();
    if modes.is_empty() {
        return Ok(0);
    }

    let needs_universes = modes
        .iter()
        .any(|m| matches!(m, RunMode::Potential | RunMode::Wave));
    let catalog = if needs_universes {
        load_catalog_path(&config.universes_path)?
    } else {
        UniverseCatalog::default()
    };

    let sink: Option<Arc<dyn SnapshotSink>> = if cli.dry_run || !needs_universes {
        None
    } else {
        let sink = SqliteSnapshotSink::new(config.database_url.clone());
        sink.check_ready()
            .await
            .with_context(|| format!("database {} unavailable", config.database_url))?;
        Some(Arc::new(sink))
    };

    let notifier: Arc<dyn Notifier> = if cli.dry_run {
        Arc::new(ConsoleNotifier)
    } else {
        Arc::new(TelegramNotifier::new(Secrets::from_env())?)
    };

    let provider: Arc<dyn SeriesProvider> =
        Arc::new(YahooChartProvider::with_config(config.provider.to_yahoo())?);

    let runner = Runner::new(config, catalog, provider, notifier, sink)?;
    let summary = runner.run(modes, Utc::now(), cli.force).await;
    summary.log();
    Ok(summary.exit_code())
}
