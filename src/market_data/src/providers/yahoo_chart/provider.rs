use std::num::NonZeroU32;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use governor::{DefaultDirectRateLimiter, Quota};
use nonzero_ext::nonzero;
use reqwest::{Client, StatusCode, header};
use snafu::{OptionExt, ResultExt};

use crate::models::series::Series;
use crate::providers::yahoo_chart::params::construct_params;
use crate::providers::yahoo_chart::response::ChartResponse;
use crate::providers::{
    ApiSnafu, ClientBuildSnafu, DecodeSnafu, InitSnafu, InvalidRateSnafu, InvalidSeriesSnafu,
    ProviderError, ProviderInitError, ReqwestSnafu, SeriesProvider, UnknownInstrumentSnafu,
};

const BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const USER_AGENT: &str = "Mozilla/5.0 (compatible; market-scanner/0.1)";

/// Connection settings for [`YahooChartProvider`].
#[derive(Debug, Clone)]
pub struct YahooChartConfig {
    pub base_url: String,
    /// Upper bound on outgoing requests per second, shared by all callers.
    pub requests_per_second: u32,
    pub request_timeout: Duration,
}

impl Default for YahooChartConfig {
    fn default() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            requests_per_second: 5,
            request_timeout: Duration::from_secs(20),
        }
    }
}

pub struct YahooChartProvider {
    client: Client,
    base_url: String,
    limiter: DefaultDirectRateLimiter,
}

impl YahooChartProvider {
    /// Creates a provider with the default endpoint and rate.
    pub fn new() -> Result<Self, ProviderInitError> {
        Self::with_config(YahooChartConfig::default())
    }

    pub fn with_config(config: YahooChartConfig) -> Result<Self, ProviderInitError> {
        let rate = NonZeroU32::new(config.requests_per_second).context(InvalidRateSnafu)?;

        let mut headers = header::HeaderMap::new();
        headers.insert(header::USER_AGENT, header::HeaderValue::from_static(USER_AGENT));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .context(ClientBuildSnafu)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            limiter: DefaultDirectRateLimiter::direct(
                Quota::per_second(rate).allow_burst(nonzero!(1u32)),
            ),
        })
    }
}

#[async_trait]
impl SeriesProvider for YahooChartProvider {
    async fn fetch_series(&self, code: &str, lookback_days: u32) -> Result<Series, ProviderError> {
        self.limiter.until_ready().await;

        let url = format!("{}/{}", self.base_url, code);
        let query_params = construct_params(lookback_days, Utc::now());
        let response = self
            .client
            .get(&url)
            .query(&query_params)
            .send()
            .await
            .context(ReqwestSnafu)?;

        let status = response.status();
        let body = response.text().await.context(ReqwestSnafu)?;

        // 404 bodies still carry a chart envelope with the "Not Found" code.
        let parsed = serde_json::from_str::<ChartResponse>(&body);
        if !status.is_success() {
            if status == StatusCode::NOT_FOUND
                || matches!(&parsed, Ok(r) if r.chart.error.as_ref().is_some_and(|e| e.is_not_found()))
            {
                return UnknownInstrumentSnafu { code }.fail();
            }
            return ApiSnafu {
                status: status.as_u16(),
                message: truncate(&body, 200),
            }
            .fail();
        }

        let chart = parsed
            .map_err(|e| e.to_string())
            .map_err(|message| DecodeSnafu { message }.build())?
            .chart;

        if let Some(err) = chart.error {
            if err.is_not_found() {
                return UnknownInstrumentSnafu { code }.fail();
            }
            return ApiSnafu {
                status: status.as_u16(),
                message: err.description.unwrap_or(err.code),
            }
            .fail();
        }

        let result = chart
            .result
            .and_then(|r| r.into_iter().next())
            .context(UnknownInstrumentSnafu { code })?;

        let bars = result.into_bars();
        tracing::debug!(code, bars = bars.len(), "fetched chart");
        Series::new(code, bars).context(InvalidSeriesSnafu)
    }
}

impl From<ProviderInitError> for ProviderError {
    fn from(source: ProviderInitError) -> Self {
        snafu::IntoError::into_error(InitSnafu, source)
    }
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
