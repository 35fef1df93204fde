//! Provider abstraction for daily series sources.
//!
//! This module defines the [`SeriesProvider`] trait, the single boundary
//! through which the screening runs obtain price history. Each concrete
//! provider (e.g. the Yahoo chart API) implements it and maps vendor failures
//! onto [`ProviderError`], keeping "unknown instrument" distinguishable from
//! transient failures so callers can decide between skip and retry.
//!
//! The trait is designed for async usage and supports dynamic dispatch
//! (`dyn SeriesProvider`) for runtime selection of providers.
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use market_data::models::series::Series;
//! use market_data::providers::{ProviderError, SeriesProvider};
//!
//! struct EmptyProvider;
//!
//! #[async_trait]
//! impl SeriesProvider for EmptyProvider {
//!     async fn fetch_series(
//!         &self,
//!         code: &str,
//!         _lookback_days: u32,
//!     ) -> Result<Series, ProviderError> {
//!         Ok(Series::new(code, vec![]).expect("empty series is valid"))
//!     }
//! }
//! ```

pub mod yahoo_chart;

use async_trait::async_trait;
use snafu::{Backtrace, Snafu};

use crate::models::series::{Series, SeriesError};

/// Trait for fetching the daily history of one instrument.
#[async_trait]
pub trait SeriesProvider: Send + Sync {
    /// Fetches daily bars covering the last `lookback_days` calendar days.
    ///
    /// # Arguments
    ///
    /// * `code` - Provider symbol of the instrument (e.g. "005930.KS", "TQQQ").
    /// * `lookback_days` - Calendar days of history to request.
    ///
    /// # Returns
    ///
    /// * `Ok(Series)` - Bars in ascending date order.
    /// * `Err(ProviderError::UnknownInstrument)` - The provider does not know the symbol.
    /// * `Err(_)` - Any other failure; see [`ProviderError::is_retryable`].
    async fn fetch_series(&self, code: &str, lookback_days: u32) -> Result<Series, ProviderError>;
}

/// Errors that can occur during the creation of a provider instance
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderInitError {
    /// failed to init reqwest client
    #[snafu(display("Failed to build HTTP client: {source}"))]
    ClientBuild {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// The configured request rate is zero.
    #[snafu(display("Requests per second must be greater than zero"))]
    InvalidRate { backtrace: Backtrace },
}

/// Errors that can occur within a `SeriesProvider` implementation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderError {
    /// The provider has no data for this symbol. Permanent; never retried.
    #[snafu(display("Unknown instrument: {code}"))]
    UnknownInstrument { code: String, backtrace: Backtrace },

    /// An error during an API request (e.g., network failure, timeout).
    #[snafu(display("API request failed: {source}"))]
    Reqwest {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// The provider's API answered with a non-success status.
    #[snafu(display("API error ({status}): {message}"))]
    Api {
        status: u16,
        message: String,
        backtrace: Backtrace,
    },

    /// A transient failure that did not come from the HTTP client (e.g. a timeout
    /// imposed by the caller).
    #[snafu(display("Transient fetch error: {message}"))]
    Transient {
        message: String,
        backtrace: Backtrace,
    },

    /// The response body could not be interpreted.
    #[snafu(display("Failed to decode provider response: {message}"))]
    Decode {
        message: String,
        backtrace: Backtrace,
    },

    /// The bars returned do not form a valid series.
    #[snafu(display("Provider returned an invalid series: {source}"))]
    InvalidSeries {
        source: SeriesError,
        backtrace: Backtrace,
    },

    /// An error during provider configuration or initialization.
    #[snafu(display("Provider initialization error: {source}"))]
    Init {
        #[snafu(backtrace)]
        source: ProviderInitError,
    },
}

impl ProviderError {
    /// Whether a retry has a chance of succeeding.
    ///
    /// Unknown instruments and malformed data are permanent; network errors,
    /// rate limiting (429) and server errors (5xx) are transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Reqwest { .. } | ProviderError::Transient { .. } => true,
            ProviderError::Api { status, .. } => *status == 429 || *status >= 500,
            ProviderError::UnknownInstrument { .. }
            | ProviderError::Decode { .. }
            | ProviderError::InvalidSeries { .. }
            | ProviderError::Init { .. } => false,
        }
    }

    pub fn is_unknown_instrument(&self) -> bool {
        matches!(self, ProviderError::UnknownInstrument { .. })
    }
}
