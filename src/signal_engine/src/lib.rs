//! Signal engine: indicators over daily series and the strategies built on
//! top of them.
//!
//! Data flows one way: a [`Series`](market_data::models::series::Series) is
//! turned into an [`IndicatorSnapshot`](snapshot::IndicatorSnapshot), the
//! [`Screener`](screener::Screener) and [`WaveClassifier`](wave::WaveClassifier)
//! each produce [`Candidate`](candidate::Candidate)s, and the
//! [`aggregator`] merges and orders them.

pub mod aggregator;
pub mod candidate;
pub mod config;
pub mod envelope;
pub mod errors;
pub mod indicators;
pub mod screener;
pub mod snapshot;
pub mod wave;

pub use errors::{IndicatorError, IndicatorValue};
