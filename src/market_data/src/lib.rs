//! Market data layer: OHLCV models, index universes, series providers and the
//! bounded-retry batch fetcher that feeds the signal engine.

pub mod io;
pub mod models;
pub mod providers;
pub mod requests;
pub mod universe;
