//! Daily bars from the Yahoo Finance chart endpoint.
//!
//! Korean listings are addressed with an exchange suffix (`005930.KS` for
//! KOSPI, `247540.KQ` for KOSDAQ); US listings use the bare ticker.

pub mod params;
pub mod provider;
pub mod response;
