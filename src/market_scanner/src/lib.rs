//! Daily index screener: wires market data, the signal engine, storage and
//! chat alerts into one batch run.

pub mod cli;
pub mod config;
pub mod logging;
pub mod notify;
pub mod report;
pub mod runner;
