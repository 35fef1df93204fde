//! Request orchestration on top of a [`SeriesProvider`](crate::providers::SeriesProvider).

pub mod batch;
