//! Candlekeep Core: day-by-day OHLCV history collection for crypto spot markets.
//!
//! This crate contains:
//! - Domain types (bars, intervals, fetch requests)
//! - Exchange client trait with Binance, OKX and Huobi adapters
//! - Day fetcher: pagination over one UTC day plus reconciliation
//! - Batch driver with per-combination failure isolation
//! - CSV storage keyed by exchange / market / day
//! - TOML run configuration

pub mod config;
pub mod domain;
pub mod exchange;
pub mod fetch;
pub mod store;
