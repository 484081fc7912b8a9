//! AlgoScreen Library
//!
//! Screens the exchange's USDT spot universe against technical filters
//! (24h volume range, close vs. EMA, Wilder RSI range).

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod rate_limit;
