//! Core domain types and logic.

pub mod bar;
pub mod series;
pub mod predicate;
pub mod strategy;
pub mod signal;
pub mod backtest;
pub mod metrics;
pub mod ranking;
pub mod evaluation;
pub mod market_context;
pub mod cache;
pub mod universe;
pub mod config_validation;
pub mod error;
