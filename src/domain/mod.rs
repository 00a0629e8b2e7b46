//! Core domain types and logic.

pub mod backtest;
pub mod bar;
pub mod config_validation;
pub mod cost;
pub mod engine;
pub mod error;
pub mod forecast;
pub mod indicator;
pub mod metrics;
pub mod order;
pub mod portfolio;
pub mod position;
pub mod risk;
pub mod signal;
pub mod strategy;
