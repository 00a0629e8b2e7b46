//! Technical indicators feeding the signal evaluator.
//!
//! - `IndicatorWindows`: window sizes for the trailing calculations
//! - `IndicatorSnapshot`: short/long moving average and RSI at one bar
//! - `TrailingIndicators`: the default [`IndicatorPort`] implementation
//!
//! Series helpers (`ema`, `macd`) back the `indicators` CLI subcommand.

pub mod ema;
pub mod macd;
pub mod rsi;

pub use ema::calculate_ema;
pub use macd::{calculate_macd, MacdPoint};
pub use rsi::{calculate_rsi, rsi_series};

use crate::domain::bar::Bar;
use crate::ports::indicator_port::IndicatorPort;

/// Trailing window sizes, in bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorWindows {
    pub short: usize,
    pub long: usize,
    pub rsi: usize,
}

impl Default for IndicatorWindows {
    fn default() -> Self {
        IndicatorWindows {
            short: 10,
            long: 50,
            rsi: 14,
        }
    }
}

impl IndicatorWindows {
    /// Bars of history required before a snapshot is defined: `max(windows) + 1`.
    pub fn warmup(&self) -> usize {
        self.short.max(self.long).max(self.rsi) + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorSnapshot {
    pub short_moving_avg: f64,
    pub long_moving_avg: f64,
    pub rsi: f64,
}

/// Simple moving average over the last `window` prices.
pub fn calculate_sma(prices: &[f64], window: usize) -> Option<f64> {
    if window == 0 || prices.len() < window {
        return None;
    }
    let tail = &prices[prices.len() - window..];
    Some(tail.iter().sum::<f64>() / window as f64)
}

/// SMA at every index of `prices`, `None` while warming up.
pub fn sma_series(prices: &[f64], window: usize) -> Vec<Option<f64>> {
    (0..prices.len())
        .map(|i| calculate_sma(&prices[..=i], window))
        .collect()
}

/// Moving averages and RSI computed from the trailing history on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrailingIndicators {
    windows: IndicatorWindows,
}

impl TrailingIndicators {
    pub fn new(windows: IndicatorWindows) -> Self {
        Self { windows }
    }

    pub fn windows(&self) -> IndicatorWindows {
        self.windows
    }
}

impl IndicatorPort for TrailingIndicators {
    fn warmup(&self) -> usize {
        self.windows.warmup()
    }

    fn snapshot(&self, history: &[Bar]) -> Option<IndicatorSnapshot> {
        if history.len() < self.warmup() {
            return None;
        }
        let prices = crate::domain::bar::prices(history);
        Some(IndicatorSnapshot {
            short_moving_avg: calculate_sma(&prices, self.windows.short)?,
            long_moving_avg: calculate_sma(&prices, self.windows.long)?,
            rsi: calculate_rsi(&prices, self.windows.rsi)?,
        })
    }
}
