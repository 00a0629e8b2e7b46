//! Trend + RSI signal evaluation.
//!
//! Priority, first match wins:
//! 1. `short > long && rsi < oversold` -> enter (hold if already long)
//! 2. long and (`short < long` or `rsi > overbought && price > entry * (1 + tp)`) -> exit
//! 3. hold

use super::indicator::IndicatorSnapshot;
use super::position::PositionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitTrigger {
    TrendReversal,
    TakeProfit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    EnterLong,
    ExitLong(ExitTrigger),
    Hold,
}

/// RSI bounds for oversold entries and overbought exits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RsiThresholds {
    pub oversold: f64,
    pub overbought: f64,
}

impl Default for RsiThresholds {
    fn default() -> Self {
        RsiThresholds {
            oversold: 30.0,
            overbought: 70.0,
        }
    }
}

pub fn evaluate_signal(
    indicators: &IndicatorSnapshot,
    position: &PositionState,
    current_price: f64,
    take_profit_pct: f64,
    thresholds: &RsiThresholds,
) -> Signal {
    let short = indicators.short_moving_avg;
    let long = indicators.long_moving_avg;

    if short > long && indicators.rsi < thresholds.oversold {
        return if position.is_open() {
            Signal::Hold
        } else {
            Signal::EnterLong
        };
    }

    let Some(entry) = position.entry_price().filter(|_| position.is_open()) else {
        return Signal::Hold;
    };

    if short < long {
        return Signal::ExitLong(ExitTrigger::TrendReversal);
    }
    if indicators.rsi > thresholds.overbought && current_price > entry * (1.0 + take_profit_pct) {
        return Signal::ExitLong(ExitTrigger::TakeProfit);
    }
    Signal::Hold
}
