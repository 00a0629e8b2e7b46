//! Strategy parameters: indicator windows, RSI thresholds, sizing and risk limits.

use super::error::EngineError;
use super::indicator::IndicatorWindows;
use super::risk::RiskManager;
use super::signal::RsiThresholds;

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyParams {
    pub windows: IndicatorWindows,
    pub thresholds: RsiThresholds,
    /// Shares per entry; exits close the same amount.
    pub quantity: i64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub independent_take_profit: bool,
}

impl Default for StrategyParams {
    fn default() -> Self {
        StrategyParams {
            windows: IndicatorWindows::default(),
            thresholds: RsiThresholds::default(),
            quantity: 10,
            stop_loss_pct: 0.05,
            take_profit_pct: 0.10,
            independent_take_profit: false,
        }
    }
}

fn invalid(key: &str, reason: impl Into<String>) -> EngineError {
    EngineError::ConfigInvalid {
        section: "strategy".to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

impl StrategyParams {
    /// Range checks shared by the config loader and engine construction.
    pub fn validate(&self) -> Result<(), EngineError> {
        let windows = &self.windows;
        for (key, value) in [
            ("short_window", windows.short),
            ("long_window", windows.long),
            ("rsi_window", windows.rsi),
        ] {
            if value == 0 {
                return Err(invalid(key, format!("{key} must be at least 1")));
            }
        }
        if windows.short >= windows.long {
            return Err(invalid(
                "short_window",
                "short_window must be less than long_window",
            ));
        }

        let thresholds = &self.thresholds;
        for (key, value) in [
            ("oversold", thresholds.oversold),
            ("overbought", thresholds.overbought),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(invalid(key, format!("{key} must be between 0 and 100")));
            }
        }
        if thresholds.oversold >= thresholds.overbought {
            return Err(invalid("oversold", "oversold must be below overbought"));
        }

        if self.quantity < 1 {
            return Err(invalid("quantity", "quantity must be at least 1"));
        }
        if !(0.0..1.0).contains(&self.stop_loss_pct) {
            return Err(invalid(
                "stop_loss_pct",
                "stop_loss_pct must be in [0, 1)",
            ));
        }
        if !self.take_profit_pct.is_finite() || self.take_profit_pct < 0.0 {
            return Err(invalid(
                "take_profit_pct",
                "take_profit_pct must be non-negative",
            ));
        }
        Ok(())
    }

    pub fn risk_manager(&self) -> RiskManager {
        RiskManager {
            stop_loss_pct: self.stop_loss_pct,
            take_profit_pct: self.take_profit_pct,
            independent_take_profit: self.independent_take_profit,
        }
    }
}
