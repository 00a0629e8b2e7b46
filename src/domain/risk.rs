//! Stop-loss / take-profit evaluation against an open position.

use super::position::PositionState;

/// Verdict of the risk check for one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskVerdict {
    None,
    StopLossExit,
    TakeProfitExit,
}

/// Stop-loss check: `price < entry * (1 - stop_loss_pct)` on an open position.
///
/// A `stop_loss_pct` of zero exits on any price below entry.
///
/// `take_profit_pct` is part of the risk contract but unused here: by default
/// take-profit only fires together with an overbought reading, see
/// [`evaluate_signal`](super::signal::evaluate_signal), and the price-only
/// variant lives in [`RiskManager::evaluate`] under `independent_take_profit`.
pub fn evaluate_risk(
    position: &PositionState,
    current_price: f64,
    stop_loss_pct: f64,
    _take_profit_pct: f64,
) -> RiskVerdict {
    let Some(entry) = position.entry_price().filter(|_| position.is_open()) else {
        return RiskVerdict::None;
    };
    if current_price < entry * (1.0 - stop_loss_pct) {
        return RiskVerdict::StopLossExit;
    }
    RiskVerdict::None
}

/// Risk thresholds fixed for the whole run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskManager {
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    /// Also close on `price > entry * (1 + take_profit_pct)` without waiting
    /// for an overbought RSI.
    pub independent_take_profit: bool,
}

impl RiskManager {
    pub fn evaluate(&self, position: &PositionState, current_price: f64) -> RiskVerdict {
        let verdict = evaluate_risk(
            position,
            current_price,
            self.stop_loss_pct,
            self.take_profit_pct,
        );
        if verdict != RiskVerdict::None || !self.independent_take_profit {
            return verdict;
        }
        match position.entry_price().filter(|_| position.is_open()) {
            Some(entry)
                if self.take_profit_pct > 0.0
                    && current_price > entry * (1.0 + self.take_profit_pct) =>
            {
                RiskVerdict::TakeProfitExit
            }
            _ => RiskVerdict::None,
        }
    }
}
