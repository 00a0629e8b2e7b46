//! Transaction cost model: per-share commission with a floor, fixed slippage spread.

use super::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostModel {
    pub per_share_cost: f64,
    pub min_trade_cost: f64,
    pub slippage_spread: f64,
}

/// Execution price and commission for one order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostedPrice {
    pub net_price: f64,
    pub cost: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        CostModel {
            per_share_cost: 0.001,
            min_trade_cost: 1.0,
            slippage_spread: 0.02,
        }
    }
}

impl CostModel {
    pub fn new(
        per_share_cost: f64,
        min_trade_cost: f64,
        slippage_spread: f64,
    ) -> Result<Self, EngineError> {
        for (key, value) in [
            ("per_share_cost", per_share_cost),
            ("min_trade_cost", min_trade_cost),
            ("slippage_spread", slippage_spread),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(EngineError::ConfigInvalid {
                    section: "costs".to_string(),
                    key: key.to_string(),
                    reason: format!("{key} must be a non-negative number"),
                });
            }
        }
        Ok(CostModel {
            per_share_cost,
            min_trade_cost,
            slippage_spread,
        })
    }

    /// cost = max(min_trade_cost, per_share_cost * |q|);
    /// net_price = raw_price + sign(q) * slippage_spread.
    pub fn apply(&self, quantity: i64, raw_price: f64) -> CostedPrice {
        let shares = quantity.unsigned_abs() as f64;
        let cost = self.min_trade_cost.max(self.per_share_cost * shares);
        let net_price = raw_price + quantity.signum() as f64 * self.slippage_spread;
        CostedPrice { net_price, cost }
    }
}
