//! Order intents and broker fills.

use std::fmt;

/// Why an order was emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderReason {
    Entry,
    ExitTrend,
    ExitTakeProfit,
    ExitStopLoss,
}

impl OrderReason {
    pub fn is_exit(self) -> bool {
        !matches!(self, OrderReason::Entry)
    }
}

impl fmt::Display for OrderReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderReason::Entry => write!(f, "ENTRY"),
            OrderReason::ExitTrend => write!(f, "EXIT_TREND"),
            OrderReason::ExitTakeProfit => write!(f, "EXIT_TAKE_PROFIT"),
            OrderReason::ExitStopLoss => write!(f, "EXIT_STOP_LOSS"),
        }
    }
}

/// A decision to trade, produced at most once per asset per step.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderIntent {
    pub asset: String,
    /// Positive buys, negative sells.
    pub quantity: i64,
    pub reason: OrderReason,
}

impl OrderIntent {
    pub fn entry(asset: &str, quantity: i64) -> Self {
        OrderIntent {
            asset: asset.to_string(),
            quantity: quantity.abs(),
            reason: OrderReason::Entry,
        }
    }

    pub fn exit(asset: &str, quantity: i64, reason: OrderReason) -> Self {
        OrderIntent {
            asset: asset.to_string(),
            quantity: -quantity.abs(),
            reason,
        }
    }

    pub fn is_buy(&self) -> bool {
        self.quantity > 0
    }
}

/// An intent after the cost model: what the broker is asked to execute.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedOrder {
    pub intent: OrderIntent,
    pub quoted_price: f64,
    pub net_price: f64,
    pub cost: f64,
}

/// Broker confirmation of an executed order.
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub asset: String,
    pub quantity: i64,
    pub price: f64,
    pub cost: f64,
}

impl Fill {
    /// Cash leaving the account: notional plus cost for buys, minus proceeds for sells.
    pub fn cash_outflow(&self) -> f64 {
        self.quantity as f64 * self.price + self.cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn entry_is_always_a_buy() {
        let intent = OrderIntent::entry("AAPL", -10);
        assert_eq!(intent.quantity, 10);
        assert!(intent.is_buy());
        assert_eq!(intent.reason, OrderReason::Entry);
    }

    #[test]
    fn exit_is_always_a_sell() {
        let intent = OrderIntent::exit("AAPL", 10, OrderReason::ExitStopLoss);
        assert_eq!(intent.quantity, -10);
        assert!(!intent.is_buy());
        assert!(intent.reason.is_exit());
    }

    #[test]
    fn reason_display() {
        assert_eq!(OrderReason::Entry.to_string(), "ENTRY");
        assert_eq!(OrderReason::ExitTakeProfit.to_string(), "EXIT_TAKE_PROFIT");
    }

    #[test]
    fn cash_outflow_buy_and_sell() {
        let buy = Fill {
            asset: "AAPL".into(),
            quantity: 10,
            price: 100.02,
            cost: 1.0,
        };
        assert_relative_eq!(buy.cash_outflow(), 1001.2, epsilon = 1e-9);

        let sell = Fill {
            asset: "AAPL".into(),
            quantity: -10,
            price: 109.98,
            cost: 1.0,
        };
        assert_relative_eq!(sell.cash_outflow(), -1098.8, epsilon = 1e-9);
    }
}
