//! Simulated broker for backtests.
//!
//! Fills every acceptable order in full at the cost-adjusted price and keeps
//! its own cash and holdings, so oversells and unaffordable buys are refused
//! the way a real account would refuse them.

use std::collections::HashMap;

use tracing::debug;

use crate::domain::error::{BrokerError, BrokerErrorKind};
use crate::domain::order::{Fill, PricedOrder};
use crate::ports::broker_port::BrokerPort;

#[derive(Debug, Clone)]
pub struct PaperBroker {
    cash: f64,
    holdings: HashMap<String, i64>,
}

impl PaperBroker {
    pub fn new(initial_cash: f64) -> Self {
        Self {
            cash: initial_cash,
            holdings: HashMap::new(),
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn holding(&self, asset: &str) -> i64 {
        self.holdings.get(asset).copied().unwrap_or(0)
    }
}

impl BrokerPort for PaperBroker {
    fn submit(&mut self, order: &PricedOrder) -> Result<Fill, BrokerError> {
        let intent = &order.intent;
        debug!(
            asset = %intent.asset,
            quantity = intent.quantity,
            net_price = order.net_price,
            cost = order.cost,
            "paper order received"
        );

        if intent.quantity == 0 {
            return Err(BrokerError::new(
                BrokerErrorKind::Rejected,
                "order quantity is zero",
            ));
        }
        if !order.net_price.is_finite() || order.net_price <= 0.0 {
            return Err(BrokerError::new(
                BrokerErrorKind::Rejected,
                format!("unfillable price {}", order.net_price),
            ));
        }

        let held = self.holding(&intent.asset);
        if intent.quantity < 0 && held < -intent.quantity {
            return Err(BrokerError::new(
                BrokerErrorKind::Rejected,
                format!(
                    "cannot sell {} {}, holding {}",
                    -intent.quantity, intent.asset, held
                ),
            ));
        }

        let fill = Fill {
            asset: intent.asset.clone(),
            quantity: intent.quantity,
            price: order.net_price,
            cost: order.cost,
        };
        let outflow = fill.cash_outflow();
        if outflow > self.cash {
            return Err(BrokerError::new(
                BrokerErrorKind::InsufficientFunds,
                format!("order needs {:.2}, available {:.2}", outflow, self.cash),
            ));
        }

        self.cash -= outflow;
        *self.holdings.entry(intent.asset.clone()).or_insert(0) += intent.quantity;
        Ok(fill)
    }
}
