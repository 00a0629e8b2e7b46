//! Cash, holdings and equity tracking for one asset's run.

use chrono::NaiveDateTime;

use super::order::{Fill, OrderReason};

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    pub equity: f64,
}

/// A completed entry/exit pair, net of both commissions.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundTrip {
    pub asset: String,
    pub quantity: i64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub entry_time: NaiveDateTime,
    pub exit_time: NaiveDateTime,
    pub exit_reason: OrderReason,
    pub pnl: f64,
}

#[derive(Debug, Clone, PartialEq)]
struct OpenLot {
    timestamp: NaiveDateTime,
    quantity: i64,
    price: f64,
    cost: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    pub initial_capital: f64,
    pub cash: f64,
    pub holdings: i64,
    pub total_costs: f64,
    pub fills: Vec<Fill>,
    pub round_trips: Vec<RoundTrip>,
    pub equity_curve: Vec<EquityPoint>,
    open: Option<OpenLot>,
}

impl Ledger {
    pub fn new(initial_capital: f64) -> Self {
        Ledger {
            initial_capital,
            cash: initial_capital,
            holdings: 0,
            total_costs: 0.0,
            fills: Vec::new(),
            round_trips: Vec::new(),
            equity_curve: Vec::new(),
            open: None,
        }
    }

    pub fn apply_fill(&mut self, timestamp: NaiveDateTime, fill: &Fill, reason: OrderReason) {
        self.cash -= fill.cash_outflow();
        self.holdings += fill.quantity;
        self.total_costs += fill.cost;
        self.fills.push(fill.clone());

        if fill.quantity > 0 {
            self.open = Some(OpenLot {
                timestamp,
                quantity: fill.quantity,
                price: fill.price,
                cost: fill.cost,
            });
        } else if let Some(lot) = self.open.take() {
            let pnl = lot.quantity as f64 * (fill.price - lot.price) - lot.cost - fill.cost;
            self.round_trips.push(RoundTrip {
                asset: fill.asset.clone(),
                quantity: lot.quantity,
                entry_price: lot.price,
                exit_price: fill.price,
                entry_time: lot.timestamp,
                exit_time: timestamp,
                exit_reason: reason,
                pnl,
            });
        }
    }

    pub fn equity(&self, price: f64) -> f64 {
        self.cash + self.holdings as f64 * price
    }

    /// Record mark-to-market equity at `price`.
    pub fn mark(&mut self, timestamp: NaiveDateTime, price: f64) {
        let equity = self.equity(price);
        self.equity_curve.push(EquityPoint { timestamp, equity });
    }

    pub fn realized_pnl(&self) -> f64 {
        self.round_trips.iter().map(|t| t.pnl).sum()
    }
}
