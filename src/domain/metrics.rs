//! Run performance metrics.

use super::portfolio::{EquityPoint, Ledger};

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub total_return: f64,
    pub max_drawdown: f64,
    /// Longest run of consecutive steps spent below a prior equity peak.
    pub max_drawdown_steps: usize,
    pub total_trades: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub realized_pnl: f64,
    pub total_costs: f64,
}

impl Metrics {
    pub fn compute(ledger: &Ledger) -> Self {
        let initial_capital = ledger.initial_capital;
        let final_equity = ledger
            .equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(initial_capital);

        let total_return = if initial_capital > 0.0 {
            (final_equity - initial_capital) / initial_capital
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_steps) = compute_drawdown(&ledger.equity_curve);

        let mut trades_won = 0usize;
        let mut trades_lost = 0usize;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;

        for trip in &ledger.round_trips {
            if trip.pnl > 0.0 {
                trades_won += 1;
                total_wins += trip.pnl;
            } else if trip.pnl < 0.0 {
                trades_lost += 1;
                total_losses += trip.pnl.abs();
            }
        }

        let total_trades = ledger.round_trips.len();
        let win_rate = if total_trades > 0 {
            trades_won as f64 / total_trades as f64
        } else {
            0.0
        };

        let profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        Metrics {
            total_return,
            max_drawdown,
            max_drawdown_steps,
            total_trades,
            trades_won,
            trades_lost,
            win_rate,
            profit_factor,
            realized_pnl: ledger.realized_pnl(),
            total_costs: ledger.total_costs,
        }
    }
}

fn compute_drawdown(equity_curve: &[EquityPoint]) -> (f64, usize) {
    let Some(first) = equity_curve.first() else {
        return (0.0, 0);
    };

    let mut peak = first.equity;
    let mut max_dd = 0.0_f64;
    let mut max_dd_steps = 0usize;
    let mut current_steps = 0usize;

    for point in equity_curve {
        if point.equity >= peak {
            peak = point.equity;
            current_steps = 0;
        } else if peak > 0.0 {
            let dd = (peak - point.equity) / peak;
            max_dd = max_dd.max(dd);
            current_steps += 1;
            max_dd_steps = max_dd_steps.max(current_steps);
        }
    }

    (max_dd, max_dd_steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{Fill, OrderReason};
    use approx::assert_relative_eq;
    use chrono::{NaiveDate, NaiveDateTime};

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn fill(quantity: i64, price: f64) -> Fill {
        Fill {
            asset: "AAPL".into(),
            quantity,
            price,
            cost: 0.0,
        }
    }

    #[test]
    fn empty_ledger() {
        let m = Metrics::compute(&Ledger::new(1_000.0));
        assert_relative_eq!(m.total_return, 0.0);
        assert_relative_eq!(m.max_drawdown, 0.0);
        assert_eq!(m.total_trades, 0);
        assert_relative_eq!(m.win_rate, 0.0);
        assert_relative_eq!(m.profit_factor, 0.0);
    }

    #[test]
    fn drawdown_from_peak() {
        let mut ledger = Ledger::new(100.0);
        for (day, equity) in [(1, 100.0), (2, 120.0), (3, 90.0), (4, 96.0), (5, 130.0)] {
            ledger.equity_curve.push(EquityPoint {
                timestamp: ts(day),
                equity,
            });
        }
        let m = Metrics::compute(&ledger);
        assert_relative_eq!(m.max_drawdown, 0.25);
        assert_eq!(m.max_drawdown_steps, 2);
        assert_relative_eq!(m.total_return, 0.30, epsilon = 1e-12);
    }

    #[test]
    fn win_rate_and_profit_factor() {
        let mut ledger = Ledger::new(10_000.0);
        ledger.apply_fill(ts(1), &fill(10, 100.0), OrderReason::Entry);
        ledger.apply_fill(ts(2), &fill(-10, 110.0), OrderReason::ExitTrend);
        ledger.apply_fill(ts(3), &fill(10, 100.0), OrderReason::Entry);
        ledger.apply_fill(ts(4), &fill(-10, 95.0), OrderReason::ExitStopLoss);

        let m = Metrics::compute(&ledger);
        assert_eq!(m.total_trades, 2);
        assert_eq!(m.trades_won, 1);
        assert_eq!(m.trades_lost, 1);
        assert_relative_eq!(m.win_rate, 0.5);
        assert_relative_eq!(m.profit_factor, 2.0);
        assert_relative_eq!(m.realized_pnl, 50.0);
    }

    #[test]
    fn only_winners_gives_infinite_profit_factor() {
        let mut ledger = Ledger::new(10_000.0);
        ledger.apply_fill(ts(1), &fill(10, 100.0), OrderReason::Entry);
        ledger.apply_fill(ts(2), &fill(-10, 110.0), OrderReason::ExitTrend);
        assert!(Metrics::compute(&ledger).profit_factor.is_infinite());
    }
}
