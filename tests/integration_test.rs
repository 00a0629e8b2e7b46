//! End-to-end engine behavior over in-memory feeds.
//!
//! Tests cover:
//! - Crossover round trip: exactly one BUY followed by one SELL
//! - Stop-loss precedence over a simultaneous trend exit
//! - Broker failures leave the position FLAT and the run alive
//! - Ordering violations and oversized gaps end the run
//! - Zero-loss RSI and cancellation

mod common;

use approx::assert_relative_eq;
use common::*;
use stockbot::adapters::paper_broker::PaperBroker;
use stockbot::adapters::replay_feed::ReplayFeed;
use stockbot::domain::backtest::run_asset;
use stockbot::domain::engine::{
    CancelToken, EngineSettings, ExecutionCoordinator, RunStatus, StepOutcome,
};
use stockbot::domain::error::{BrokerErrorKind, EngineError, ErrorCategory};
use stockbot::domain::indicator::{calculate_rsi, IndicatorWindows};
use stockbot::domain::order::OrderReason;
use stockbot::domain::position::PositionPhase;
use stockbot::domain::risk::RiskVerdict;
use stockbot::domain::signal::{ExitTrigger, Signal};
use stockbot::ports::data_port::{Feed, MarketDataPort};

fn small_windows() -> EngineSettings {
    let mut settings = EngineSettings::default();
    settings.strategy.windows = IndicatorWindows {
        short: 2,
        long: 4,
        rsi: 2,
    };
    settings
}

mod crossover {
    use super::*;

    #[test]
    fn one_buy_then_one_sell() {
        let broker = MockBroker::new();
        let log = broker.log();
        let mut engine =
            ExecutionCoordinator::new(&small_windows(), &assets(&["AAPL"]), broker).unwrap();
        let mut feed = ReplayFeed::new(daily_bars("AAPL", &crossover_prices()));

        let outcome = engine.run(&mut feed, &CancelToken::new()).unwrap();
        assert_eq!(outcome.status, RunStatus::Completed);
        assert_eq!(outcome.steps.len(), 15);

        let orders = log.borrow();
        assert_eq!(orders.len(), 2);
        assert!(orders[0].intent.is_buy());
        assert_eq!(orders[0].intent.reason, OrderReason::Entry);
        assert_eq!(orders[1].intent.quantity, -10);
        assert_eq!(orders[1].intent.reason, OrderReason::ExitTrend);

        // entry at 98 (index 11), trend exit one bar later at 97
        assert_eq!(outcome.steps[11].signal, Signal::EnterLong);
        assert_relative_eq!(orders[0].quoted_price, 98.0);
        assert_eq!(
            outcome.steps[12].signal,
            Signal::ExitLong(ExitTrigger::TrendReversal)
        );
        assert_relative_eq!(orders[1].quoted_price, 97.0);

        assert_eq!(
            engine.position("AAPL").unwrap().phase(),
            PositionPhase::Flat
        );
    }

    #[test]
    fn warmup_bars_produce_no_snapshot() {
        let mut engine = ExecutionCoordinator::new(
            &small_windows(),
            &assets(&["AAPL"]),
            MockBroker::new(),
        )
        .unwrap();
        let mut feed = ReplayFeed::new(daily_bars("AAPL", &crossover_prices()));
        let outcome = engine.run(&mut feed, &CancelToken::new()).unwrap();

        for step in &outcome.steps[..4] {
            assert!(step.indicators.is_none());
            assert_eq!(step.outcome, StepOutcome::Warmup);
        }
        assert!(outcome.steps[4].indicators.is_some());
    }

    #[test]
    fn ledger_records_round_trip_net_of_costs() {
        let mut feed = ReplayFeed::new(daily_bars("AAPL", &crossover_prices()));
        let report = run_asset(
            "AAPL",
            &small_windows(),
            &mut feed,
            PaperBroker::new(100_000.0),
            &CancelToken::new(),
        )
        .unwrap();

        assert_eq!(report.fills().len(), 2);
        let trip = &report.ledger.round_trips[0];
        assert_relative_eq!(trip.entry_price, 98.02, epsilon = 1e-9);
        assert_relative_eq!(trip.exit_price, 96.98, epsilon = 1e-9);
        // 10 * (96.98 - 98.02) - 1 - 1
        assert_relative_eq!(trip.pnl, -12.4, epsilon = 1e-9);
        assert_relative_eq!(report.ledger.cash, 100_000.0 - 12.4, epsilon = 1e-6);
        assert_eq!(report.metrics.total_trades, 1);
        assert_eq!(report.metrics.trades_lost, 1);
        assert_eq!(report.ledger.equity_curve.len(), 15);
    }
}

mod risk_precedence {
    use super::*;

    #[test]
    fn stop_loss_beats_trend_exit() {
        let indicators = FixedIndicators::new(105.0, 100.0, 10.0);
        let mut engine = ExecutionCoordinator::with_indicators(
            &EngineSettings::default(),
            &assets(&["AAPL"]),
            MockBroker::new(),
            indicators.clone(),
        )
        .unwrap();

        let entry = engine.step(Bar::new("AAPL", day(0), 100.0)).unwrap();
        assert_eq!(entry.intent.unwrap().reason, OrderReason::Entry);

        // trend reverses and price breaks the 5% stop on the same bar
        indicators.set(95.0, 100.0, 40.0);
        let exit = engine.step(Bar::new("AAPL", day(1), 90.0)).unwrap();
        assert_eq!(exit.signal, Signal::ExitLong(ExitTrigger::TrendReversal));
        assert_eq!(exit.risk, RiskVerdict::StopLossExit);
        let intent = exit.intent.unwrap();
        assert_eq!(intent.reason, OrderReason::ExitStopLoss);
        assert_eq!(intent.quantity, -10);
        assert!(!engine.position("AAPL").unwrap().is_open());
    }

    #[test]
    fn stop_threshold_is_strict() {
        let indicators = FixedIndicators::new(105.0, 100.0, 10.0);
        let mut settings = EngineSettings::default();
        settings.costs.slippage_spread = 0.0;
        let mut engine = ExecutionCoordinator::with_indicators(
            &settings,
            &assets(&["AAPL"]),
            MockBroker::new(),
            indicators.clone(),
        )
        .unwrap();
        engine.step(Bar::new("AAPL", day(0), 100.0)).unwrap();

        indicators.set(101.0, 100.0, 50.0);
        let held = engine.step(Bar::new("AAPL", day(1), 96.0)).unwrap();
        assert_eq!(held.risk, RiskVerdict::None);
        assert!(held.intent.is_none());

        let stopped = engine.step(Bar::new("AAPL", day(2), 94.0)).unwrap();
        assert_eq!(stopped.risk, RiskVerdict::StopLossExit);
    }

    #[test]
    fn independent_take_profit_exits_without_overbought() {
        let indicators = FixedIndicators::new(105.0, 100.0, 10.0);
        let mut settings = EngineSettings::default();
        settings.strategy.independent_take_profit = true;
        settings.costs.slippage_spread = 0.0;
        let mut engine = ExecutionCoordinator::with_indicators(
            &settings,
            &assets(&["AAPL"]),
            MockBroker::new(),
            indicators.clone(),
        )
        .unwrap();
        engine.step(Bar::new("AAPL", day(0), 100.0)).unwrap();

        indicators.set(120.0, 100.0, 50.0);
        let exit = engine.step(Bar::new("AAPL", day(1), 111.0)).unwrap();
        assert_eq!(exit.risk, RiskVerdict::TakeProfitExit);
        assert_eq!(exit.intent.unwrap().reason, OrderReason::ExitTakeProfit);
    }
}

mod broker_failures {
    use super::*;

    #[test]
    fn rejected_entry_stays_flat() {
        let broker = MockBroker::failing(BrokerErrorKind::Rejected);
        let mut engine = ExecutionCoordinator::with_indicators(
            &EngineSettings::default(),
            &assets(&["AAPL"]),
            broker,
            FixedIndicators::new(105.0, 100.0, 10.0),
        )
        .unwrap();

        let report = engine.step(Bar::new("AAPL", day(0), 100.0)).unwrap();
        match report.outcome {
            StepOutcome::Failed(failure) => {
                assert_eq!(failure.category, ErrorCategory::Broker);
                assert_eq!(failure.broker_kind, Some(BrokerErrorKind::Rejected));
            }
            other => panic!("expected a failed step, got {other:?}"),
        }
        assert_eq!(
            engine.position("AAPL").unwrap().phase(),
            PositionPhase::Flat
        );
        assert!(engine.ledger("AAPL").unwrap().fills.is_empty());
    }

    #[test]
    fn failed_exit_keeps_position_open_and_retries() {
        let broker = MockBroker::new().with_script(vec![None, Some(BrokerErrorKind::Timeout)]);
        let log = broker.log();
        let indicators = FixedIndicators::new(105.0, 100.0, 10.0);
        let mut engine = ExecutionCoordinator::with_indicators(
            &EngineSettings::default(),
            &assets(&["AAPL"]),
            broker,
            indicators.clone(),
        )
        .unwrap();

        engine.step(Bar::new("AAPL", day(0), 100.0)).unwrap();
        indicators.set(95.0, 100.0, 50.0);
        let failed = engine.step(Bar::new("AAPL", day(1), 99.0)).unwrap();
        assert!(failed.is_failure());
        assert!(engine.position("AAPL").unwrap().is_open());

        let retried = engine.step(Bar::new("AAPL", day(2), 99.0)).unwrap();
        assert!(retried.fill().is_some());
        assert!(!engine.position("AAPL").unwrap().is_open());
        assert_eq!(log.borrow().len(), 3);
    }

    #[test]
    fn insufficient_funds_from_paper_broker() {
        let mut settings = EngineSettings::default();
        settings.initial_capital = 500.0;
        let mut engine = ExecutionCoordinator::with_indicators(
            &settings,
            &assets(&["AAPL"]),
            PaperBroker::new(settings.initial_capital),
            FixedIndicators::new(105.0, 100.0, 10.0),
        )
        .unwrap();

        let report = engine.step(Bar::new("AAPL", day(0), 100.0)).unwrap();
        match report.outcome {
            StepOutcome::Failed(failure) => {
                assert_eq!(failure.broker_kind, Some(BrokerErrorKind::InsufficientFunds))
            }
            other => panic!("expected a failed step, got {other:?}"),
        }
        assert!(!engine.position("AAPL").unwrap().is_open());
    }
}

mod data_errors {
    use super::*;

    #[test]
    fn out_of_order_bar_halts_run() {
        let mut bars = daily_bars("AAPL", &[10.0, 11.0, 12.0]);
        bars.swap(1, 2);
        let mut engine =
            ExecutionCoordinator::new(&small_windows(), &assets(&["AAPL"]), MockBroker::new())
                .unwrap();
        let result = engine.run(&mut ReplayFeed::new(bars), &CancelToken::new());
        assert!(matches!(result, Err(EngineError::DataGap { .. })));
    }

    #[test]
    fn gap_limit_halts_run() {
        let mut settings = small_windows();
        settings.max_bar_gap = Some(chrono::Duration::days(3));
        let bars = vec![
            Bar::new("AAPL", day(0), 10.0),
            Bar::new("AAPL", day(3), 11.0),
            Bar::new("AAPL", day(10), 12.0),
        ];
        let mut engine =
            ExecutionCoordinator::new(&settings, &assets(&["AAPL"]), MockBroker::new()).unwrap();
        let result = engine.run(&mut ReplayFeed::new(bars), &CancelToken::new());
        assert!(matches!(result, Err(EngineError::DataGap { .. })));
    }

    #[test]
    fn assets_keep_independent_clocks() {
        let bars = vec![
            Bar::new("AAPL", day(1), 10.0),
            Bar::new("MSFT", day(0), 20.0),
            Bar::new("AAPL", day(2), 11.0),
            Bar::new("MSFT", day(1), 21.0),
        ];
        let mut engine = ExecutionCoordinator::new(
            &small_windows(),
            &assets(&["AAPL", "MSFT"]),
            MockBroker::new(),
        )
        .unwrap();
        let outcome = engine
            .run(&mut ReplayFeed::new(bars), &CancelToken::new())
            .unwrap();
        assert_eq!(outcome.steps.len(), 4);
        assert!(outcome.steps.iter().all(|s| !s.is_failure()));
    }

    #[test]
    fn recoverable_feed_errors_are_collected() {
        struct Flaky(u32);
        impl MarketDataPort for Flaky {
            fn next_bar(&mut self) -> Result<Feed, EngineError> {
                self.0 += 1;
                match self.0 {
                    1 => Ok(Feed::Bar(Bar::new("AAPL", day(0), 10.0))),
                    2 => Err(EngineError::validation("row 2: invalid price")),
                    3 => Ok(Feed::Bar(Bar::new("AAPL", day(1), 11.0))),
                    _ => Ok(Feed::EndOfStream),
                }
            }
        }

        let mut engine =
            ExecutionCoordinator::new(&small_windows(), &assets(&["AAPL"]), MockBroker::new())
                .unwrap();
        let outcome = engine.run(&mut Flaky(0), &CancelToken::new()).unwrap();
        assert_eq!(outcome.steps.len(), 2);
        assert_eq!(outcome.feed_errors.len(), 1);
    }
}

mod edge_cases {
    use super::*;

    #[test]
    fn flat_prices_give_rsi_of_100() {
        assert_eq!(calculate_rsi(&[50.0; 15], 14), Some(100.0));
        assert_eq!(calculate_rsi(&[10.0, 11.0, 12.0, 13.0], 3), Some(100.0));

        let mut engine =
            ExecutionCoordinator::new(&small_windows(), &assets(&["AAPL"]), MockBroker::new())
                .unwrap();
        let outcome = engine
            .run(
                &mut ReplayFeed::new(daily_bars("AAPL", &[50.0; 8])),
                &CancelToken::new(),
            )
            .unwrap();
        let last = outcome.steps.last().unwrap();
        assert_eq!(last.indicators.unwrap().rsi, 100.0);
        assert_eq!(last.outcome, StepOutcome::NoAction);
    }

    #[test]
    fn cancelled_run_reports_status() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut feed = ReplayFeed::new(daily_bars("AAPL", &crossover_prices()));
        let report = run_asset(
            "AAPL",
            &small_windows(),
            &mut feed,
            MockBroker::new(),
            &cancel,
        )
        .unwrap();
        assert_eq!(report.status, RunStatus::Cancelled);
        assert!(report.steps.is_empty());
        assert_eq!(feed.remaining(), 15);
    }

    #[test]
    fn unknown_asset_does_not_stop_run() {
        let bars = vec![
            Bar::new("AAPL", day(0), 10.0),
            Bar::new("TSLA", day(0), 200.0),
            Bar::new("AAPL", day(1), 11.0),
        ];
        let mut engine =
            ExecutionCoordinator::new(&small_windows(), &assets(&["AAPL"]), MockBroker::new())
                .unwrap();
        let outcome = engine
            .run(&mut ReplayFeed::new(bars), &CancelToken::new())
            .unwrap();
        assert_eq!(outcome.steps.len(), 3);
        assert!(outcome.steps[1].is_failure());
    }
}
