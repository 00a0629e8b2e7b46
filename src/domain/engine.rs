//! Execution coordinator: the per-asset FLAT/LONG state machine.
//!
//! Each step, in order:
//! 1. Check timestamp ordering (fatal on violation) and validate the bar
//! 2. Append to the trailing history and take an indicator snapshot
//! 3. Evaluate risk and signal; a risk exit overrides any signal
//! 4. Price at most one intent through the cost model and submit it
//! 5. On a fill, update position and ledger before the next bar
//!
//! Broker failures and invalid bars are reported in the step and never stop
//! the loop. Ordering violations end the run.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};
use tracing::{debug, error, info, warn};

use super::bar::Bar;
use super::cost::CostModel;
use super::error::{BrokerErrorKind, EngineError, ErrorCategory};
use super::indicator::{IndicatorSnapshot, TrailingIndicators};
use super::order::{Fill, OrderIntent, OrderReason, PricedOrder};
use super::portfolio::Ledger;
use super::position::PositionState;
use super::risk::{RiskManager, RiskVerdict};
use super::signal::{evaluate_signal, ExitTrigger, Signal};
use super::strategy::StrategyParams;
use crate::ports::broker_port::BrokerPort;
use crate::ports::data_port::{Feed, MarketDataPort};
use crate::ports::indicator_port::IndicatorPort;

/// Everything the coordinator needs besides its collaborators. Immutable per run.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub strategy: StrategyParams,
    pub costs: CostModel,
    pub initial_capital: f64,
    /// Largest tolerated distance between consecutive bars of one asset.
    pub max_bar_gap: Option<Duration>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            strategy: StrategyParams::default(),
            costs: CostModel::default(),
            initial_capital: 100_000.0,
            max_bar_gap: None,
        }
    }
}

impl EngineSettings {
    /// Reject settings the engine cannot run with, before any bar is processed.
    pub fn validate(&self) -> Result<(), EngineError> {
        self.strategy.validate()?;
        CostModel::new(
            self.costs.per_share_cost,
            self.costs.min_trade_cost,
            self.costs.slippage_spread,
        )?;
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(EngineError::ConfigInvalid {
                section: "backtest".to_string(),
                key: "initial_capital".to_string(),
                reason: "initial_capital must be positive".to_string(),
            });
        }
        if self.max_bar_gap.is_some_and(|gap| gap <= Duration::zero()) {
            return Err(EngineError::ConfigInvalid {
                section: "backtest".to_string(),
                key: "max_bar_gap_secs".to_string(),
                reason: "max_bar_gap_secs must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Run-level cancellation flag. Checked before each bar is pulled.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepFailure {
    pub category: ErrorCategory,
    pub broker_kind: Option<BrokerErrorKind>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// Not enough history for indicators and nothing to manage.
    Warmup,
    NoAction,
    Filled { reason: OrderReason, fill: Fill },
    Failed(StepFailure),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    pub asset: String,
    pub timestamp: NaiveDateTime,
    pub price: f64,
    pub indicators: Option<IndicatorSnapshot>,
    pub signal: Signal,
    pub risk: RiskVerdict,
    pub intent: Option<OrderIntent>,
    pub outcome: StepOutcome,
}

impl StepReport {
    fn rejected(bar: &Bar, err: &EngineError) -> Self {
        StepReport {
            asset: bar.asset.clone(),
            timestamp: bar.timestamp,
            price: bar.price,
            indicators: None,
            signal: Signal::Hold,
            risk: RiskVerdict::None,
            intent: None,
            outcome: StepOutcome::Failed(StepFailure {
                category: err.category(),
                broker_kind: None,
                message: err.to_string(),
            }),
        }
    }

    pub fn fill(&self) -> Option<&Fill> {
        match &self.outcome {
            StepOutcome::Filled { fill, .. } => Some(fill),
            _ => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, StepOutcome::Failed(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub steps: Vec<StepReport>,
    /// Recoverable errors raised by the feed itself (unreadable rows).
    pub feed_errors: Vec<String>,
}

#[derive(Debug)]
struct AssetBook {
    position: PositionState,
    history: VecDeque<Bar>,
    last_timestamp: Option<NaiveDateTime>,
    ledger: Ledger,
}

pub struct ExecutionCoordinator<B, I = TrailingIndicators> {
    strategy: StrategyParams,
    risk: RiskManager,
    costs: CostModel,
    max_bar_gap: Option<Duration>,
    indicators: I,
    broker: B,
    books: BTreeMap<String, AssetBook>,
}

impl<B: BrokerPort> ExecutionCoordinator<B, TrailingIndicators> {
    pub fn new(settings: &EngineSettings, assets: &[String], broker: B) -> Result<Self, EngineError> {
        let indicators = TrailingIndicators::new(settings.strategy.windows);
        Self::with_indicators(settings, assets, broker, indicators)
    }
}

impl<B: BrokerPort, I: IndicatorPort> ExecutionCoordinator<B, I> {
    pub fn with_indicators(
        settings: &EngineSettings,
        assets: &[String],
        broker: B,
        indicators: I,
    ) -> Result<Self, EngineError> {
        if assets.is_empty() {
            return Err(EngineError::ConfigMissing {
                section: "backtest".to_string(),
                key: "assets".to_string(),
            });
        }
        settings.validate()?;

        let books = assets
            .iter()
            .map(|asset| {
                let book = AssetBook {
                    position: PositionState::flat(),
                    history: VecDeque::with_capacity(indicators.warmup()),
                    last_timestamp: None,
                    ledger: Ledger::new(settings.initial_capital),
                };
                (asset.clone(), book)
            })
            .collect();

        Ok(ExecutionCoordinator {
            strategy: settings.strategy.clone(),
            risk: settings.strategy.risk_manager(),
            costs: settings.costs,
            max_bar_gap: settings.max_bar_gap,
            indicators,
            broker,
            books,
        })
    }

    pub fn position(&self, asset: &str) -> Option<PositionState> {
        self.books.get(asset).map(|b| b.position)
    }

    pub fn ledger(&self, asset: &str) -> Option<&Ledger> {
        self.books.get(asset).map(|b| &b.ledger)
    }

    pub fn broker(&self) -> &B {
        &self.broker
    }

    pub fn into_ledgers(self) -> BTreeMap<String, Ledger> {
        self.books
            .into_iter()
            .map(|(asset, book)| (asset, book.ledger))
            .collect()
    }

    /// Process one bar. Recoverable failures come back inside the report;
    /// `Err` means the run must stop.
    pub fn step(&mut self, bar: Bar) -> Result<StepReport, EngineError> {
        match self.try_step(&bar) {
            Ok(report) => Ok(report),
            Err(err) if err.is_recoverable() => {
                warn!(asset = %bar.asset, timestamp = %bar.timestamp, error = %err, "step skipped");
                Ok(StepReport::rejected(&bar, &err))
            }
            Err(err) => {
                error!(asset = %bar.asset, timestamp = %bar.timestamp, error = %err, "halting run");
                Err(err)
            }
        }
    }

    fn try_step(&mut self, bar: &Bar) -> Result<StepReport, EngineError> {
        let book = self
            .books
            .get_mut(&bar.asset)
            .ok_or_else(|| EngineError::UnknownAsset {
                asset: bar.asset.clone(),
            })?;

        if let Some(previous) = book.last_timestamp {
            if bar.timestamp <= previous {
                return Err(EngineError::out_of_order(&bar.asset, previous, bar.timestamp));
            }
            if let Some(max_gap) = self.max_bar_gap {
                let gap = bar.timestamp - previous;
                if gap > max_gap {
                    return Err(EngineError::DataGap {
                        asset: bar.asset.clone(),
                        reason: format!(
                            "{}s between {} and {} exceeds {}s",
                            gap.num_seconds(),
                            previous,
                            bar.timestamp,
                            max_gap.num_seconds()
                        ),
                    });
                }
            }
        }
        book.last_timestamp = Some(bar.timestamp);
        bar.validate()?;

        let capacity = self.indicators.warmup().max(1);
        book.history.push_back(bar.clone());
        while book.history.len() > capacity {
            book.history.pop_front();
        }
        let indicators = self.indicators.snapshot(book.history.make_contiguous());

        let price = bar.price;
        let risk = self.risk.evaluate(&book.position, price);
        let signal = indicators
            .map(|snapshot| {
                evaluate_signal(
                    &snapshot,
                    &book.position,
                    price,
                    self.strategy.take_profit_pct,
                    &self.strategy.thresholds,
                )
            })
            .unwrap_or(Signal::Hold);
        let intent = decide(&bar.asset, risk, signal, self.strategy.quantity);

        let outcome = match &intent {
            None if indicators.is_none() => StepOutcome::Warmup,
            None => StepOutcome::NoAction,
            Some(intent) => {
                let costed = self.costs.apply(intent.quantity, price);
                let order = PricedOrder {
                    intent: intent.clone(),
                    quoted_price: price,
                    net_price: costed.net_price,
                    cost: costed.cost,
                };
                match self.broker.submit(&order) {
                    Ok(fill) => match settle(book, intent, &fill, bar.timestamp) {
                        Ok(()) => {
                            info!(
                                asset = %fill.asset,
                                reason = %intent.reason,
                                quantity = fill.quantity,
                                price = fill.price,
                                cost = fill.cost,
                                "order filled"
                            );
                            StepOutcome::Filled {
                                reason: intent.reason,
                                fill,
                            }
                        }
                        Err(message) => {
                            warn!(
                                asset = %intent.asset,
                                reason = %intent.reason,
                                error = %message,
                                "fill does not match order, position unchanged"
                            );
                            StepOutcome::Failed(StepFailure {
                                category: ErrorCategory::Broker,
                                broker_kind: None,
                                message,
                            })
                        }
                    },
                    Err(err) => {
                        warn!(
                            asset = %intent.asset,
                            reason = %intent.reason,
                            error = %err,
                            "order failed, position unchanged"
                        );
                        StepOutcome::Failed(StepFailure {
                            category: ErrorCategory::Broker,
                            broker_kind: Some(err.kind),
                            message: err.to_string(),
                        })
                    }
                }
            }
        };

        book.ledger.mark(bar.timestamp, price);
        debug!(
            asset = %bar.asset,
            timestamp = %bar.timestamp,
            price,
            ?indicators,
            ?signal,
            ?risk,
            "step evaluated"
        );

        Ok(StepReport {
            asset: bar.asset.clone(),
            timestamp: bar.timestamp,
            price,
            indicators,
            signal,
            risk,
            intent,
            outcome,
        })
    }

    /// Drain `feed` until end of stream, cancellation, or a fatal error.
    pub fn run<F: MarketDataPort + ?Sized>(
        &mut self,
        feed: &mut F,
        cancel: &CancelToken,
    ) -> Result<RunOutcome, EngineError> {
        let mut steps = Vec::new();
        let mut feed_errors = Vec::new();

        loop {
            if cancel.is_cancelled() {
                info!(steps = steps.len(), "run cancelled");
                return Ok(RunOutcome {
                    status: RunStatus::Cancelled,
                    steps,
                    feed_errors,
                });
            }
            match feed.next_bar() {
                Ok(Feed::Bar(bar)) => steps.push(self.step(bar)?),
                Ok(Feed::EndOfStream) => break,
                Err(err) if err.is_recoverable() => {
                    warn!(error = %err, "unreadable bar skipped");
                    feed_errors.push(err.to_string());
                }
                Err(err) => {
                    error!(error = %err, "market data failed, halting run");
                    return Err(err);
                }
            }
        }

        info!(steps = steps.len(), "run completed");
        Ok(RunOutcome {
            status: RunStatus::Completed,
            steps,
            feed_errors,
        })
    }
}

/// Book a broker fill against the order it answers. A fill for another asset,
/// another quantity, or at an unusable price leaves the book untouched.
fn settle(
    book: &mut AssetBook,
    intent: &OrderIntent,
    fill: &Fill,
    timestamp: NaiveDateTime,
) -> Result<(), String> {
    if fill.asset != intent.asset {
        return Err(format!(
            "fill for {} answers an order for {}",
            fill.asset, intent.asset
        ));
    }
    if fill.quantity != intent.quantity {
        return Err(format!(
            "fill of {} {} does not match order of {}",
            fill.quantity, fill.asset, intent.quantity
        ));
    }
    if !fill.price.is_finite() || fill.price <= 0.0 || !fill.cost.is_finite() || fill.cost < 0.0 {
        return Err(format!(
            "fill of {} {} at {} (cost {}) is not a usable execution",
            fill.quantity, fill.asset, fill.price, fill.cost
        ));
    }
    book.position.apply_fill(fill).map_err(|err| err.to_string())?;
    book.ledger.apply_fill(timestamp, fill, intent.reason);
    Ok(())
}

/// Merge risk and signal into at most one intent. Risk exits win.
fn decide(asset: &str, risk: RiskVerdict, signal: Signal, quantity: i64) -> Option<OrderIntent> {
    match (risk, signal) {
        (RiskVerdict::StopLossExit, _) => {
            Some(OrderIntent::exit(asset, quantity, OrderReason::ExitStopLoss))
        }
        (RiskVerdict::TakeProfitExit, _) => {
            Some(OrderIntent::exit(asset, quantity, OrderReason::ExitTakeProfit))
        }
        (RiskVerdict::None, Signal::EnterLong) => Some(OrderIntent::entry(asset, quantity)),
        (RiskVerdict::None, Signal::ExitLong(ExitTrigger::TrendReversal)) => {
            Some(OrderIntent::exit(asset, quantity, OrderReason::ExitTrend))
        }
        (RiskVerdict::None, Signal::ExitLong(ExitTrigger::TakeProfit)) => {
            Some(OrderIntent::exit(asset, quantity, OrderReason::ExitTakeProfit))
        }
        (RiskVerdict::None, Signal::Hold) => None,
    }
}
