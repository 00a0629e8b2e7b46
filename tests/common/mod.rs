#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use chrono::{Duration, NaiveDate, NaiveDateTime};
pub use stockbot::domain::bar::Bar;
use stockbot::domain::error::{BrokerError, BrokerErrorKind};
use stockbot::domain::indicator::IndicatorSnapshot;
use stockbot::domain::order::{Fill, PricedOrder};
use stockbot::ports::broker_port::BrokerPort;
use stockbot::ports::indicator_port::IndicatorPort;

/// Broker that fills at the priced net price unless a failure is scripted
/// for the next submission. Every submission is recorded.
#[derive(Default)]
pub struct MockBroker {
    pub submitted: Rc<RefCell<Vec<PricedOrder>>>,
    failures: VecDeque<Option<BrokerErrorKind>>,
}

impl MockBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script outcomes for upcoming submissions: `Some(kind)` fails, `None` fills.
    pub fn with_script(mut self, script: Vec<Option<BrokerErrorKind>>) -> Self {
        self.failures = script.into();
        self
    }

    pub fn failing(kind: BrokerErrorKind) -> Self {
        Self::new().with_script(vec![Some(kind)])
    }

    pub fn log(&self) -> Rc<RefCell<Vec<PricedOrder>>> {
        Rc::clone(&self.submitted)
    }
}

impl BrokerPort for MockBroker {
    fn submit(&mut self, order: &PricedOrder) -> Result<Fill, BrokerError> {
        self.submitted.borrow_mut().push(order.clone());
        if let Some(Some(kind)) = self.failures.pop_front() {
            return Err(BrokerError::new(kind, "scripted failure"));
        }
        Ok(Fill {
            asset: order.intent.asset.clone(),
            quantity: order.intent.quantity,
            price: order.net_price,
            cost: order.cost,
        })
    }
}

/// Indicator provider returning a settable snapshot once any history exists.
/// Clones share the snapshot, so a test can change it mid-run.
#[derive(Clone)]
pub struct FixedIndicators(Rc<Cell<IndicatorSnapshot>>);

impl FixedIndicators {
    pub fn new(short: f64, long: f64, rsi: f64) -> Self {
        Self(Rc::new(Cell::new(snapshot(short, long, rsi))))
    }

    pub fn set(&self, short: f64, long: f64, rsi: f64) {
        self.0.set(snapshot(short, long, rsi));
    }
}

impl IndicatorPort for FixedIndicators {
    fn warmup(&self) -> usize {
        1
    }

    fn snapshot(&self, history: &[Bar]) -> Option<IndicatorSnapshot> {
        (!history.is_empty()).then(|| self.0.get())
    }
}

pub fn snapshot(short: f64, long: f64, rsi: f64) -> IndicatorSnapshot {
    IndicatorSnapshot {
        short_moving_avg: short,
        long_moving_avg: long,
        rsi,
    }
}

pub fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

pub fn day(n: i64) -> NaiveDateTime {
    start() + Duration::days(n)
}

/// One daily bar per price, starting 2024-01-01.
pub fn daily_bars(asset: &str, prices: &[f64]) -> Vec<Bar> {
    prices
        .iter()
        .enumerate()
        .map(|(i, &p)| Bar::new(asset, day(i as i64), p))
        .collect()
}

/// Rising 10..=100 then easing 99..=95: one uptrend, one reversal.
pub fn crossover_prices() -> Vec<f64> {
    let mut prices: Vec<f64> = (1..=10).map(|i| i as f64 * 10.0).collect();
    prices.extend([99.0, 98.0, 97.0, 96.0, 95.0]);
    prices
}

pub fn assets(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}
