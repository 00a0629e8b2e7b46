//! Backtest runner: one isolated coordinator per asset, assets in parallel.

use std::path::PathBuf;

use rayon::prelude::*;
use tracing::{info, info_span};

use super::engine::{CancelToken, EngineSettings, ExecutionCoordinator, RunStatus, StepOutcome, StepReport};
use super::error::EngineError;
use super::metrics::Metrics;
use super::order::Fill;
use super::portfolio::Ledger;
use crate::ports::broker_port::BrokerPort;
use crate::ports::data_port::MarketDataPort;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub assets: Vec<String>,
    pub data_dir: PathBuf,
    pub engine: EngineSettings,
}

/// Outcome of one asset's run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub asset: String,
    pub status: RunStatus,
    pub steps: Vec<StepReport>,
    /// Step failures followed by unreadable feed rows, as messages.
    pub failures: Vec<String>,
    pub ledger: Ledger,
    pub metrics: Metrics,
}

impl RunReport {
    pub fn fills(&self) -> &[Fill] {
        &self.ledger.fills
    }
}

pub fn run_asset<F, B>(
    asset: &str,
    settings: &EngineSettings,
    feed: &mut F,
    broker: B,
    cancel: &CancelToken,
) -> Result<RunReport, EngineError>
where
    F: MarketDataPort + ?Sized,
    B: BrokerPort,
{
    let assets = [asset.to_string()];
    let mut coordinator = ExecutionCoordinator::new(settings, &assets, broker)?;
    let outcome = coordinator.run(feed, cancel)?;

    let mut failures: Vec<String> = outcome
        .steps
        .iter()
        .filter_map(|step| match &step.outcome {
            StepOutcome::Failed(failure) => {
                Some(format!("{} {}: {}", step.asset, step.timestamp, failure.message))
            }
            _ => None,
        })
        .collect();
    failures.extend(outcome.feed_errors);

    let ledger = coordinator
        .into_ledgers()
        .remove(asset)
        .unwrap_or_else(|| Ledger::new(settings.initial_capital));
    let metrics = Metrics::compute(&ledger);

    Ok(RunReport {
        asset: asset.to_string(),
        status: outcome.status,
        steps: outcome.steps,
        failures,
        ledger,
        metrics,
    })
}

/// Run every configured asset in parallel. `open` supplies each asset's feed
/// and broker, so no state is shared between assets. Results keep the
/// configured asset order.
pub fn run_backtest<O, F, B>(
    config: &BacktestConfig,
    cancel: &CancelToken,
    open: O,
) -> Vec<(String, Result<RunReport, EngineError>)>
where
    O: Fn(&str) -> Result<(F, B), EngineError> + Sync,
    F: MarketDataPort,
    B: BrokerPort,
{
    info!(assets = config.assets.len(), data_dir = %config.data_dir.display(), "starting backtest");

    config
        .assets
        .par_iter()
        .map(|asset| {
            let _span = info_span!("asset", %asset).entered();
            let result = open(asset).and_then(|(mut feed, broker)| {
                run_asset(asset, &config.engine, &mut feed, broker, cancel)
            });
            (asset.clone(), result)
        })
        .collect()
}
