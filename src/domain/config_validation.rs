//! Configuration validation.
//!
//! Reads every section once, checks ranges, and produces the immutable
//! [`EngineConfig`] the run is built from. Keys other than `[backtest] assets`
//! fall back to the reference defaults when absent.

use std::path::PathBuf;
use std::str::FromStr;

use chrono::Duration;

use crate::domain::backtest::BacktestConfig;
use crate::domain::cost::CostModel;
use crate::domain::engine::EngineSettings;
use crate::domain::error::EngineError;
use crate::domain::forecast::{ModelConfig, NormalizationParams, DEFAULT_TIME_STEPS};
use crate::domain::indicator::IndicatorWindows;
use crate::domain::signal::RsiThresholds;
use crate::domain::strategy::StrategyParams;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_INITIAL_CAPITAL: f64 = 100_000.0;
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub backtest: BacktestConfig,
    /// Present only when the `[model]` section is configured.
    pub model: Option<ModelConfig>,
    pub log_level: String,
}

pub fn load_engine_config(config: &dyn ConfigPort) -> Result<EngineConfig, EngineError> {
    let strategy = load_strategy(config)?;
    let costs = load_costs(config)?;
    let backtest = load_backtest(config, strategy, costs)?;
    let model = load_model(config)?;
    let log_level = config
        .get_string("logging", "level")
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

    Ok(EngineConfig {
        backtest,
        model,
        log_level,
    })
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> EngineError {
    EngineError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn read<T: FromStr>(config: &dyn ConfigPort, section: &str, key: &str) -> Result<Option<T>, EngineError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| invalid(section, key, format!("cannot parse '{raw}'"))),
    }
}

fn read_or<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: T,
) -> Result<T, EngineError> {
    Ok(read(config, section, key)?.unwrap_or(default))
}

pub fn load_strategy(config: &dyn ConfigPort) -> Result<StrategyParams, EngineError> {
    let defaults = StrategyParams::default();

    let params = StrategyParams {
        windows: IndicatorWindows {
            short: read_or(config, "strategy", "short_window", defaults.windows.short)?,
            long: read_or(config, "strategy", "long_window", defaults.windows.long)?,
            rsi: read_or(config, "strategy", "rsi_window", defaults.windows.rsi)?,
        },
        thresholds: RsiThresholds {
            oversold: read_or(config, "strategy", "oversold", defaults.thresholds.oversold)?,
            overbought: read_or(config, "strategy", "overbought", defaults.thresholds.overbought)?,
        },
        quantity: read_or(config, "strategy", "quantity", defaults.quantity)?,
        stop_loss_pct: read_or(config, "strategy", "stop_loss_pct", defaults.stop_loss_pct)?,
        take_profit_pct: read_or(config, "strategy", "take_profit_pct", defaults.take_profit_pct)?,
        independent_take_profit: config.get_bool("strategy", "independent_take_profit", false),
    };
    params.validate()?;
    Ok(params)
}

pub fn load_costs(config: &dyn ConfigPort) -> Result<CostModel, EngineError> {
    let defaults = CostModel::default();
    CostModel::new(
        read_or(config, "costs", "per_share_cost", defaults.per_share_cost)?,
        read_or(config, "costs", "min_trade_cost", defaults.min_trade_cost)?,
        read_or(config, "costs", "slippage_spread", defaults.slippage_spread)?,
    )
}

fn load_backtest(
    config: &dyn ConfigPort,
    strategy: StrategyParams,
    costs: CostModel,
) -> Result<BacktestConfig, EngineError> {
    let assets = parse_assets(config)?;

    let data_dir = config
        .get_string("backtest", "data_dir")
        .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());

    let initial_capital: f64 =
        read_or(config, "backtest", "initial_capital", DEFAULT_INITIAL_CAPITAL)?;
    if !initial_capital.is_finite() || initial_capital <= 0.0 {
        return Err(invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }

    let max_bar_gap = match read::<i64>(config, "backtest", "max_bar_gap_secs")? {
        None => None,
        Some(secs) if secs > 0 => Some(Duration::seconds(secs)),
        Some(_) => {
            return Err(invalid(
                "backtest",
                "max_bar_gap_secs",
                "max_bar_gap_secs must be positive",
            ))
        }
    };

    Ok(BacktestConfig {
        assets,
        data_dir: PathBuf::from(data_dir),
        engine: EngineSettings {
            strategy,
            costs,
            initial_capital,
            max_bar_gap,
        },
    })
}

fn parse_assets(config: &dyn ConfigPort) -> Result<Vec<String>, EngineError> {
    let raw = config
        .get_string("backtest", "assets")
        .ok_or_else(|| EngineError::ConfigMissing {
            section: "backtest".to_string(),
            key: "assets".to_string(),
        })?;

    let mut assets: Vec<String> = Vec::new();
    for asset in raw.split(',').map(|s| s.trim().to_uppercase()) {
        if asset.is_empty() {
            continue;
        }
        if assets.contains(&asset) {
            return Err(invalid("backtest", "assets", format!("duplicate asset {asset}")));
        }
        assets.push(asset);
    }
    if assets.is_empty() {
        return Err(EngineError::ConfigMissing {
            section: "backtest".to_string(),
            key: "assets".to_string(),
        });
    }
    Ok(assets)
}

fn load_model(config: &dyn ConfigPort) -> Result<Option<ModelConfig>, EngineError> {
    let min_price: Option<f64> = read(config, "model", "min_price")?;
    let max_price: Option<f64> = read(config, "model", "max_price")?;
    let time_steps: Option<usize> = read(config, "model", "time_steps")?;

    let (min_price, max_price) = match (min_price, max_price, time_steps) {
        (None, None, None) => return Ok(None),
        (Some(min), Some(max), _) => (min, max),
        (None, _, _) => {
            return Err(EngineError::ConfigMissing {
                section: "model".to_string(),
                key: "min_price".to_string(),
            })
        }
        (_, None, _) => {
            return Err(EngineError::ConfigMissing {
                section: "model".to_string(),
                key: "max_price".to_string(),
            })
        }
    };

    let time_steps = time_steps.unwrap_or(DEFAULT_TIME_STEPS);
    if time_steps == 0 {
        return Err(invalid("model", "time_steps", "time_steps must be at least 1"));
    }

    Ok(Some(ModelConfig {
        time_steps,
        normalization: NormalizationParams::new(min_price, max_price)?,
    }))
}
