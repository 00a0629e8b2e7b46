//! CLI definition and dispatch.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::CsvMarketData;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::paper_broker::PaperBroker;
use crate::adapters::persistence_predictor::PersistencePredictor;
use crate::domain::backtest::{run_backtest, RunReport};
use crate::domain::bar::{prices, Bar};
use crate::domain::config_validation::{load_engine_config, EngineConfig, DEFAULT_LOG_LEVEL};
use crate::domain::engine::{CancelToken, RunStatus};
use crate::domain::error::{EngineError, PredictionError};
use crate::domain::forecast::{Forecaster, ModelConfig};
use crate::domain::indicator::macd::calculate_macd_default;
use crate::domain::indicator::{calculate_ema, rsi_series, sma_series, IndicatorWindows};

#[derive(Parser, Debug)]
#[command(name = "stockbot", about = "Trend and RSI trading engine with cost-aware backtests")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the strategy over per-asset CSV price files
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Run a single asset instead of the configured list
        #[arg(long)]
        asset: Option<String>,
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Print indicator series for a price file as CSV
    Indicators {
        #[arg(short, long)]
        data: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Forecast prices with the baseline model
    Forecast {
        #[arg(short, long)]
        data: PathBuf,
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Run {
            config,
            asset,
            data_dir,
        } => run_engine(&config, asset.as_deref(), data_dir),
        Command::Validate { config } => run_validate(&config),
        Command::Indicators { data, config } => run_indicators(&data, config.as_deref()),
        Command::Forecast { data, config } => run_forecast(&data, &config),
    }
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
///
/// Several commands can run in one process (the integration tests do), so a
/// subscriber that is already installed is kept rather than treated as an error.
pub fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
    if let Err(err) = installed {
        tracing::debug!(error = %err, "keeping existing tracing subscriber");
    }
}

fn fail(err: &EngineError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

pub fn load_config(path: &Path) -> Result<EngineConfig, EngineError> {
    let adapter = FileConfigAdapter::from_file(path)?;
    load_engine_config(&adapter)
}

fn run_engine(config_path: &Path, asset: Option<&str>, data_dir: Option<PathBuf>) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    init_tracing(&config.log_level);

    let mut backtest = config.backtest;
    if let Some(asset) = asset {
        backtest.assets = vec![asset.trim().to_uppercase()];
    }
    if let Some(dir) = data_dir {
        backtest.data_dir = dir;
    }

    eprintln!(
        "Running {} asset(s) from {}",
        backtest.assets.len(),
        backtest.data_dir.display()
    );

    let cancel = CancelToken::new();
    let results = run_backtest(&backtest, &cancel, |asset| {
        let feed = CsvMarketData::for_asset(&backtest.data_dir, asset)?;
        Ok((feed, PaperBroker::new(backtest.engine.initial_capital)))
    });

    let mut exit = ExitCode::SUCCESS;
    for (asset, result) in &results {
        match result {
            Ok(report) => print_report(report),
            Err(e) => {
                eprintln!("\nerror: {asset}: {e}");
                exit = e.into();
            }
        }
    }
    exit
}

fn print_report(report: &RunReport) {
    let m = &report.metrics;
    let status = match report.status {
        RunStatus::Completed => "completed",
        RunStatus::Cancelled => "cancelled",
    };

    eprintln!("\n=== {} ({}) ===", report.asset, status);
    eprintln!(
        "Steps:            {} ({} failed)",
        report.steps.len(),
        report.failures.len()
    );
    eprintln!("Fills:            {}", report.fills().len());
    eprintln!("Total Return:     {:.2}%", m.total_return * 100.0);
    eprintln!("Max Drawdown:     -{:.1}%", m.max_drawdown * 100.0);
    eprintln!("Total Trades:     {}", m.total_trades);
    eprintln!("Win Rate:         {:.1}%", m.win_rate * 100.0);
    eprintln!("Profit Factor:    {:.2}", m.profit_factor);
    eprintln!("Total Costs:      {:.2}", m.total_costs);

    for trip in &report.ledger.round_trips {
        let sign = if trip.pnl >= 0.0 { "+" } else { "" };
        eprintln!(
            "  {} -> {}  {:<16} {} @ {:.2} -> {:.2}  {}{:.2}",
            trip.entry_time,
            trip.exit_time,
            trip.exit_reason.to_string(),
            trip.quantity,
            trip.entry_price,
            trip.exit_price,
            sign,
            trip.pnl,
        );
    }
    if report.ledger.holdings != 0 {
        eprintln!("  open position: {} shares", report.ledger.holdings);
    }
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };

    let engine = &config.backtest.engine;
    let strategy = &engine.strategy;
    eprintln!("Config validated successfully");
    eprintln!("\nAssets:           {}", config.backtest.assets.join(", "));
    eprintln!("Data dir:         {}", config.backtest.data_dir.display());
    eprintln!("Initial capital:  {:.2}", engine.initial_capital);
    eprintln!(
        "Windows:          short {} / long {} / rsi {} (warmup {} bars)",
        strategy.windows.short,
        strategy.windows.long,
        strategy.windows.rsi,
        strategy.windows.warmup()
    );
    eprintln!(
        "RSI thresholds:   {} / {}",
        strategy.thresholds.oversold, strategy.thresholds.overbought
    );
    eprintln!(
        "Risk:             stop {:.1}%, take profit {:.1}%{}",
        strategy.stop_loss_pct * 100.0,
        strategy.take_profit_pct * 100.0,
        if strategy.independent_take_profit {
            " (independent)"
        } else {
            ""
        }
    );
    eprintln!(
        "Costs:            {} per share, min {}, spread {}",
        engine.costs.per_share_cost, engine.costs.min_trade_cost, engine.costs.slippage_spread
    );
    if let Some(model) = &config.model {
        eprintln!(
            "Model:            {} steps, price range {} - {}",
            model.time_steps, model.normalization.min_price, model.normalization.max_price
        );
    }
    ExitCode::SUCCESS
}

fn asset_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_uppercase())
        .unwrap_or_default()
}

pub fn load_bars(path: &Path) -> Result<Vec<Bar>, EngineError> {
    CsvMarketData::open(path, &asset_from_path(path))?.read_all()
}

fn run_indicators(data: &Path, config_path: Option<&Path>) -> ExitCode {
    let windows = match config_path {
        Some(path) => match load_config(path) {
            Ok(c) => {
                init_tracing(&c.log_level);
                c.backtest.engine.strategy.windows
            }
            Err(e) => return fail(&e),
        },
        None => {
            init_tracing(DEFAULT_LOG_LEVEL);
            IndicatorWindows::default()
        }
    };

    let result = load_bars(data)
        .and_then(|bars| write_indicator_csv(&bars, windows, std::io::stdout().lock()));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(&e),
    }
}

fn cell(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.4}")).unwrap_or_default()
}

/// One row per bar; columns stay empty until their indicator is defined.
pub fn write_indicator_csv<W: Write>(
    bars: &[Bar],
    windows: IndicatorWindows,
    out: W,
) -> Result<(), EngineError> {
    let prices = prices(bars);
    let sma_short = sma_series(&prices, windows.short);
    let sma_long = sma_series(&prices, windows.long);
    let ema_short = calculate_ema(&prices, windows.short);
    let rsi = rsi_series(&prices, windows.rsi);
    let macd = calculate_macd_default(&prices);

    let mut writer = csv::Writer::from_writer(out);
    writer
        .write_record([
            "timestamp",
            "price",
            "sma_short",
            "sma_long",
            "ema_short",
            "rsi",
            "macd",
            "macd_signal",
            "macd_histogram",
        ])
        .map_err(std::io::Error::other)?;

    for (i, bar) in bars.iter().enumerate() {
        let point = macd[i];
        writer
            .write_record([
                bar.timestamp.to_string(),
                bar.price.to_string(),
                cell(sma_short[i]),
                cell(sma_long[i]),
                cell(ema_short[i]),
                cell(rsi[i]),
                cell(point.map(|p| p.line)),
                cell(point.map(|p| p.signal)),
                cell(point.map(|p| p.histogram)),
            ])
            .map_err(std::io::Error::other)?;
    }
    writer.flush()?;
    Ok(())
}

fn run_forecast(data: &Path, config_path: &Path) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    init_tracing(&config.log_level);

    let Some(model) = config.model else {
        return fail(&EngineError::ConfigMissing {
            section: "model".to_string(),
            key: "min_price".to_string(),
        });
    };

    let bars = match load_bars(data) {
        Ok(b) => b,
        Err(e) => return fail(&e),
    };

    match forecast_prices(&prices(&bars), model) {
        Ok(predictions) => {
            for value in predictions {
                println!("{value:.4}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

pub fn forecast_prices(prices: &[f64], model: ModelConfig) -> Result<Vec<f64>, EngineError> {
    Forecaster::new(PersistencePredictor, model)
        .forecast(prices)
        .map_err(|e| match e {
            PredictionError::InvalidInput(reason) => EngineError::Validation { reason },
            internal @ PredictionError::Internal(_) => std::io::Error::other(internal).into(),
        })
}
