//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvBarSource;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{BacktestConfig, EntryMethod, ExitMethod};
use crate::domain::cache::SeriesCache;
use crate::domain::config_validation::validate_config;
use crate::domain::error::StratrankError;
use crate::domain::evaluation::{EvaluationConfig, Evaluator, InstrumentReport};
use crate::domain::market_context::{assess_signal_quality, assess_trend};
use crate::domain::ranking::RankingWeights;
use crate::domain::signal::{generate_signals, SignalSummary};
use crate::domain::strategy::{StrategyKind, StrategyParams};
use crate::domain::universe::{parse_instruments, validate_universe};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::BarSource;

#[derive(Parser, Debug)]
#[command(
    name = "stratrank",
    about = "Evaluate and rank technical entry strategies per instrument"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Backtest every strategy on every instrument and rank them
    Evaluate {
        #[arg(short, long)]
        config: PathBuf,
        /// Overrides [data] directory
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
        /// Evaluate a single instrument instead of the configured list
        #[arg(short, long)]
        instrument: Option<String>,
        /// Write one CSV row per (instrument, strategy)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show current signals and market context for one instrument
    Signals {
        #[arg(short, long)]
        data_dir: PathBuf,
        #[arg(short, long)]
        instrument: String,
        /// Bars counted per strategy; 1 counts today only
        #[arg(long, default_value_t = 1)]
        days_back: usize,
        /// Optional [strategies] thresholds
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List instruments available in a data directory
    List {
        #[arg(short, long)]
        data_dir: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Evaluate {
            config,
            data_dir,
            instrument,
            output,
        } => run_evaluate(
            &config,
            data_dir.as_deref(),
            instrument.as_deref(),
            output.as_deref(),
        ),
        Command::Signals {
            data_dir,
            instrument,
            days_back,
            config,
        } => run_signals(&data_dir, &instrument, days_back, config.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::List { data_dir } => run_list(&data_dir),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, StratrankError> {
    log::info!("loading config from {}", path.display());
    FileConfigAdapter::from_file(path)
}

fn config_invalid(section: &str, key: &str, reason: String) -> StratrankError {
    StratrankError::ConfigInvalid {
        section: section.into(),
        key: key.into(),
        reason,
    }
}

fn non_negative_usize(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, StratrankError> {
    let value = config.get_int(section, key, default as i64);
    usize::try_from(value)
        .map_err(|_| config_invalid(section, key, format!("{key} must be non-negative")))
}

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, StratrankError> {
    let defaults = BacktestConfig::default();

    let entry_method = match config.get_string("backtest", "entry_method") {
        Some(s) => s
            .parse::<EntryMethod>()
            .map_err(|reason| config_invalid("backtest", "entry_method", reason))?,
        None => defaults.entry_method,
    };
    let exit_method = match config.get_string("backtest", "exit_method") {
        Some(s) => s
            .parse::<ExitMethod>()
            .map_err(|reason| config_invalid("backtest", "exit_method", reason))?,
        None => defaults.exit_method,
    };

    Ok(BacktestConfig {
        entry_method,
        exit_method,
        hold_days: non_negative_usize(config, "backtest", "hold_days", defaults.hold_days)?,
        transaction_cost: config.get_double(
            "backtest",
            "transaction_cost",
            defaults.transaction_cost,
        ),
        slippage: config.get_double("backtest", "slippage", defaults.slippage),
    })
}

pub fn build_ranking_weights(config: &dyn ConfigPort) -> RankingWeights {
    let defaults = RankingWeights::default();
    RankingWeights {
        win_ratio: config.get_double("ranking", "win_ratio_weight", defaults.win_ratio),
        profit_factor: config.get_double(
            "ranking",
            "profit_factor_weight",
            defaults.profit_factor,
        ),
        ltm_return: config.get_double("ranking", "ltm_return_weight", defaults.ltm_return),
    }
}

pub fn build_strategy_params(config: &dyn ConfigPort) -> Result<StrategyParams, StratrankError> {
    let d = StrategyParams::default();
    Ok(StrategyParams {
        bb_window: non_negative_usize(config, "strategies", "bb_window", d.bb_window)?,
        percent_b_floor: config.get_double("strategies", "percent_b_floor", d.percent_b_floor),
        macd_require_negative: config.get_bool(
            "strategies",
            "macd_require_negative",
            d.macd_require_negative,
        ),
        dip_threshold: config.get_double("strategies", "dip_threshold", d.dip_threshold),
        volume_multiplier: config.get_double(
            "strategies",
            "volume_multiplier",
            d.volume_multiplier,
        ),
        rsi_low: config.get_double("strategies", "rsi_low", d.rsi_low),
        rsi_adx_min: config.get_double("strategies", "rsi_adx_min", d.rsi_adx_min),
        rsi_band_low: config.get_double("strategies", "rsi_band_low", d.rsi_band_low),
        rsi_band_high: config.get_double("strategies", "rsi_band_high", d.rsi_band_high),
        percent_b_ceiling: config.get_double(
            "strategies",
            "percent_b_ceiling",
            d.percent_b_ceiling,
        ),
        bb_adx_min: config.get_double("strategies", "bb_adx_min", d.bb_adx_min),
    })
}

pub fn build_evaluation_config(
    config: &dyn ConfigPort,
) -> Result<EvaluationConfig, StratrankError> {
    Ok(EvaluationConfig {
        backtest: build_backtest_config(config)?,
        ranking: build_ranking_weights(config),
        params: build_strategy_params(config)?,
        workers: non_negative_usize(config, "engine", "workers", 0)?,
    })
}

/// Command-line override, then `[data] instruments`, then everything the source has.
pub fn resolve_instruments(
    instrument_override: Option<&str>,
    config: &dyn ConfigPort,
    source: &dyn BarSource,
) -> Result<Vec<String>, StratrankError> {
    if let Some(list) = instrument_override {
        return Ok(parse_instruments(list)?);
    }
    if let Some(list) = config.get_string("data", "instruments") {
        return Ok(parse_instruments(&list)?);
    }
    source.list_instruments()
}

pub fn resolve_data_dir(data_dir_override: Option<&Path>, config: &dyn ConfigPort) -> PathBuf {
    match data_dir_override {
        Some(dir) => dir.to_path_buf(),
        None => config
            .get_string("data", "directory")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".")),
    }
}

fn run_evaluate(
    config_path: &Path,
    data_dir: Option<&Path>,
    instrument: Option<&str>,
    output: Option<&Path>,
) -> Result<(), StratrankError> {
    // Stage 1: configuration
    let adapter = load_config(config_path)?;
    validate_config(&adapter)?;
    let eval_config = build_evaluation_config(&adapter)?;

    // Stage 2: universe
    let data_dir = resolve_data_dir(data_dir, &adapter);
    let source = CsvBarSource::new(data_dir.clone());
    let instruments = resolve_instruments(instrument, &adapter, &source)?;
    if instruments.is_empty() {
        return Err(StratrankError::NoData {
            instrument: format!("any instrument in {}", data_dir.display()),
        });
    }
    log::info!(
        "validating {} instruments from {}",
        instruments.len(),
        data_dir.display()
    );

    let mut cache = SeriesCache::new();
    let universe = validate_universe(&source, &mut cache, &instruments)?;

    // Stage 3: evaluation
    let evaluator = Evaluator::new(eval_config)?;
    let reports = evaluator.evaluate_all(&universe.instruments);

    // Stage 4: presentation
    for report in &reports {
        print_report(report);
    }

    if let Some(path) = output {
        write_results_csv(path, &reports)?;
        log::info!("results written to {}", path.display());
    }
    Ok(())
}

fn print_report(report: &InstrumentReport) {
    println!("\n=== {} ({} bars) ===", report.instrument, report.bar_count);
    match report.recommended() {
        Some((best, result)) if result.total_trades > 0 => println!(
            "Recommended: {} (score {:.3}, {} trades, {:.1}% win rate)",
            best.strategy,
            best.score,
            result.total_trades,
            result.win_ratio * 100.0
        ),
        _ => println!("Recommended: none (no strategy traded)"),
    }

    println!(
        "  {:>4}  {:<18} {:>6} {:>6} {:>6} {:>7} {:>8} {:>8}  {}",
        "Rank", "Strategy", "Score", "Trades", "Win%", "PF", "Total%", "LTM%", "Signal"
    );
    for (rank, entry) in report.ranking.iter().enumerate() {
        let Some(outcome) = report.outcome(entry.strategy) else {
            continue;
        };
        let r = &outcome.result;
        println!(
            "  {:>4}  {:<18} {:>6.3} {:>6} {:>6.1} {:>7.2} {:>8.2} {:>8.2}  {}",
            rank + 1,
            entry.strategy.name(),
            entry.score,
            r.total_trades,
            r.win_ratio * 100.0,
            r.profit_factor,
            r.total_return * 100.0,
            r.ltm_return * 100.0,
            if outcome.latest_signal { "BUY" } else { "-" },
        );
    }

    for (strategy, err) in report.faults() {
        println!("  warning: {strategy} fell back to zero result ({err})");
    }
}

/// One row of the `--output` CSV.
#[derive(Debug, Serialize)]
pub struct ResultRow<'a> {
    pub instrument: &'a str,
    pub strategy: &'static str,
    pub rank: usize,
    pub score: f64,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_ratio: f64,
    pub avg_return: f64,
    pub total_return: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub profit_factor: f64,
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
    pub avg_hold_days: f64,
    pub trades_per_year: f64,
    pub ltm_return: f64,
    pub cagr: f64,
    pub latest_signal: bool,
    pub error: Option<String>,
}

pub fn result_rows(report: &InstrumentReport) -> Vec<ResultRow<'_>> {
    report
        .ranking
        .iter()
        .enumerate()
        .filter_map(|(rank, entry)| {
            let outcome = report.outcome(entry.strategy)?;
            let r = &outcome.result;
            Some(ResultRow {
                instrument: &report.instrument,
                strategy: entry.strategy.name(),
                rank: rank + 1,
                score: entry.score,
                total_trades: r.total_trades,
                winning_trades: r.winning_trades,
                losing_trades: r.losing_trades,
                win_ratio: r.win_ratio,
                avg_return: r.avg_return,
                total_return: r.total_return,
                avg_win: r.avg_win,
                avg_loss: r.avg_loss,
                profit_factor: r.profit_factor,
                max_drawdown: r.max_drawdown,
                sharpe_ratio: r.sharpe_ratio,
                avg_hold_days: r.avg_hold_days,
                trades_per_year: r.trades_per_year,
                ltm_return: r.ltm_return,
                cagr: r.cagr,
                latest_signal: outcome.latest_signal,
                error: outcome.error.as_ref().map(|e| e.to_string()),
            })
        })
        .collect()
}

pub fn write_results_csv(path: &Path, reports: &[InstrumentReport]) -> Result<(), StratrankError> {
    let mut wtr = csv::Writer::from_path(path).map_err(std::io::Error::from)?;
    for report in reports {
        for row in result_rows(report) {
            wtr.serialize(row).map_err(std::io::Error::from)?;
        }
    }
    wtr.flush()?;
    Ok(())
}

fn run_signals(
    data_dir: &Path,
    instrument: &str,
    days_back: usize,
    config_path: Option<&Path>,
) -> Result<(), StratrankError> {
    let params = match config_path {
        Some(path) => {
            let adapter = load_config(path)?;
            validate_config(&adapter)?;
            build_strategy_params(&adapter)?
        }
        None => StrategyParams::default(),
    };

    let instrument = instrument.trim().to_uppercase();
    let source = CsvBarSource::new(data_dir.to_path_buf());
    let series = source.fetch_series(&instrument)?;
    if series.is_empty() {
        return Err(StratrankError::NoData { instrument });
    }

    let set = generate_signals(&series, &params);
    let summary = SignalSummary::from_signals(&set, days_back);
    let quality = assess_signal_quality(&series);
    let trend = assess_trend(&series);

    let last_date = series
        .last_date()
        .map(|d| d.to_string())
        .unwrap_or_default();
    println!("=== {instrument} as of {last_date} ===");
    println!("Trend:   {trend}");
    println!(
        "Quality: {} ({}/{}) {}",
        quality.grade,
        quality.score,
        quality.max_score,
        quality.factors.join(", ")
    );
    println!(
        "\nSignals today: {} ({})",
        summary.total_signals_today,
        summary
            .active_strategies
            .iter()
            .map(|s| s.name())
            .collect::<Vec<_>>()
            .join(", ")
    );

    println!("\n  {:<18} {:>6}  {}", "Strategy", "Recent", "Latest");
    for kind in StrategyKind::ALL {
        let Some(detail) = summary.details.get(&kind) else {
            continue;
        };
        let note = match set.get(kind).and_then(|e| e.error.as_ref()) {
            Some(err) => format!("  ({err})"),
            None => String::new(),
        };
        println!(
            "  {:<18} {:>6}  {}{}",
            kind.name(),
            detail.signals_count,
            if detail.latest_signal { "BUY" } else { "-" },
            note
        );
    }
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), StratrankError> {
    let adapter = load_config(config_path)?;
    validate_config(&adapter)?;
    let config = build_evaluation_config(&adapter)?;

    println!(
        "Backtest:  entry={} exit={} hold_days={} cost={} slippage={}",
        config.backtest.entry_method,
        config.backtest.exit_method,
        config.backtest.hold_days,
        config.backtest.transaction_cost,
        config.backtest.slippage,
    );
    println!(
        "Ranking:   win_ratio={} profit_factor={} ltm_return={}",
        config.ranking.win_ratio, config.ranking.profit_factor, config.ranking.ltm_return
    );
    if let Some(list) = adapter.get_string("data", "instruments") {
        println!("Universe:  {}", parse_instruments(&list)?.join(", "));
    }
    println!("\nConfiguration is valid.");
    Ok(())
}

fn run_list(data_dir: &Path) -> Result<(), StratrankError> {
    let source = CsvBarSource::new(data_dir.to_path_buf());
    let instruments = source.list_instruments()?;

    if instruments.is_empty() {
        log::warn!("no instruments found in {}", data_dir.display());
    }
    for instrument in &instruments {
        println!("{instrument}");
    }
    log::info!("{} instruments found", instruments.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_evaluate() {
        let cli = Cli::try_parse_from([
            "stratrank",
            "evaluate",
            "--config",
            "run.ini",
            "--instrument",
            "AAPL",
        ])
        .unwrap();
        match cli.command {
            Command::Evaluate {
                config, instrument, ..
            } => {
                assert_eq!(config, PathBuf::from("run.ini"));
                assert_eq!(instrument.as_deref(), Some("AAPL"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn cli_signals_default_days_back() {
        let cli = Cli::try_parse_from([
            "stratrank",
            "signals",
            "--data-dir",
            "/data",
            "--instrument",
            "MSFT",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Signals { days_back: 1, .. }));
    }

    #[test]
    fn cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["stratrank"]).is_err());
    }
}
