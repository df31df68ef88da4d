mod common;

use approx::assert_abs_diff_eq;
use common::*;
use std::fs;
use std::sync::Arc;
use stratrank::adapters::csv_adapter::CsvBarSource;
use stratrank::domain::backtest::{run_backtest, BacktestConfig, EntryMethod, ExitReason, Trade};
use stratrank::domain::bar::{Bar, BarField};
use stratrank::domain::cache::SeriesCache;
use stratrank::domain::error::{EvaluationError, SignalError, StratrankError};
use stratrank::domain::evaluation::{evaluate_instrument, EvaluationConfig, Evaluator};
use stratrank::domain::metrics::StrategyResult;
use stratrank::domain::ranking::{rank_strategies, RankingWeights};
use stratrank::domain::signal::{generate_signals, SignalSeries, SignalSummary};
use stratrank::domain::strategy::{StrategyKind, StrategyParams};
use stratrank::domain::universe::{validate_universe, SkipReason};
use stratrank::ports::data_port::BarSource;
use tempfile::TempDir;

fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                f64::NAN
            } else {
                values[i + 1 - window..=i].iter().sum::<f64>() / window as f64
            }
        })
        .collect()
}

/// Flat at 100 for `flat` bars, then rising by one per bar, with real 5/13 SMAs.
fn flat_then_rising(flat: usize, total: usize) -> Vec<Bar> {
    let closes: Vec<f64> = (0..total)
        .map(|i| if i < flat { 100.0 } else { 100.0 + (i - flat + 1) as f64 })
        .collect();
    let sma5 = rolling_mean(&closes, 5);
    let sma13 = rolling_mean(&closes, 13);

    let mut bars = neutral_bars("2023-01-02", total, 100.0);
    for (i, bar) in bars.iter_mut().enumerate() {
        bar.open = closes[i];
        bar.close = closes[i];
        bar.high = closes[i] + 1.0;
        bar.low = closes[i] - 1.0;
        bar.bb_mid = closes[i];
        bar.bb_lower = closes[i] - 10.0;
        bar.sma_5 = sma5[i];
        bar.sma_13 = sma13[i];
        bar.daily_return = if i == 0 { f64::NAN } else { closes[i] / closes[i - 1] - 1.0 };
    }
    bars
}

fn trade(net_return: f64, entry: &str, exit: &str) -> Trade {
    Trade {
        strategy: StrategyKind::MacdCross,
        signal_date: date(entry),
        entry_date: date(entry),
        exit_date: date(exit),
        entry_price: 100.0,
        exit_price: 100.0 * (1.0 + net_return),
        gross_return: net_return,
        net_return,
        hold_days: (date(exit) - date(entry)).num_days(),
        pnl_percent: net_return * 100.0,
        exit_reason: ExitReason::TimeBased,
    }
}

// --- signal generation ---

#[test]
fn rising_prices_cross_sma_exactly_once() {
    let s = series(flat_then_rising(30, 60));
    let set = generate_signals(&s, &StrategyParams::default());
    let sma = &set.get(StrategyKind::Sma513Crossover).unwrap().signals;

    assert_eq!(sma.len(), 60);
    assert_eq!(sma.true_indices().collect::<Vec<_>>(), vec![30]);
}

#[test]
fn every_strategy_returns_full_length() {
    for count in [0, 5, 19, 20, 49, 50, 120] {
        let s = series(neutral_bars("2023-01-02", count, 100.0));
        let set = generate_signals(&s, &StrategyParams::default());
        assert_eq!(set.len(), StrategyKind::ALL.len());
        for entry in set.iter() {
            assert_eq!(entry.signals.len(), count, "{} at {count}", entry.strategy);
        }
    }
}

#[test]
fn insufficient_history_is_not_a_fault() {
    let mut bars = neutral_bars("2023-01-02", 30, 100.0);
    cross_sma_at(&mut bars, 25);
    let set = generate_signals(&series(bars), &StrategyParams::default());

    let macd = set.get(StrategyKind::MacdCross).unwrap();
    assert_eq!(macd.signals.count(), 0);
    assert!(!macd.error.as_ref().unwrap().is_fault());

    // 20-bar strategies still run
    let sma = set.get(StrategyKind::Sma513Crossover).unwrap();
    assert!(sma.error.is_none());
    assert_eq!(sma.signals.count(), 1);
}

#[test]
fn latest_signals_and_summary() {
    let mut bars = neutral_bars("2023-01-02", 60, 100.0);
    cross_sma_at(&mut bars, 59);
    let set = generate_signals(&series(bars), &StrategyParams::default());

    let latest = set.latest();
    assert_eq!(latest.len(), 8);
    assert!(latest[&StrategyKind::Sma513Crossover]);
    assert!(!latest[&StrategyKind::MacdCross]);

    let summary = SignalSummary::from_signals(&set, 5);
    assert_eq!(summary.total_signals_today, 1);
    assert_eq!(summary.active_strategies, vec![StrategyKind::Sma513Crossover]);
}

// --- backtest scenarios ---

#[test]
fn same_close_ten_day_trade() {
    let closes: Vec<f64> = (0..15)
        .map(|i| match i {
            0 => 100.0,
            10 => 110.0,
            _ => 105.0,
        })
        .collect();
    let mut bars = neutral_bars("2024-01-01", closes.len(), 100.0);
    for (bar, close) in bars.iter_mut().zip(&closes) {
        bar.close = *close;
    }
    let s = series(bars);
    let mut flags = vec![false; s.len()];
    flags[0] = true;

    let config = BacktestConfig {
        entry_method: EntryMethod::SameClose,
        hold_days: 10,
        ..BacktestConfig::default()
    };
    let trades = run_backtest(&s, &SignalSeries::from(flags), StrategyKind::MacdCross, &config)
        .unwrap();

    assert_eq!(trades.len(), 1);
    let t = &trades[0];
    assert_abs_diff_eq!(t.entry_price, 100.05, epsilon = 1e-9);
    assert_abs_diff_eq!(t.exit_price, 109.945, epsilon = 1e-9);
    assert_abs_diff_eq!(t.gross_return, (109.945 - 100.05) / 100.05, epsilon = 1e-12);
    assert_abs_diff_eq!(t.gross_return, 0.09890, epsilon = 1e-5);
    assert_abs_diff_eq!(t.net_return, 0.09690, epsilon = 1e-5);
    assert_eq!(t.hold_days, 10);
}

#[test]
fn next_open_signal_on_last_bar_is_skipped() {
    let s = series(neutral_bars("2024-01-01", 30, 100.0));
    let mut flags = vec![false; 30];
    flags[10] = true;
    flags[29] = true;

    let trades = run_backtest(
        &s,
        &SignalSeries::from(flags),
        StrategyKind::MacdCross,
        &BacktestConfig::default(),
    )
    .unwrap();

    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].signal_date, date("2024-01-11"));
}

#[test]
fn overlapping_signals_each_trade() {
    let s = series(neutral_bars("2024-01-01", 40, 100.0));
    let mut flags = vec![false; 40];
    flags[5] = true;
    flags[6] = true;
    flags[7] = true;

    let trades = run_backtest(
        &s,
        &SignalSeries::from(flags),
        StrategyKind::MacdCross,
        &BacktestConfig::default(),
    )
    .unwrap();
    assert_eq!(trades.len(), 3);
    assert!(trades[1].entry_date < trades[0].exit_date);
}

#[test]
fn empty_signals_give_zero_result() {
    let s = series(neutral_bars("2024-01-01", 60, 100.0));
    let trades = run_backtest(
        &s,
        &SignalSeries::all_false(60),
        StrategyKind::BbSignal513,
        &BacktestConfig::default(),
    )
    .unwrap();
    let result = StrategyResult::compute(StrategyKind::BbSignal513, &trades, s.len(), s.last_date());
    assert_eq!(result, StrategyResult::empty(StrategyKind::BbSignal513));
}

// --- metrics and ranking ---

#[test]
fn three_trade_metrics() {
    let trades = vec![
        trade(0.05, "2024-01-02", "2024-01-12"),
        trade(-0.02, "2024-02-01", "2024-02-11"),
        trade(0.03, "2024-03-01", "2024-03-11"),
    ];
    let r = StrategyResult::compute(StrategyKind::MacdCross, &trades, 100, Some(date("2024-04-01")));

    assert_eq!(r.total_trades, 3);
    assert_eq!(r.winning_trades, 2);
    assert_eq!(r.losing_trades, 1);
    assert_abs_diff_eq!(r.win_ratio, 2.0 / 3.0, epsilon = 1e-12);
    assert_abs_diff_eq!(r.profit_factor, 4.0, epsilon = 1e-12);
    assert_abs_diff_eq!(r.avg_return, 0.02, epsilon = 1e-12);
    assert_abs_diff_eq!(r.ltm_return, 0.06, epsilon = 1e-12);
    assert_abs_diff_eq!(r.trades_per_year, 3.0 * 252.0 / 100.0, epsilon = 1e-12);
    assert_eq!(r.cagr, 0.0);
    assert!(r.max_drawdown < 0.0);
}

#[test]
fn ranking_prefers_better_results_and_keeps_tie_order() {
    let trades = vec![trade(0.05, "2024-01-02", "2024-01-12")];
    let winner = StrategyResult::compute(StrategyKind::DipBuy513, &trades, 100, Some(date("2024-02-01")));
    let results = vec![
        StrategyResult::empty(StrategyKind::BbSignal513),
        StrategyResult::empty(StrategyKind::Sma513Crossover),
        winner,
        StrategyResult::empty(StrategyKind::MacdCross),
    ];
    let ranked = rank_strategies(&results, &RankingWeights::default());
    let order: Vec<_> = ranked.iter().map(|r| r.strategy).collect();
    assert_eq!(
        order,
        vec![
            StrategyKind::DipBuy513,
            StrategyKind::BbSignal513,
            StrategyKind::Sma513Crossover,
            StrategyKind::MacdCross
        ]
    );
}

// --- full pipeline ---

fn trending_instrument(cross_at: usize, count: usize) -> Vec<Bar> {
    let mut bars = neutral_bars("2023-01-02", count, 100.0);
    ramp_prices(&mut bars, 100.0, 0.5);
    cross_sma_at(&mut bars, cross_at);
    bars
}

#[test]
fn pipeline_from_source_to_ranking() {
    let source = MockBarSource::new()
        .with_series("AAA", series(trending_instrument(40, 150)))
        .with_series("BBB", series(trending_instrument(60, 120)))
        .with_series("SHORT", series(neutral_bars("2023-01-02", 80, 100.0)))
        .with_error("BAD", "corrupt file");

    let mut cache = SeriesCache::new();
    let instruments: Vec<String> = ["AAA", "SHORT", "BBB", "BAD", "NONE"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let universe = validate_universe(&source, &mut cache, &instruments).unwrap();

    assert_eq!(universe.count(), 2);
    let skipped: Vec<_> = universe
        .skipped
        .iter()
        .map(|s| (s.instrument.as_str(), s.reason.clone()))
        .collect();
    assert_eq!(
        skipped,
        vec![
            ("SHORT", SkipReason::InsufficientBars { bars: 80 }),
            ("BAD", SkipReason::FetchFailed("data error: corrupt file".to_string())),
            ("NONE", SkipReason::NoData),
        ]
    );

    let evaluator = Evaluator::new(EvaluationConfig {
        workers: 3,
        ..EvaluationConfig::default()
    })
    .unwrap();
    let reports = evaluator.evaluate_all(&universe.instruments);

    let names: Vec<_> = reports.iter().map(|r| r.instrument.as_str()).collect();
    assert_eq!(names, vec!["AAA", "BBB"]);

    for report in &reports {
        assert_eq!(report.outcomes.len(), 8);
        assert_eq!(report.ranking.len(), 8);
        assert_eq!(report.results().len(), 8);
        assert_eq!(report.latest_signals().len(), 8);
        assert_eq!(report.faults().count(), 0);

        let (best, result) = report.recommended().unwrap();
        assert_eq!(best.strategy, StrategyKind::Sma513Crossover);
        assert_eq!(result.total_trades, 1);
        assert_eq!(result.winning_trades, 1);
        assert!(best.score > 0.0 && best.score <= 1.0);
    }
}

#[test]
fn missing_column_is_isolated_fault() {
    let bars = trending_instrument(40, 150);
    let s = series_without(bars, &[BarField::Adx]);
    let report = evaluate_instrument("NOADX", &s, &EvaluationConfig::default());

    let faults: Vec<_> = report.faults().map(|(k, _)| k).collect();
    assert_eq!(faults, vec![StrategyKind::RsiAdxSignal, StrategyKind::Bb513Adx]);

    let adx = report.outcome(StrategyKind::Bb513Adx).unwrap();
    assert_eq!(adx.result, StrategyResult::empty(StrategyKind::Bb513Adx));
    assert_eq!(
        adx.error,
        Some(EvaluationError::Signal(SignalError::MissingField {
            field: BarField::Adx
        }))
    );

    // siblings unaffected
    let sma = report.outcome(StrategyKind::Sma513Crossover).unwrap();
    assert!(sma.error.is_none());
    assert_eq!(sma.result.total_trades, 1);
}

#[test]
fn parallel_and_sequential_agree() {
    let a = Arc::new(series(trending_instrument(40, 150)));
    let b = Arc::new(series_without(trending_instrument(70, 130), &[BarField::Macd]));
    let instruments = vec![("A".to_string(), Arc::clone(&a)), ("B".to_string(), Arc::clone(&b))];

    let config = EvaluationConfig {
        workers: 4,
        ..EvaluationConfig::default()
    };
    let reports = Evaluator::new(config.clone()).unwrap().evaluate_all(&instruments);

    assert_eq!(reports[0], evaluate_instrument("A", &a, &config));
    assert_eq!(reports[1], evaluate_instrument("B", &b, &config));
    assert_eq!(reports[1].faults().count(), 2);
}

#[test]
fn all_instruments_skipped_is_error() {
    let source = MockBarSource::new().with_series("TINY", series(neutral_bars("2023-01-02", 10, 1.0)));
    let mut cache = SeriesCache::new();
    let err = validate_universe(&source, &mut cache, &["TINY".to_string()]).unwrap_err();
    assert!(matches!(err, StratrankError::InsufficientData { .. }));
}

// --- undefined prices ---

fn gap_on_last_close() -> Vec<Bar> {
    let mut bars = trending_instrument(20, 30);
    bars[29].close = f64::NAN;
    bars
}

#[test]
fn blank_close_in_csv_is_data_error() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("GAP.csv"), to_csv(&gap_on_last_close())).unwrap();

    let err = CsvBarSource::new(dir.path().to_path_buf())
        .fetch_series("GAP")
        .unwrap_err();
    assert!(matches!(err, StratrankError::Data { reason } if reason.contains("Close")));
}

#[test]
fn undefined_exit_price_keeps_scores_in_range() {
    let config = EvaluationConfig {
        backtest: BacktestConfig {
            entry_method: EntryMethod::SameClose,
            ..BacktestConfig::default()
        },
        ..EvaluationConfig::default()
    };
    let report = evaluate_instrument("GAP", &series(gap_on_last_close()), &config);

    // the only crossover exits on the undefined close and is dropped
    let sma = report.outcome(StrategyKind::Sma513Crossover).unwrap();
    assert!(sma.error.is_none());
    assert!(sma.trades.is_empty());

    for entry in &report.ranking {
        assert!((0.0..=1.0).contains(&entry.score), "{}: {}", entry.strategy, entry.score);
    }
    for outcome in &report.outcomes {
        assert!(outcome.trades.iter().all(|t| t.net_return.is_finite()));
        assert!(outcome.result.total_return.is_finite());
    }
}
