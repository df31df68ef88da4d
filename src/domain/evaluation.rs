//! Evaluation pipeline: signals -> trades -> metrics -> ranking.
//!
//! Work is split into one task per (instrument, strategy) pair. Tasks share no
//! mutable state; each writes into its own pre-allocated slot, and a failing
//! task is replaced by the zero result without touching its siblings.

use crate::domain::backtest::{run_backtest, BacktestConfig, Trade};
use crate::domain::error::{EvaluationError, StratrankError};
use crate::domain::metrics::StrategyResult;
use crate::domain::ranking::{best_strategy, rank_strategies, RankedScore, RankingWeights};
use crate::domain::series::BarSeries;
use crate::domain::signal::signals_for;
use crate::domain::strategy::{StrategyKind, StrategyParams};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EvaluationConfig {
    pub backtest: BacktestConfig,
    pub ranking: RankingWeights,
    pub params: StrategyParams,
    /// Worker threads; 0 uses every available core.
    pub workers: usize,
}

/// Everything computed for one strategy on one instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyOutcome {
    pub strategy: StrategyKind,
    pub result: StrategyResult,
    pub trades: Vec<Trade>,
    pub latest_signal: bool,
    /// Set when the zero result was substituted.
    pub error: Option<EvaluationError>,
}

impl StrategyOutcome {
    fn substituted(strategy: StrategyKind, latest_signal: bool, error: EvaluationError) -> Self {
        Self {
            strategy,
            result: StrategyResult::empty(strategy),
            trades: Vec::new(),
            latest_signal,
            error: Some(error),
        }
    }
}

/// Run signals, backtest and metrics for a single strategy.
pub fn evaluate_strategy(
    strategy: StrategyKind,
    series: &BarSeries,
    config: &EvaluationConfig,
) -> StrategyOutcome {
    let signals = signals_for(strategy, series, &config.params);
    let latest_signal = signals.signals.latest();

    if let Some(err) = signals.error {
        return StrategyOutcome::substituted(strategy, latest_signal, err.into());
    }

    match run_backtest(series, &signals.signals, strategy, &config.backtest) {
        Ok(trades) => {
            let result =
                StrategyResult::compute(strategy, &trades, series.len(), series.last_date());
            StrategyOutcome {
                strategy,
                result,
                trades,
                latest_signal,
                error: None,
            }
        }
        Err(err) => {
            log::warn!("{strategy}: backtest failed: {err}");
            StrategyOutcome::substituted(strategy, latest_signal, err.into())
        }
    }
}

/// [`evaluate_strategy`] with panics converted into a substituted outcome.
fn evaluate_isolated(
    strategy: StrategyKind,
    series: &BarSeries,
    config: &EvaluationConfig,
) -> StrategyOutcome {
    isolate(strategy, || evaluate_strategy(strategy, series, config))
}

fn isolate<F>(strategy: StrategyKind, task: F) -> StrategyOutcome
where
    F: FnOnce() -> StrategyOutcome,
{
    panic::catch_unwind(AssertUnwindSafe(task)).unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        log::warn!("{strategy}: {message}");
        StrategyOutcome::substituted(strategy, false, EvaluationError::Panicked(message))
    })
}

/// Per-instrument output handed to presentation.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentReport {
    pub instrument: String,
    pub bar_count: usize,
    /// Canonical strategy order.
    pub outcomes: Vec<StrategyOutcome>,
    pub ranking: Vec<RankedScore>,
}

impl InstrumentReport {
    pub fn new(
        instrument: impl Into<String>,
        bar_count: usize,
        outcomes: Vec<StrategyOutcome>,
        weights: &RankingWeights,
    ) -> Self {
        let ranking = rank_strategies(outcomes.iter().map(|o| &o.result), weights);
        Self {
            instrument: instrument.into(),
            bar_count,
            outcomes,
            ranking,
        }
    }

    pub fn outcome(&self, strategy: StrategyKind) -> Option<&StrategyOutcome> {
        self.outcomes.iter().find(|o| o.strategy == strategy)
    }

    pub fn results(&self) -> BTreeMap<StrategyKind, &StrategyResult> {
        self.outcomes
            .iter()
            .map(|o| (o.strategy, &o.result))
            .collect()
    }

    pub fn latest_signals(&self) -> BTreeMap<StrategyKind, bool> {
        self.outcomes
            .iter()
            .map(|o| (o.strategy, o.latest_signal))
            .collect()
    }

    /// Best-ranked strategy and its metrics.
    pub fn recommended(&self) -> Option<(&RankedScore, &StrategyResult)> {
        let best = best_strategy(&self.ranking)?;
        let outcome = self.outcome(best.strategy)?;
        Some((best, &outcome.result))
    }

    /// Strategies that fell back to the zero result because of a fault.
    pub fn faults(&self) -> impl Iterator<Item = (StrategyKind, &EvaluationError)> {
        self.outcomes.iter().filter_map(|o| match &o.error {
            Some(err) if err.is_fault() => Some((o.strategy, err)),
            _ => None,
        })
    }
}

/// Evaluate every strategy for one instrument on the calling thread.
pub fn evaluate_instrument(
    instrument: &str,
    series: &BarSeries,
    config: &EvaluationConfig,
) -> InstrumentReport {
    let outcomes = StrategyKind::ALL
        .iter()
        .map(|&kind| evaluate_isolated(kind, series, config))
        .collect();
    InstrumentReport::new(instrument, series.len(), outcomes, &config.ranking)
}

/// Parallel evaluator backed by a private, bounded thread pool.
pub struct Evaluator {
    config: EvaluationConfig,
    pool: rayon::ThreadPool,
}

impl Evaluator {
    pub fn new(config: EvaluationConfig) -> Result<Self, StratrankError> {
        let threads = if config.workers == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        } else {
            config.workers
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("stratrank-worker-{i}"))
            .build()
            .map_err(|e| StratrankError::WorkerPool {
                reason: e.to_string(),
            })?;

        Ok(Self { config, pool })
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    pub fn worker_count(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Evaluate all instruments. Reports come back in input order.
    pub fn evaluate_all(&self, instruments: &[(String, Arc<BarSeries>)]) -> Vec<InstrumentReport> {
        let per_instrument = StrategyKind::ALL.len();
        let tasks: Vec<(usize, StrategyKind)> = (0..instruments.len())
            .flat_map(|i| StrategyKind::ALL.iter().map(move |&kind| (i, kind)))
            .collect();

        log::info!(
            "evaluating {} instruments ({} tasks) on {} workers",
            instruments.len(),
            tasks.len(),
            self.worker_count()
        );

        let mut slots: Vec<Option<StrategyOutcome>> = (0..tasks.len()).map(|_| None).collect();
        let config = &self.config;
        self.pool.install(|| {
            slots
                .par_iter_mut()
                .zip(tasks.par_iter())
                .for_each(|(slot, &(index, kind))| {
                    let (instrument, series) = &instruments[index];
                    log::debug!("{instrument}/{kind}: start");
                    *slot = Some(evaluate_isolated(kind, series, config));
                });
        });

        let mut slots = slots.into_iter();
        instruments
            .iter()
            .map(|(instrument, series)| {
                let outcomes: Vec<StrategyOutcome> =
                    slots.by_ref().take(per_instrument).flatten().collect();
                let report =
                    InstrumentReport::new(instrument.clone(), series.len(), outcomes, &config.ranking);
                for (strategy, err) in report.faults() {
                    log::warn!("{instrument}/{strategy}: substituted zero result ({err})");
                }
                report
            })
            .collect()
    }
}
