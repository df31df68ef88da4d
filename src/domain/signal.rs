//! Signal generation across all strategies.

use crate::domain::error::SignalError;
use crate::domain::series::BarSeries;
use crate::domain::strategy::{StrategyKind, StrategyParams};
use std::collections::BTreeMap;

/// One entry flag per bar, aligned with the bar series.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SignalSeries(Vec<bool>);

impl SignalSeries {
    pub fn all_false(len: usize) -> Self {
        Self(vec![false; len])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }

    pub fn get(&self, index: usize) -> bool {
        self.0.get(index).copied().unwrap_or(false)
    }

    /// Flag on the most recent bar; false for an empty series.
    pub fn latest(&self) -> bool {
        self.0.last().copied().unwrap_or(false)
    }

    pub fn count(&self) -> usize {
        self.0.iter().filter(|&&s| s).count()
    }

    /// True flags among the last `bars` entries.
    pub fn count_recent(&self, bars: usize) -> usize {
        let start = self.0.len().saturating_sub(bars);
        self.0[start..].iter().filter(|&&s| s).count()
    }

    pub fn true_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter_map(|(i, &s)| s.then_some(i))
    }
}

impl From<Vec<bool>> for SignalSeries {
    fn from(flags: Vec<bool>) -> Self {
        Self(flags)
    }
}

/// Signals for one strategy; `error` explains an all-false substitution.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategySignals {
    pub strategy: StrategyKind,
    pub signals: SignalSeries,
    pub error: Option<SignalError>,
}

/// Evaluate one strategy, substituting an all-false series on failure.
pub fn signals_for(
    strategy: StrategyKind,
    series: &BarSeries,
    params: &StrategyParams,
) -> StrategySignals {
    match strategy.evaluate(series, params) {
        Ok(signals) => StrategySignals {
            strategy,
            signals,
            error: None,
        },
        Err(err) => {
            if err.is_fault() {
                log::warn!("{strategy}: {err}; substituting empty signals");
            } else {
                log::debug!("{strategy}: {err}");
            }
            StrategySignals {
                strategy,
                signals: SignalSeries::all_false(series.len()),
                error: Some(err),
            }
        }
    }
}

/// Output of [`generate_signals`], in canonical strategy order.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalSet {
    entries: Vec<StrategySignals>,
}

impl SignalSet {
    pub fn get(&self, strategy: StrategyKind) -> Option<&StrategySignals> {
        self.entries.iter().find(|e| e.strategy == strategy)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StrategySignals> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Latest-bar flag per strategy.
    pub fn latest(&self) -> BTreeMap<StrategyKind, bool> {
        self.entries
            .iter()
            .map(|e| (e.strategy, e.signals.latest()))
            .collect()
    }
}

/// Evaluate every strategy over `series`. One strategy failing never affects the others.
pub fn generate_signals(series: &BarSeries, params: &StrategyParams) -> SignalSet {
    let entries = StrategyKind::ALL
        .iter()
        .map(|&kind| signals_for(kind, series, params))
        .collect();
    SignalSet { entries }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalDetail {
    pub signals_count: usize,
    pub latest_signal: bool,
}

/// Recent signal activity across strategies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalSummary {
    pub total_signals_today: usize,
    pub active_strategies: Vec<StrategyKind>,
    pub details: BTreeMap<StrategyKind, SignalDetail>,
}

impl SignalSummary {
    pub fn from_signals(set: &SignalSet, days_back: usize) -> Self {
        let mut total_signals_today = 0;
        let mut active_strategies = Vec::new();
        let mut details = BTreeMap::new();

        for entry in set.iter().filter(|e| !e.signals.is_empty()) {
            let latest_signal = entry.signals.latest();
            details.insert(
                entry.strategy,
                SignalDetail {
                    signals_count: entry.signals.count_recent(days_back),
                    latest_signal,
                },
            );
            if latest_signal {
                total_signals_today += 1;
                active_strategies.push(entry.strategy);
            }
        }

        Self {
            total_signals_today,
            active_strategies,
            details,
        }
    }
}
