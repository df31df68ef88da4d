//! Trade simulation over one strategy's signal series.
//!
//! Every true signal spawns an independent, fixed-horizon trade. Open positions
//! are not tracked, so trades from neighbouring signals may overlap.

use crate::domain::error::BacktestError;
use crate::domain::series::BarSeries;
use crate::domain::signal::SignalSeries;
use crate::domain::strategy::StrategyKind;
use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntryMethod {
    /// Buy at the open of the bar after the signal.
    #[default]
    NextOpen,
    /// Buy at the close of the signal bar.
    SameClose,
}

impl EntryMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryMethod::NextOpen => "next_open",
            EntryMethod::SameClose => "same_close",
        }
    }
}

impl FromStr for EntryMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "next_open" => Ok(EntryMethod::NextOpen),
            "same_close" => Ok(EntryMethod::SameClose),
            other => Err(format!("unknown entry method: {other}")),
        }
    }
}

impl fmt::Display for EntryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExitMethod {
    #[default]
    TimeBased,
    /// Reserved. Exits exactly like `TimeBased`.
    SignalBased,
}

impl ExitMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            ExitMethod::TimeBased => "time_based",
            ExitMethod::SignalBased => "signal_based",
        }
    }
}

impl FromStr for ExitMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "time_based" => Ok(ExitMethod::TimeBased),
            "signal_based" => Ok(ExitMethod::SignalBased),
            other => Err(format!("unknown exit method: {other}")),
        }
    }
}

impl fmt::Display for ExitMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub entry_method: EntryMethod,
    pub exit_method: ExitMethod,
    pub hold_days: usize,
    /// Fraction charged on each leg.
    pub transaction_cost: f64,
    /// Adverse fraction applied to each fill.
    pub slippage: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            entry_method: EntryMethod::NextOpen,
            exit_method: ExitMethod::TimeBased,
            hold_days: 10,
            transaction_cost: 0.001,
            slippage: 0.0005,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    TimeBased,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::TimeBased => f.write_str("Time-based"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub strategy: StrategyKind,
    pub signal_date: NaiveDate,
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub entry_price: f64,
    pub exit_price: f64,
    pub gross_return: f64,
    pub net_return: f64,
    /// Calendar days between entry and exit.
    pub hold_days: i64,
    pub pnl_percent: f64,
    pub exit_reason: ExitReason,
}

/// Simulate one trade per true signal.
///
/// Signals whose entry bar lies beyond the series, or whose entry or exit
/// price is undefined, are skipped.
pub fn run_backtest(
    series: &BarSeries,
    signals: &SignalSeries,
    strategy: StrategyKind,
    config: &BacktestConfig,
) -> Result<Vec<Trade>, BacktestError> {
    if signals.len() != series.len() {
        return Err(BacktestError::LengthMismatch {
            bars: series.len(),
            signals: signals.len(),
        });
    }

    let trades = signals
        .true_indices()
        .filter_map(|signal_index| simulate_trade(series, signal_index, strategy, config))
        .collect();
    Ok(trades)
}

fn simulate_trade(
    series: &BarSeries,
    signal_index: usize,
    strategy: StrategyKind,
    config: &BacktestConfig,
) -> Option<Trade> {
    let bars = series.bars();
    let last_index = bars.len().checked_sub(1)?;
    let signal_bar = bars.get(signal_index)?;

    let (entry_index, raw_entry) = match config.entry_method {
        EntryMethod::NextOpen => {
            let next = bars.get(signal_index + 1)?;
            (signal_index + 1, next.open)
        }
        EntryMethod::SameClose => (signal_index, signal_bar.close),
    };
    let entry_price = raw_entry * (1.0 + config.slippage);

    // signal_based has no exit rule of its own yet
    let exit_index = match config.exit_method {
        ExitMethod::TimeBased | ExitMethod::SignalBased => {
            (entry_index + config.hold_days).min(last_index)
        }
    };
    let exit_bar = &bars[exit_index];
    let exit_price = exit_bar.close * (1.0 - config.slippage);
    // a missing price makes the trade unreachable, like a signal past the end
    if !entry_price.is_finite() || !exit_price.is_finite() || entry_price <= 0.0 {
        return None;
    }

    let gross_return = (exit_price - entry_price) / entry_price;
    let net_return = gross_return - 2.0 * config.transaction_cost;
    let entry_date = bars[entry_index].date;

    Some(Trade {
        strategy,
        signal_date: signal_bar.date,
        entry_date,
        exit_date: exit_bar.date,
        entry_price,
        exit_price,
        gross_return,
        net_return,
        hold_days: (exit_bar.date - entry_date).num_days(),
        pnl_percent: net_return * 100.0,
        exit_reason: ExitReason::TimeBased,
    })
}
