//! Per-strategy performance metrics over a trade list.

use super::backtest::Trade;
use super::strategy::StrategyKind;
use chrono::NaiveDate;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;
const LTM_CALENDAR_DAYS: i64 = 365;

/// Aggregate statistics for one strategy on one instrument.
///
/// All fields are zero for an empty trade list.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyResult {
    pub strategy: StrategyKind,
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
}

impl StrategyResult {
    pub fn empty(strategy: StrategyKind) -> Self {
        Self {
            strategy,
            total_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
            win_ratio: 0.0,
            avg_return: 0.0,
            total_return: 0.0,
            avg_win: 0.0,
            avg_loss: 0.0,
            profit_factor: 0.0,
            max_drawdown: 0.0,
            sharpe_ratio: 0.0,
            avg_hold_days: 0.0,
            trades_per_year: 0.0,
            ltm_return: 0.0,
            cagr: 0.0,
        }
    }

    /// Reduce `trades` (in chronological order) to aggregate metrics.
    ///
    /// `bar_count` is the length of the underlying series and `last_date` its
    /// final date, which anchors the trailing-twelve-month window.
    pub fn compute(
        strategy: StrategyKind,
        trades: &[Trade],
        bar_count: usize,
        last_date: Option<NaiveDate>,
    ) -> Self {
        if trades.is_empty() {
            return Self::empty(strategy);
        }

        let returns: Vec<f64> = trades.iter().map(|t| t.net_return).collect();
        let total_trades = trades.len();
        let n = total_trades as f64;

        let mut winning_trades = 0usize;
        let mut losing_trades = 0usize;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;

        for &r in &returns {
            if r > 0.0 {
                winning_trades += 1;
                total_wins += r;
            } else if r < 0.0 {
                losing_trades += 1;
                total_losses += r;
            }
        }

        let total_return: f64 = returns.iter().sum();
        let avg_return = total_return / n;
        let win_ratio = winning_trades as f64 / n;

        let avg_win = if winning_trades > 0 {
            total_wins / winning_trades as f64
        } else {
            0.0
        };
        let avg_loss = if losing_trades > 0 {
            total_losses / losing_trades as f64
        } else {
            0.0
        };

        let profit_factor = if total_losses < 0.0 {
            total_wins / total_losses.abs()
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let avg_hold_days = trades.iter().map(|t| t.hold_days as f64).sum::<f64>() / n;
        let sharpe_ratio = compute_sharpe(&returns, avg_return, avg_hold_days);

        let trades_per_year = if bar_count > 0 {
            n * TRADING_DAYS_PER_YEAR / bar_count as f64
        } else {
            0.0
        };

        let ltm_return = match last_date {
            Some(last) => {
                let cutoff = last - chrono::Duration::days(LTM_CALENDAR_DAYS);
                trades
                    .iter()
                    .filter(|t| t.entry_date >= cutoff)
                    .map(|t| t.net_return)
                    .sum()
            }
            None => 0.0,
        };

        let cagr = if bar_count as f64 > TRADING_DAYS_PER_YEAR {
            if total_return > -1.0 {
                let years = bar_count as f64 / TRADING_DAYS_PER_YEAR;
                (1.0 + total_return).powf(1.0 / years) - 1.0
            } else {
                -1.0
            }
        } else {
            0.0
        };

        StrategyResult {
            strategy,
            total_trades,
            winning_trades,
            losing_trades,
            win_ratio,
            avg_return,
            total_return,
            avg_win,
            avg_loss,
            profit_factor,
            max_drawdown: compute_max_drawdown(&returns),
            sharpe_ratio,
            avg_hold_days,
            trades_per_year,
            ltm_return,
            cagr,
        }
    }
}

/// Most negative decline of the compounded `(1 + r)` curve from its running peak.
fn compute_max_drawdown(returns: &[f64]) -> f64 {
    let mut cumulative = 1.0_f64;
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;

    for &r in returns {
        cumulative *= 1.0 + r;
        if cumulative > peak {
            peak = cumulative;
        }
        let dd = (cumulative - peak) / peak;
        if dd.is_finite() && dd < max_dd {
            max_dd = dd;
        }
    }

    max_dd
}

/// Mean return scaled by holding-period frequency, over the sample standard deviation.
fn compute_sharpe(returns: &[f64], mean: f64, avg_hold_days: f64) -> f64 {
    if returns.len() < 2 || avg_hold_days <= 0.0 {
        return 0.0;
    }

    let n = returns.len() as f64;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let stddev = variance.sqrt();

    if stddev > 0.0 {
        let periods_per_year = TRADING_DAYS_PER_YEAR / avg_hold_days;
        mean * periods_per_year.sqrt() / stddev
    } else {
        0.0
    }
}
