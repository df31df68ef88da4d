//! Weighted scoring and ordering of strategy results.

use crate::domain::metrics::StrategyResult;
use crate::domain::strategy::StrategyKind;
use std::cmp::Ordering;

/// Profit factors above this contribute the full weight.
pub const PROFIT_FACTOR_CAP: f64 = 5.0;

#[derive(Debug, Clone, PartialEq)]
pub struct RankingWeights {
    pub win_ratio: f64,
    pub profit_factor: f64,
    pub ltm_return: f64,
}

impl RankingWeights {
    pub fn sum(&self) -> f64 {
        self.win_ratio + self.profit_factor + self.ltm_return
    }
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            win_ratio: 0.5,
            profit_factor: 0.3,
            ltm_return: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedScore {
    pub strategy: StrategyKind,
    pub score: f64,
}

/// Score in `[0, 1]` for weights summing to one; zero when nothing traded.
pub fn score(result: &StrategyResult, weights: &RankingWeights) -> f64 {
    if result.total_trades == 0 {
        return 0.0;
    }

    let profit_factor = result.profit_factor.min(PROFIT_FACTOR_CAP) / PROFIT_FACTOR_CAP;
    let ltm = (result.ltm_return.clamp(-1.0, 1.0) + 1.0) / 2.0;

    weights.win_ratio * result.win_ratio
        + weights.profit_factor * profit_factor
        + weights.ltm_return * ltm
}

/// Order strategies by score, highest first. Equal scores keep input order.
pub fn rank_strategies<'a, I>(results: I, weights: &RankingWeights) -> Vec<RankedScore>
where
    I: IntoIterator<Item = &'a StrategyResult>,
{
    let mut ranked: Vec<RankedScore> = results
        .into_iter()
        .map(|r| RankedScore {
            strategy: r.strategy,
            score: score(r, weights),
        })
        .collect();
    ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    ranked
}

/// Top-ranked entry, if any strategy was ranked.
pub fn best_strategy(ranked: &[RankedScore]) -> Option<&RankedScore> {
    ranked.first()
}
