//! The eight entry strategies and their tunable thresholds.
//!
//! Each strategy is a pure predicate over an enriched [`BarSeries`]; dispatch is
//! an exhaustive `match` on [`StrategyKind`].

use crate::domain::bar::BarField;
use crate::domain::error::SignalError;
use crate::domain::predicate::{any_within, crossover, lagged};
use crate::domain::series::BarSeries;
use crate::domain::signal::SignalSeries;
use std::fmt;
use std::str::FromStr;

/// Bars required by the lighter strategies.
pub const LIGHT_MIN_HISTORY: usize = 20;
/// Bars required by every other strategy.
pub const DEFAULT_MIN_HISTORY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StrategyKind {
    BbSignal513,
    Sma513Crossover,
    MacdCross,
    DipBuy513,
    MacdVolume,
    RsiAdxSignal,
    Bb513Rsi,
    Bb513Adx,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 8] = [
        StrategyKind::BbSignal513,
        StrategyKind::Sma513Crossover,
        StrategyKind::MacdCross,
        StrategyKind::DipBuy513,
        StrategyKind::MacdVolume,
        StrategyKind::RsiAdxSignal,
        StrategyKind::Bb513Rsi,
        StrategyKind::Bb513Adx,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StrategyKind::BbSignal513 => "BB_Signal_513",
            StrategyKind::Sma513Crossover => "SMA_513_Crossover",
            StrategyKind::MacdCross => "MACD_Cross",
            StrategyKind::DipBuy513 => "Dip_Buy_513",
            StrategyKind::MacdVolume => "MACD_Volume",
            StrategyKind::RsiAdxSignal => "RSI_ADX_Signal",
            StrategyKind::Bb513Rsi => "BB_513_RSI",
            StrategyKind::Bb513Adx => "BB_513_ADX",
        }
    }

    pub fn min_history(self) -> usize {
        match self {
            StrategyKind::Sma513Crossover | StrategyKind::DipBuy513 => LIGHT_MIN_HISTORY,
            _ => DEFAULT_MIN_HISTORY,
        }
    }

    pub fn required_fields(self) -> &'static [BarField] {
        match self {
            StrategyKind::BbSignal513 => &[
                BarField::Close,
                BarField::BbLower,
                BarField::PercentB,
                BarField::Sma5,
                BarField::Sma13,
            ],
            StrategyKind::Sma513Crossover => &[BarField::Sma5, BarField::Sma13],
            StrategyKind::MacdCross => &[BarField::Macd, BarField::MacdSignal],
            StrategyKind::DipBuy513 => &[BarField::DailyReturn, BarField::Sma5, BarField::Sma13],
            StrategyKind::MacdVolume => {
                &[BarField::Macd, BarField::MacdSignal, BarField::VolumeRatio]
            }
            StrategyKind::RsiAdxSignal => &[
                BarField::Rsi,
                BarField::Adx,
                BarField::DiPlus,
                BarField::DiMinus,
            ],
            StrategyKind::Bb513Rsi => &[
                BarField::Close,
                BarField::BbMid,
                BarField::PercentB,
                BarField::Sma5,
                BarField::Sma13,
                BarField::Rsi,
            ],
            StrategyKind::Bb513Adx => &[
                BarField::Close,
                BarField::BbLower,
                BarField::Sma5,
                BarField::Sma13,
                BarField::Adx,
            ],
        }
    }

    /// Evaluate the entry predicate at every bar.
    ///
    /// A short series yields `InsufficientData`, an absent input column yields
    /// `MissingField`; callers substitute an all-false series for either.
    pub fn evaluate(
        self,
        series: &BarSeries,
        params: &StrategyParams,
    ) -> Result<SignalSeries, SignalError> {
        let minimum = self.min_history();
        if series.len() < minimum {
            return Err(SignalError::InsufficientData {
                bars: series.len(),
                minimum,
            });
        }
        if let Some(&field) = self
            .required_fields()
            .iter()
            .find(|&&f| !series.has_field(f))
        {
            return Err(SignalError::MissingField { field });
        }

        let flags = match self {
            StrategyKind::BbSignal513 => bb_signal_513(series, params),
            StrategyKind::Sma513Crossover => sma_513_crossover(series, params),
            StrategyKind::MacdCross => macd_cross(series, params),
            StrategyKind::DipBuy513 => dip_buy_513(series, params),
            StrategyKind::MacdVolume => macd_volume(series, params),
            StrategyKind::RsiAdxSignal => rsi_adx_signal(series, params),
            StrategyKind::Bb513Rsi => bb_513_rsi(series, params),
            StrategyKind::Bb513Adx => bb_513_adx(series, params),
        };
        Ok(SignalSeries::from(flags))
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StrategyKind::ALL
            .iter()
            .copied()
            .find(|k| k.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown strategy: {s}"))
    }
}

/// Thresholds used by the predicates. Defaults are the published rule constants.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyParams {
    /// Look-back for pairing the band touch with the 5/13 cross.
    pub bb_window: usize,
    pub percent_b_floor: f64,
    pub macd_require_negative: bool,
    pub dip_threshold: f64,
    pub volume_multiplier: f64,
    pub rsi_low: f64,
    pub rsi_adx_min: f64,
    pub rsi_band_low: f64,
    pub rsi_band_high: f64,
    pub percent_b_ceiling: f64,
    pub bb_adx_min: f64,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            bb_window: 3,
            percent_b_floor: 0.05,
            macd_require_negative: true,
            dip_threshold: -0.04,
            volume_multiplier: 1.2,
            rsi_low: 30.0,
            rsi_adx_min: 20.0,
            rsi_band_low: 45.0,
            rsi_band_high: 60.0,
            percent_b_ceiling: 0.2,
            bb_adx_min: 18.0,
        }
    }
}

fn bb_signal_513(series: &BarSeries, params: &StrategyParams) -> Vec<bool> {
    let close = series.column(BarField::Close);
    let bb_lower = series.column(BarField::BbLower);
    let percent_b = series.column(BarField::PercentB);
    let sma5 = series.column(BarField::Sma5);
    let sma13 = series.column(BarField::Sma13);
    let n = series.len();

    let band_touch: Vec<bool> = (0..n)
        .map(|i| crossover(&close, &bb_lower, i) || percent_b[i] < params.percent_b_floor)
        .collect();
    let fast_cross: Vec<bool> = (0..n).map(|i| crossover(&sma5, &sma13, i)).collect();

    let window = params.bb_window;
    (0..n)
        .map(|i| {
            i >= window
                && any_within(&band_touch, i, window)
                && any_within(&fast_cross, i, window)
        })
        .collect()
}

fn sma_513_crossover(series: &BarSeries, _params: &StrategyParams) -> Vec<bool> {
    let sma5 = series.column(BarField::Sma5);
    let sma13 = series.column(BarField::Sma13);
    (0..series.len())
        .map(|i| crossover(&sma5, &sma13, i))
        .collect()
}

fn macd_cross(series: &BarSeries, params: &StrategyParams) -> Vec<bool> {
    let macd = series.column(BarField::Macd);
    let signal = series.column(BarField::MacdSignal);
    (0..series.len())
        .map(|i| {
            crossover(&macd, &signal, i)
                && (!params.macd_require_negative || lagged(&macd, i, 1) < 0.0)
        })
        .collect()
}

fn dip_buy_513(series: &BarSeries, params: &StrategyParams) -> Vec<bool> {
    series
        .bars()
        .iter()
        .map(|b| b.daily_return <= params.dip_threshold && b.sma_5 > b.sma_13)
        .collect()
}

fn macd_volume(series: &BarSeries, params: &StrategyParams) -> Vec<bool> {
    series
        .bars()
        .iter()
        .map(|b| b.macd > b.macd_signal && b.volume_ratio > params.volume_multiplier)
        .collect()
}

fn rsi_adx_signal(series: &BarSeries, params: &StrategyParams) -> Vec<bool> {
    let rsi = series.column(BarField::Rsi);
    series
        .bars()
        .iter()
        .enumerate()
        .map(|(i, b)| {
            let was_low =
                lagged(&rsi, i, 1) < params.rsi_low || lagged(&rsi, i, 2) < params.rsi_low;
            b.rsi > params.rsi_low
                && was_low
                && b.adx > params.rsi_adx_min
                && b.di_plus > b.di_minus
        })
        .collect()
}

fn bb_513_rsi(series: &BarSeries, params: &StrategyParams) -> Vec<bool> {
    series
        .bars()
        .iter()
        .map(|b| {
            b.close < b.bb_mid
                && b.percent_b < params.percent_b_ceiling
                && b.sma_5 > b.sma_13
                && b.rsi >= params.rsi_band_low
                && b.rsi <= params.rsi_band_high
        })
        .collect()
}

fn bb_513_adx(series: &BarSeries, params: &StrategyParams) -> Vec<bool> {
    let close = series.column(BarField::Close);
    let bb_lower = series.column(BarField::BbLower);
    series
        .bars()
        .iter()
        .enumerate()
        .map(|(i, b)| {
            let rebound = lagged(&close, i, 1) <= lagged(&bb_lower, i, 1)
                || lagged(&close, i, 2) <= lagged(&bb_lower, i, 2);
            b.close > b.bb_lower && rebound && b.sma_5 > b.sma_13 && b.adx > params.bb_adx_min
        })
        .collect()
}
