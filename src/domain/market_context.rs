//! Context for the most recent bar: signal quality grade and trend read.

use crate::domain::series::BarSeries;
use std::fmt;

/// Bars needed before a trend read is attempted.
pub const TREND_MIN_BARS: usize = 50;

pub const MAX_QUALITY_SCORE: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum QualityGrade {
    A,
    B,
    C,
    /// No data to grade.
    D,
}

impl QualityGrade {
    fn from_score(score: u32) -> Self {
        match score {
            s if s >= 4 => QualityGrade::A,
            s if s >= 2 => QualityGrade::B,
            _ => QualityGrade::C,
        }
    }
}

impl fmt::Display for QualityGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QualityGrade::A => "A",
            QualityGrade::B => "B",
            QualityGrade::C => "C",
            QualityGrade::D => "D",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityAssessment {
    pub score: u32,
    pub max_score: u32,
    pub grade: QualityGrade,
    pub factors: Vec<&'static str>,
}

fn or_default(value: f64, default: f64) -> f64 {
    if value.is_nan() { default } else { value }
}

/// Grade how well the latest bar confirms an entry.
pub fn assess_signal_quality(series: &BarSeries) -> QualityAssessment {
    let Some(bar) = series.last() else {
        return QualityAssessment {
            score: 0,
            max_score: MAX_QUALITY_SCORE,
            grade: QualityGrade::D,
            factors: Vec::new(),
        };
    };

    let volume_ratio = or_default(bar.volume_ratio, 1.0);
    let sma_50 = or_default(bar.sma_50, bar.close);
    let rsi = or_default(bar.rsi, 50.0);
    let adx = or_default(bar.adx, 20.0);

    let mut score = 0;
    let mut factors = Vec::new();

    if volume_ratio > 1.5 {
        score += 2;
        factors.push("High volume confirmation");
    } else if volume_ratio > 1.0 {
        score += 1;
        factors.push("Above average volume");
    }
    if bar.close > sma_50 {
        score += 1;
        factors.push("Above 50-day SMA");
    }
    if rsi < 70.0 {
        score += 1;
        factors.push("RSI not overbought");
    }
    if adx > 25.0 {
        score += 1;
        factors.push("Strong trend (ADX)");
    }

    QualityAssessment {
        score,
        max_score: MAX_QUALITY_SCORE,
        grade: QualityGrade::from_score(score),
        factors,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendDirection {
    Uptrend,
    Downtrend,
    Sideways,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendStrength {
    VeryStrong,
    Strong,
    Moderate,
    Weak,
}

impl TrendStrength {
    fn from_adx(adx: f64) -> Self {
        if adx > 40.0 {
            TrendStrength::VeryStrong
        } else if adx > 25.0 {
            TrendStrength::Strong
        } else if adx > 20.0 {
            TrendStrength::Moderate
        } else {
            TrendStrength::Weak
        }
    }
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrendDirection::Uptrend => "Uptrend",
            TrendDirection::Downtrend => "Downtrend",
            TrendDirection::Sideways => "Sideways",
        };
        f.write_str(s)
    }
}

impl fmt::Display for TrendStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrendStrength::VeryStrong => "Very Strong",
            TrendStrength::Strong => "Strong",
            TrendStrength::Moderate => "Moderate",
            TrendStrength::Weak => "Weak",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendAssessment {
    /// Not enough history.
    Unknown,
    Trend {
        direction: TrendDirection,
        strength: TrendStrength,
    },
}

impl fmt::Display for TrendAssessment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendAssessment::Unknown => f.write_str("Unknown"),
            TrendAssessment::Trend {
                direction,
                strength,
            } => write!(f, "{direction} ({strength})"),
        }
    }
}

/// Classify the trend at the latest bar from its moving averages and ADX.
///
/// NaN averages compare false, so a warm-up bar reads as sideways.
pub fn assess_trend(series: &BarSeries) -> TrendAssessment {
    let bar = match series.last() {
        Some(bar) if series.len() >= TREND_MIN_BARS => bar,
        _ => return TrendAssessment::Unknown,
    };

    let direction = if bar.close > bar.sma_50 && bar.sma_50 > bar.sma_200 {
        TrendDirection::Uptrend
    } else if bar.close < bar.sma_50 && bar.sma_50 < bar.sma_200 {
        TrendDirection::Downtrend
    } else {
        TrendDirection::Sideways
    };

    TrendAssessment::Trend {
        direction,
        strength: TrendStrength::from_adx(bar.adx),
    }
}
