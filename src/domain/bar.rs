//! Enriched daily bar: OHLCV plus the indicator columns produced upstream.

use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

/// One trading day. Indicator values are `NaN` during their warm-up window.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub daily_return: f64,
    pub sma_5: f64,
    pub sma_13: f64,
    pub sma_50: f64,
    pub sma_200: f64,
    pub rsi: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub bb_upper: f64,
    pub bb_mid: f64,
    pub bb_lower: f64,
    pub percent_b: f64,
    pub adx: f64,
    pub di_plus: f64,
    pub di_minus: f64,
    pub volume_ratio: f64,
    pub atr: f64,
}

impl Bar {
    /// A bar with only OHLCV set; every derived field is `NaN`.
    pub fn from_ohlcv(
        date: NaiveDate,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
            daily_return: f64::NAN,
            sma_5: f64::NAN,
            sma_13: f64::NAN,
            sma_50: f64::NAN,
            sma_200: f64::NAN,
            rsi: f64::NAN,
            macd: f64::NAN,
            macd_signal: f64::NAN,
            bb_upper: f64::NAN,
            bb_mid: f64::NAN,
            bb_lower: f64::NAN,
            percent_b: f64::NAN,
            adx: f64::NAN,
            di_plus: f64::NAN,
            di_minus: f64::NAN,
            volume_ratio: f64::NAN,
            atr: f64::NAN,
        }
    }

    pub fn get(&self, field: BarField) -> f64 {
        match field {
            BarField::Open => self.open,
            BarField::High => self.high,
            BarField::Low => self.low,
            BarField::Close => self.close,
            BarField::Volume => self.volume,
            BarField::DailyReturn => self.daily_return,
            BarField::Sma5 => self.sma_5,
            BarField::Sma13 => self.sma_13,
            BarField::Sma50 => self.sma_50,
            BarField::Sma200 => self.sma_200,
            BarField::Rsi => self.rsi,
            BarField::Macd => self.macd,
            BarField::MacdSignal => self.macd_signal,
            BarField::BbUpper => self.bb_upper,
            BarField::BbMid => self.bb_mid,
            BarField::BbLower => self.bb_lower,
            BarField::PercentB => self.percent_b,
            BarField::Adx => self.adx,
            BarField::DiPlus => self.di_plus,
            BarField::DiMinus => self.di_minus,
            BarField::VolumeRatio => self.volume_ratio,
            BarField::Atr => self.atr,
        }
    }

    pub fn set(&mut self, field: BarField, value: f64) {
        let slot = match field {
            BarField::Open => &mut self.open,
            BarField::High => &mut self.high,
            BarField::Low => &mut self.low,
            BarField::Close => &mut self.close,
            BarField::Volume => &mut self.volume,
            BarField::DailyReturn => &mut self.daily_return,
            BarField::Sma5 => &mut self.sma_5,
            BarField::Sma13 => &mut self.sma_13,
            BarField::Sma50 => &mut self.sma_50,
            BarField::Sma200 => &mut self.sma_200,
            BarField::Rsi => &mut self.rsi,
            BarField::Macd => &mut self.macd,
            BarField::MacdSignal => &mut self.macd_signal,
            BarField::BbUpper => &mut self.bb_upper,
            BarField::BbMid => &mut self.bb_mid,
            BarField::BbLower => &mut self.bb_lower,
            BarField::PercentB => &mut self.percent_b,
            BarField::Adx => &mut self.adx,
            BarField::DiPlus => &mut self.di_plus,
            BarField::DiMinus => &mut self.di_minus,
            BarField::VolumeRatio => &mut self.volume_ratio,
            BarField::Atr => &mut self.atr,
        };
        *slot = value;
    }
}

/// Numeric columns of an enriched bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BarField {
    Open,
    High,
    Low,
    Close,
    Volume,
    DailyReturn,
    Sma5,
    Sma13,
    Sma50,
    Sma200,
    Rsi,
    Macd,
    MacdSignal,
    BbUpper,
    BbMid,
    BbLower,
    PercentB,
    Adx,
    DiPlus,
    DiMinus,
    VolumeRatio,
    Atr,
}

impl BarField {
    pub const ALL: [BarField; 22] = [
        BarField::Open,
        BarField::High,
        BarField::Low,
        BarField::Close,
        BarField::Volume,
        BarField::DailyReturn,
        BarField::Sma5,
        BarField::Sma13,
        BarField::Sma50,
        BarField::Sma200,
        BarField::Rsi,
        BarField::Macd,
        BarField::MacdSignal,
        BarField::BbUpper,
        BarField::BbMid,
        BarField::BbLower,
        BarField::PercentB,
        BarField::Adx,
        BarField::DiPlus,
        BarField::DiMinus,
        BarField::VolumeRatio,
        BarField::Atr,
    ];

    /// Column name used by the indicator producer.
    pub fn column(self) -> &'static str {
        match self {
            BarField::Open => "Open",
            BarField::High => "High",
            BarField::Low => "Low",
            BarField::Close => "Close",
            BarField::Volume => "Volume",
            BarField::DailyReturn => "Daily_Return",
            BarField::Sma5 => "SMA_5",
            BarField::Sma13 => "SMA_13",
            BarField::Sma50 => "SMA_50",
            BarField::Sma200 => "SMA_200",
            BarField::Rsi => "RSI",
            BarField::Macd => "MACD",
            BarField::MacdSignal => "MACD_Signal",
            BarField::BbUpper => "BB_Upper",
            BarField::BbMid => "BB_Mid",
            BarField::BbLower => "BB_Lower",
            BarField::PercentB => "Percent_B",
            BarField::Adx => "ADX",
            BarField::DiPlus => "DI_Plus",
            BarField::DiMinus => "DI_Minus",
            BarField::VolumeRatio => "Volume_Ratio",
            BarField::Atr => "ATR",
        }
    }
}

impl fmt::Display for BarField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for BarField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BarField::ALL
            .iter()
            .copied()
            .find(|field| field.column().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown bar field: {s}"))
    }
}
