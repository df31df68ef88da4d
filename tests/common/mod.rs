#![allow(dead_code)]

use chrono::NaiveDate;
use stratrank::domain::bar::{Bar, BarField};
use stratrank::domain::error::StratrankError;
use stratrank::domain::series::BarSeries;
use stratrank::ports::data_port::BarSource;
use std::collections::{BTreeSet, HashMap};

pub struct MockBarSource {
    pub data: HashMap<String, BarSeries>,
    pub errors: HashMap<String, String>,
}

impl MockBarSource {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_series(mut self, instrument: &str, series: BarSeries) -> Self {
        self.data.insert(instrument.to_string(), series);
        self
    }

    pub fn with_error(mut self, instrument: &str, reason: &str) -> Self {
        self.errors
            .insert(instrument.to_string(), reason.to_string());
        self
    }
}

impl BarSource for MockBarSource {
    fn fetch_series(&self, instrument: &str) -> Result<BarSeries, StratrankError> {
        if let Some(reason) = self.errors.get(instrument) {
            return Err(StratrankError::Data {
                reason: reason.clone(),
            });
        }
        self.data
            .get(instrument)
            .cloned()
            .ok_or_else(|| StratrankError::NoData {
                instrument: instrument.to_string(),
            })
    }

    fn list_instruments(&self) -> Result<Vec<String>, StratrankError> {
        let mut names: Vec<String> = self.data.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// A bar on which no strategy fires; tests override individual fields.
pub fn neutral_bar(date: NaiveDate, close: f64) -> Bar {
    let mut bar = Bar::from_ohlcv(date, close, close + 1.0, close - 1.0, close, 1_000_000.0);
    bar.daily_return = 0.0;
    bar.sma_5 = 99.0;
    bar.sma_13 = 100.0;
    bar.sma_50 = close;
    bar.sma_200 = close;
    bar.rsi = 50.0;
    bar.macd = -1.0;
    bar.macd_signal = 0.0;
    bar.bb_upper = close + 10.0;
    bar.bb_mid = close;
    bar.bb_lower = close - 10.0;
    bar.percent_b = 0.5;
    bar.adx = 10.0;
    bar.di_plus = 10.0;
    bar.di_minus = 20.0;
    bar.volume_ratio = 1.0;
    bar.atr = 2.0;
    bar
}

/// `count` neutral bars on consecutive calendar days with a constant close.
pub fn neutral_bars(start: &str, count: usize, close: f64) -> Vec<Bar> {
    let start = date(start);
    (0..count)
        .map(|i| neutral_bar(start + chrono::Duration::days(i as i64), close))
        .collect()
}

pub fn series(bars: Vec<Bar>) -> BarSeries {
    BarSeries::new(bars).unwrap()
}

/// Series carrying every field except `missing`.
pub fn series_without(bars: Vec<Bar>, missing: &[BarField]) -> BarSeries {
    let fields: BTreeSet<BarField> = BarField::ALL
        .into_iter()
        .filter(|f| !missing.contains(f))
        .collect();
    BarSeries::with_fields(bars, fields).unwrap()
}

/// Make SMA_5 cross above SMA_13 at `index` and stay above.
pub fn cross_sma_at(bars: &mut [Bar], index: usize) {
    for bar in bars.iter_mut().skip(index) {
        bar.sma_5 = 101.0;
    }
}

/// Set closes (and opens) to a linear ramp `start + step * i`.
pub fn ramp_prices(bars: &mut [Bar], start: f64, step: f64) {
    for (i, bar) in bars.iter_mut().enumerate() {
        let close = start + step * i as f64;
        bar.open = close;
        bar.high = close + 1.0;
        bar.low = close - 1.0;
        bar.close = close;
        bar.sma_50 = close;
        bar.sma_200 = close;
        bar.bb_mid = close;
        bar.bb_upper = close + 10.0;
        bar.bb_lower = close - 10.0;
    }
}

pub const FULL_HEADER: &str = "Date,Open,High,Low,Close,Volume,Daily_Return,SMA_5,SMA_13,SMA_50,SMA_200,RSI,MACD,MACD_Signal,BB_Upper,BB_Mid,BB_Lower,Percent_B,ADX,DI_Plus,DI_Minus,Volume_Ratio,ATR";

/// Render bars in the enriched CSV layout read by `CsvBarSource`.
pub fn to_csv(bars: &[Bar]) -> String {
    let mut out = String::from(FULL_HEADER);
    out.push('\n');
    for bar in bars {
        out.push_str(&bar.date.format("%Y-%m-%d").to_string());
        for field in BarField::ALL {
            let value = bar.get(field);
            out.push(',');
            if !value.is_nan() {
                out.push_str(&value.to_string());
            }
        }
        out.push('\n');
    }
    out
}
