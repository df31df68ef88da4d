//! Domain error types.
//!
//! `StratrankError` covers everything that can stop a run before evaluation
//! starts (configuration, input data). Per-strategy failures during evaluation
//! use the narrower [`SignalError`], [`BacktestError`] and [`EvaluationError`],
//! which the evaluation pipeline absorbs into zero results.

use crate::domain::bar::BarField;
use chrono::NaiveDate;

/// A bar series violated the ordering invariant.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SeriesError {
    #[error("bar {index} dated {current} does not follow {previous}")]
    UnorderedDates {
        index: usize,
        previous: NaiveDate,
        current: NaiveDate,
    },
}

/// Why a strategy produced an all-false signal series.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SignalError {
    #[error("insufficient history: have {bars} bars, need {minimum}")]
    InsufficientData { bars: usize, minimum: usize },

    #[error("missing input field {field}")]
    MissingField { field: BarField },
}

impl SignalError {
    /// Insufficient history is an expected outcome; everything else is a fault.
    pub fn is_fault(&self) -> bool {
        !matches!(self, SignalError::InsufficientData { .. })
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BacktestError {
    #[error("signal series has {signals} values for {bars} bars")]
    LengthMismatch { bars: usize, signals: usize },
}

/// Why a single (instrument, strategy) task fell back to the zero result.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvaluationError {
    #[error(transparent)]
    Signal(#[from] SignalError),

    #[error(transparent)]
    Backtest(#[from] BacktestError),

    #[error("task panicked: {0}")]
    Panicked(String),
}

impl EvaluationError {
    pub fn is_fault(&self) -> bool {
        match self {
            EvaluationError::Signal(err) => err.is_fault(),
            EvaluationError::Backtest(_) | EvaluationError::Panicked(_) => true,
        }
    }
}

/// Top-level error type for stratrank.
#[derive(Debug, thiserror::Error)]
pub enum StratrankError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no data for {instrument}")]
    NoData { instrument: String },

    #[error("insufficient data for {instrument}: have {bars} bars, need more than {minimum}")]
    InsufficientData {
        instrument: String,
        bars: usize,
        minimum: usize,
    },

    #[error(transparent)]
    InvalidSeries(#[from] SeriesError),

    #[error("worker pool error: {reason}")]
    WorkerPool { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&StratrankError> for std::process::ExitCode {
    fn from(err: &StratrankError) -> Self {
        let code: u8 = match err {
            StratrankError::Io(_) | StratrankError::WorkerPool { .. } => 1,
            StratrankError::ConfigParse { .. }
            | StratrankError::ConfigMissing { .. }
            | StratrankError::ConfigInvalid { .. } => 2,
            StratrankError::Data { .. } | StratrankError::InvalidSeries(_) => 3,
            StratrankError::NoData { .. } | StratrankError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
