//! Instrument universe: parsing symbol lists and filtering out instruments
//! without enough history to evaluate.

use crate::domain::cache::SeriesCache;
use crate::domain::error::StratrankError;
use crate::domain::series::BarSeries;
use crate::ports::data_port::BarSource;
use std::collections::HashSet;
use std::sync::Arc;

/// An instrument is evaluated only with more bars than this.
pub const MIN_SERIES_BARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in instrument list")]
    EmptyToken,

    #[error("duplicate instrument: {0}")]
    DuplicateInstrument(String),
}

impl From<UniverseError> for StratrankError {
    fn from(err: UniverseError) -> Self {
        StratrankError::ConfigInvalid {
            section: "data".to_string(),
            key: "instruments".to_string(),
            reason: err.to_string(),
        }
    }
}

/// Split a comma-separated symbol list, trimming and upper-casing each token.
pub fn parse_instruments(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut instruments = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let instrument = trimmed.to_uppercase();
        if !seen.insert(instrument.clone()) {
            return Err(UniverseError::DuplicateInstrument(instrument));
        }
        instruments.push(instrument);
    }

    Ok(instruments)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NoData,
    InsufficientBars { bars: usize },
    /// The source failed for a reason other than missing data.
    FetchFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedInstrument {
    pub instrument: String,
    pub reason: SkipReason,
}

#[derive(Debug)]
pub struct UniverseValidationResult {
    /// Loaded series in input order.
    pub instruments: Vec<(String, Arc<BarSeries>)>,
    pub skipped: Vec<SkippedInstrument>,
}

impl UniverseValidationResult {
    pub fn count(&self) -> usize {
        self.instruments.len()
    }
}

/// Load every instrument through `cache`, keeping those with more than
/// [`MIN_SERIES_BARS`] bars.
///
/// Fails only when nothing survives.
pub fn validate_universe(
    source: &dyn BarSource,
    cache: &mut SeriesCache,
    instruments: &[String],
) -> Result<UniverseValidationResult, StratrankError> {
    let mut valid = Vec::new();
    let mut skipped = Vec::new();

    for instrument in instruments {
        let series = match cache.get_or_load(source, instrument) {
            Ok(series) if !series.is_empty() => series,
            Ok(_) => {
                log::warn!("skipping {instrument} (no data found)");
                skipped.push(SkippedInstrument {
                    instrument: instrument.clone(),
                    reason: SkipReason::NoData,
                });
                continue;
            }
            Err(e) => {
                log::warn!("skipping {instrument} ({e})");
                let reason = match e {
                    StratrankError::NoData { .. } => SkipReason::NoData,
                    other => SkipReason::FetchFailed(other.to_string()),
                };
                skipped.push(SkippedInstrument {
                    instrument: instrument.clone(),
                    reason,
                });
                continue;
            }
        };

        if series.len() <= MIN_SERIES_BARS {
            log::warn!(
                "skipping {instrument} (only {} bars, more than {MIN_SERIES_BARS} required)",
                series.len()
            );
            skipped.push(SkippedInstrument {
                instrument: instrument.clone(),
                reason: SkipReason::InsufficientBars { bars: series.len() },
            });
            continue;
        }

        log::info!("{instrument}: {} bars [OK]", series.len());
        valid.push((instrument.clone(), series));
    }

    if valid.is_empty() {
        return Err(StratrankError::InsufficientData {
            instrument: "all".to_string(),
            bars: 0,
            minimum: MIN_SERIES_BARS,
        });
    }

    if !skipped.is_empty() {
        log::info!(
            "evaluating {} of {} instruments",
            valid.len(),
            valid.len() + skipped.len()
        );
    }

    Ok(UniverseValidationResult {
        instruments: valid,
        skipped,
    })
}
