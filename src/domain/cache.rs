//! In-memory series cache keyed by instrument.
//!
//! The cache is an ordinary value owned by the caller; nothing is global.
//! Entries are shared as `Arc<BarSeries>` so evaluation workers can read them
//! without copying.

use crate::domain::error::StratrankError;
use crate::domain::series::BarSeries;
use crate::ports::data_port::BarSource;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct SeriesCache {
    entries: HashMap<String, Arc<BarSeries>>,
}

impl SeriesCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached series for `instrument`, loading it from `source` on a miss.
    pub fn get_or_load(
        &mut self,
        source: &dyn BarSource,
        instrument: &str,
    ) -> Result<Arc<BarSeries>, StratrankError> {
        if let Some(series) = self.entries.get(instrument) {
            log::debug!("cache hit: {instrument}");
            return Ok(Arc::clone(series));
        }
        self.refresh(source, instrument)
    }

    /// Reload `instrument` from `source`, replacing any cached entry.
    ///
    /// On failure the previous entry is dropped.
    pub fn refresh(
        &mut self,
        source: &dyn BarSource,
        instrument: &str,
    ) -> Result<Arc<BarSeries>, StratrankError> {
        self.entries.remove(instrument);
        let series = Arc::new(source.fetch_series(instrument)?);
        log::debug!("loaded {instrument}: {} bars", series.len());
        self.entries
            .insert(instrument.to_string(), Arc::clone(&series));
        Ok(series)
    }

    pub fn get(&self, instrument: &str) -> Option<Arc<BarSeries>> {
        self.entries.get(instrument).cloned()
    }

    /// Returns whether an entry was removed.
    pub fn invalidate(&mut self, instrument: &str) -> bool {
        self.entries.remove(instrument).is_some()
    }

    pub fn invalidate_all(&mut self) {
        self.entries.clear();
    }

    pub fn contains(&self, instrument: &str) -> bool {
        self.entries.contains_key(instrument)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bar::Bar;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        bars: usize,
        fetches: AtomicUsize,
    }

    impl CountingSource {
        fn new(bars: usize) -> Self {
            Self {
                bars,
                fetches: AtomicUsize::new(0),
            }
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    impl BarSource for CountingSource {
        fn fetch_series(&self, instrument: &str) -> Result<BarSeries, StratrankError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if instrument == "MISSING" {
                return Err(StratrankError::NoData {
                    instrument: instrument.to_string(),
                });
            }
            let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
            let bars = (0..self.bars)
                .map(|i| {
                    Bar::from_ohlcv(
                        start + chrono::Duration::days(i as i64),
                        1.0,
                        1.0,
                        1.0,
                        1.0,
                        1.0,
                    )
                })
                .collect();
            Ok(BarSeries::new(bars)?)
        }

        fn list_instruments(&self) -> Result<Vec<String>, StratrankError> {
            Ok(vec!["AAA".to_string()])
        }
    }

    #[test]
    fn loads_once_then_hits() {
        let source = CountingSource::new(5);
        let mut cache = SeriesCache::new();

        let first = cache.get_or_load(&source, "AAA").unwrap();
        let second = cache.get_or_load(&source, "AAA").unwrap();

        assert_eq!(source.fetches(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
        assert!(cache.contains("AAA"));
    }

    #[test]
    fn refresh_reloads() {
        let source = CountingSource::new(5);
        let mut cache = SeriesCache::new();

        let first = cache.get_or_load(&source, "AAA").unwrap();
        let refreshed = cache.refresh(&source, "AAA").unwrap();

        assert_eq!(source.fetches(), 2);
        assert!(!Arc::ptr_eq(&first, &refreshed));
        assert!(Arc::ptr_eq(&cache.get("AAA").unwrap(), &refreshed));
    }

    #[test]
    fn failed_load_is_not_cached() {
        let source = CountingSource::new(5);
        let mut cache = SeriesCache::new();

        let err = cache.get_or_load(&source, "MISSING").unwrap_err();
        assert!(matches!(err, StratrankError::NoData { .. }));
        assert!(!cache.contains("MISSING"));
        assert!(cache.is_empty());
    }

    #[test]
    fn invalidation() {
        let source = CountingSource::new(5);
        let mut cache = SeriesCache::new();
        cache.get_or_load(&source, "AAA").unwrap();
        cache.get_or_load(&source, "BBB").unwrap();

        assert!(cache.invalidate("AAA"));
        assert!(!cache.invalidate("AAA"));
        assert_eq!(cache.len(), 1);

        cache.invalidate_all();
        assert!(cache.is_empty());

        cache.get_or_load(&source, "BBB").unwrap();
        assert_eq!(source.fetches(), 3);
    }
}
