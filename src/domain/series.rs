//! Validated, date-ordered bar series for a single instrument.

use crate::domain::bar::{Bar, BarField};
use crate::domain::error::SeriesError;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone)]
pub struct BarSeries {
    bars: Vec<Bar>,
    fields: BTreeSet<BarField>,
    date_index: HashMap<NaiveDate, usize>,
}

impl BarSeries {
    /// Build a series whose bars carry every field.
    pub fn new(bars: Vec<Bar>) -> Result<Self, SeriesError> {
        Self::with_fields(bars, BarField::ALL.into_iter().collect())
    }

    /// Build a series where only `fields` were supplied by the producer.
    ///
    /// Dates must be strictly increasing.
    pub fn with_fields(bars: Vec<Bar>, fields: BTreeSet<BarField>) -> Result<Self, SeriesError> {
        for (index, pair) in bars.windows(2).enumerate() {
            if pair[1].date <= pair[0].date {
                return Err(SeriesError::UnorderedDates {
                    index: index + 1,
                    previous: pair[0].date,
                    current: pair[1].date,
                });
            }
        }

        let date_index = bars
            .iter()
            .enumerate()
            .map(|(i, bar)| (bar.date, i))
            .collect();

        Ok(Self {
            bars,
            fields,
            date_index,
        })
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn bar(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }

    pub fn fields(&self) -> &BTreeSet<BarField> {
        &self.fields
    }

    pub fn has_field(&self, field: BarField) -> bool {
        self.fields.contains(&field)
    }

    /// One field across all bars.
    pub fn column(&self, field: BarField) -> Vec<f64> {
        self.bars.iter().map(|b| b.get(field)).collect()
    }

    pub fn get_index(&self, date: NaiveDate) -> Option<usize> {
        self.date_index.get(&date).copied()
    }
}
