//! Bar data access port.

use crate::domain::error::StratrankError;
use crate::domain::series::BarSeries;

/// Supplies enriched bar series by instrument symbol.
///
/// Sources are only read on the calling thread; workers receive the loaded
/// `Arc<BarSeries>` values, never the source.
pub trait BarSource {
    /// Full series for `instrument`, oldest bar first.
    ///
    /// Returns [`StratrankError::NoData`] when the source has nothing for it.
    fn fetch_series(&self, instrument: &str) -> Result<BarSeries, StratrankError>;

    /// Symbols available from this source, sorted.
    fn list_instruments(&self) -> Result<Vec<String>, StratrankError>;
}
