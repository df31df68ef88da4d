//! Boolean building blocks evaluated at a bar index.
//!
//! # Evaluation Semantics
//!
//! - `crossover`/`crossunder`: require `index >= 1`, return `false` at index 0
//! - `any_within(flags, i, w)`: true if any flag in `[i - w, i]` is set
//! - Any comparison touching `NaN` is `false`

/// `a` moves strictly above `b` at `index` having been at or below it one bar earlier.
pub fn crossover(a: &[f64], b: &[f64], index: usize) -> bool {
    if index == 0 || index >= a.len() || index >= b.len() {
        return false;
    }
    a[index] > b[index] && a[index - 1] <= b[index - 1]
}

/// `a` moves strictly below `b` at `index` having been at or above it one bar earlier.
pub fn crossunder(a: &[f64], b: &[f64], index: usize) -> bool {
    if index == 0 || index >= a.len() || index >= b.len() {
        return false;
    }
    a[index] < b[index] && a[index - 1] >= b[index - 1]
}

/// True when any of `flags[index - window ..= index]` is set.
///
/// The window is clipped at the start of the series.
pub fn any_within(flags: &[bool], index: usize, window: usize) -> bool {
    if index >= flags.len() {
        return false;
    }
    let start = index.saturating_sub(window);
    flags[start..=index].iter().any(|&f| f)
}

/// Value `lag` bars before `index`, or `NaN` when that bar does not exist.
pub fn lagged(values: &[f64], index: usize, lag: usize) -> f64 {
    index
        .checked_sub(lag)
        .and_then(|i| values.get(i))
        .copied()
        .unwrap_or(f64::NAN)
}
