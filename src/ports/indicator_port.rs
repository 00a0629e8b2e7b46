//! Indicator provider port trait.

use crate::domain::bar::Bar;
use crate::domain::indicator::IndicatorSnapshot;

pub trait IndicatorPort {
    /// Bars of history needed before `snapshot` returns a value.
    fn warmup(&self) -> usize;

    /// Indicators at the last bar of `history` (oldest first), or `None`
    /// while the history is shorter than `warmup()`.
    fn snapshot(&self, history: &[Bar]) -> Option<IndicatorSnapshot>;
}
