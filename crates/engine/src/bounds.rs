//! Minimal enclosing window and range of a tick collection

use tally_shared::{AmountRange, SortKey, Tick, TimeWindow};

/// Full extent of a dataset on both axes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub domain: TimeWindow,
    pub range: AmountRange,
}

impl Bounds {
    /// Sentinel bounds for an empty collection
    pub fn empty() -> Self {
        Self {
            domain: TimeWindow::unbounded(),
            range: AmountRange::no_data(),
        }
    }
}

/// Single pass over `ticks` tracking min/max of the selected timestamp and
/// of the amount.
///
/// An empty slice yields [`Bounds::empty`]. A single tick yields a
/// zero-width window on both axes; widening that is left to the caller
/// (see [`crate::expand_range`] and [`crate::expand_domain`]).
pub fn compute_bounds(ticks: &[Tick], sort: SortKey) -> Bounds {
    let mut iter = ticks.iter();
    let Some(first) = iter.next() else {
        return Bounds::empty();
    };

    let mut earliest = sort.time_of(first);
    let mut latest = earliest;
    let mut low = first.amount;
    let mut high = first.amount;

    for tick in iter {
        let time = sort.time_of(tick);
        if time < earliest {
            earliest = time;
        }
        if time > latest {
            latest = time;
        }
        low = low.min(tick.amount);
        high = high.max(tick.amount);
    }

    Bounds {
        domain: TimeWindow::new(earliest, latest),
        range: AmountRange::new(low, high),
    }
}
