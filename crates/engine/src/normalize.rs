//! Projection of ticks into percentage space

use chrono::Duration;
use tally_shared::{
    seconds_between, AmountRange, NormalizedPoint, SortKey, Tick, TimeWindow, DISTANT_FUTURE,
    DISTANT_PAST,
};

/// Map each tick to `(x, y)` relative to `domain` and `range`, preserving
/// input order.
///
/// Outputs are not clamped: a tick outside the viewport lands outside the
/// unit square. Callers must pass a non-degenerate domain and range; run
/// them through [`expand_domain`] and [`expand_range`] first.
pub fn normalize(
    ticks: &[Tick],
    sort: SortKey,
    domain: TimeWindow,
    range: AmountRange,
) -> Vec<NormalizedPoint> {
    let width = domain.width_secs().abs();
    let height = range.width().abs();
    debug_assert!(width > 0.0, "normalize called with a zero-width domain");
    debug_assert!(height > 0.0, "normalize called with a zero-width range");

    ticks
        .iter()
        .map(|tick| NormalizedPoint {
            x: seconds_between(domain.start(), sort.time_of(tick)) / width,
            y: (tick.amount - range.low()) / height,
        })
        .collect()
}

/// Widen a single-value range to include both 0 and 1.
/// A range with a NaN endpoint has no usable width and becomes `[0, 1]`.
/// Other non-degenerate ranges pass through untouched.
pub fn expand_range(range: AmountRange) -> AmountRange {
    if range.low().is_nan() || range.high().is_nan() {
        return AmountRange::no_data();
    }
    if !range.is_degenerate() {
        return range;
    }
    let value = range.low();
    AmountRange::new(value.min(0.0), value.max(1.0))
}

/// Widen a single-instant window by `padding` on each side, saturating at
/// the representable extremes. Non-degenerate windows pass through.
pub fn expand_domain(domain: TimeWindow, padding: Duration) -> TimeWindow {
    if !domain.is_degenerate() {
        return domain;
    }
    let padding = padding.max(Duration::seconds(1));
    let instant = domain.start();
    TimeWindow::new(
        instant.checked_sub_signed(padding).unwrap_or(DISTANT_PAST),
        instant.checked_add_signed(padding).unwrap_or(DISTANT_FUTURE),
    )
}
