//! Scalar aggregation over tick amounts
//!
//! Windowed sums and averages for single-value displays, plus the
//! per-counter totals used by overview screens.

use std::collections::HashMap;

use futures::StreamExt;
use tally_shared::{SortKey, TallyResult, Tick, TimeWindow};

use crate::store::TickStore;

/// Pure reducers over tick collections
pub struct AggregateReducer;

impl AggregateReducer {
    /// Sum of amounts whose selected timestamp falls in `window`.
    /// `0.0` when nothing matches.
    pub fn sum(ticks: &[Tick], sort: SortKey, window: TimeWindow) -> f64 {
        Self::in_window(ticks, sort, window).map(|t| t.amount).sum()
    }

    /// Mean amount over the same filtered set as [`Self::sum`].
    /// `0.0` when nothing matches.
    pub fn average(ticks: &[Tick], sort: SortKey, window: TimeWindow) -> f64 {
        let (total, count) = Self::in_window(ticks, sort, window)
            .fold((0.0, 0usize), |(total, count), t| (total + t.amount, count + 1));
        if count == 0 {
            0.0
        } else {
            total / count as f64
        }
    }

    /// Running total of a counter: every amount, no window.
    pub fn total(ticks: &[Tick]) -> f64 {
        ticks.iter().map(|t| t.amount).sum()
    }

    /// Total per parent counter. Counters without ticks are absent.
    pub fn sum_by_parent(ticks: &[Tick]) -> HashMap<i64, f64> {
        let mut totals = HashMap::new();
        for tick in ticks {
            *totals.entry(tick.parent_id).or_insert(0.0) += tick.amount;
        }
        totals
    }

    fn in_window<'a>(
        ticks: &'a [Tick],
        sort: SortKey,
        window: TimeWindow,
    ) -> impl Iterator<Item = &'a Tick> + 'a {
        ticks
            .iter()
            .filter(move |tick| window.contains(sort.time_of(tick)))
    }
}

/// Live per-counter totals across the whole store, recomputed on every
/// change to the global tick set.
pub fn sum_by_parent_stream(
    store: &dyn TickStore,
) -> futures::stream::BoxStream<'static, TallyResult<HashMap<i64, f64>>> {
    store
        .stream_all_ticks()
        .map(|ticks| ticks.map(|ticks| AggregateReducer::sum_by_parent(&ticks)))
        .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn day(n: i64) -> tally_shared::Timestamp {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(n)
    }

    fn ticks() -> Vec<Tick> {
        vec![
            Tick::new(1, 2.0, day(0)),
            Tick::new(1, 4.0, day(1)),
            Tick::new(1, -1.0, day(2)),
            Tick::new(2, 10.0, day(1)),
        ]
    }

    #[test]
    fn test_sum_in_window_is_inclusive() {
        let window = TimeWindow::new(day(0), day(1));
        assert_eq!(AggregateReducer::sum(&ticks(), SortKey::TimeForData, window), 16.0);
    }

    #[test]
    fn test_sum_without_matches_is_zero() {
        let window = TimeWindow::new(day(10), day(20));
        assert_eq!(AggregateReducer::sum(&ticks(), SortKey::TimeCreated, window), 0.0);
    }

    #[test]
    fn test_average() {
        let window = TimeWindow::new(day(1), day(2));
        let avg = AggregateReducer::average(&ticks(), SortKey::TimeForData, window);
        assert!((avg - 13.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_average_of_nothing_is_zero() {
        let window = TimeWindow::new(day(30), day(31));
        assert_eq!(
            AggregateReducer::average(&ticks(), SortKey::TimeForData, window),
            0.0
        );
        assert_eq!(
            AggregateReducer::average(&[], SortKey::TimeForData, TimeWindow::unbounded()),
            0.0
        );
    }

    #[test]
    fn test_sum_by_parent_omits_absent_counters() {
        let totals = AggregateReducer::sum_by_parent(&ticks());
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[&1], 5.0);
        assert_eq!(totals[&2], 10.0);
        assert!(!totals.contains_key(&3));

        assert!(AggregateReducer::sum_by_parent(&[]).is_empty());
    }

    #[test]
    fn test_total() {
        assert_eq!(AggregateReducer::total(&ticks()), 15.0);
    }
}
