//! In-memory tick store with live queries
//!
//! The whole dataset is one copy-on-write snapshot behind a watch channel.
//! Writers swap in a new snapshot; every live query maps the latest
//! snapshot to its own view, so subscribers always start from the current
//! state and see each later change.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;
use tally_config::AllocatorConfig;
use tally_shared::{Counter, SortKey, TallyError, TallyResult, Tick, TimeWindow, Timestamp, NOID};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::aggregation::AggregateReducer;
use crate::id_alloc::IdentifierAllocator;
use crate::store::{AmountStream, TickListStream, TickStore};

#[derive(Debug, Clone, Default)]
struct Snapshot {
    counters: BTreeMap<i64, Counter>,
    ticks: BTreeMap<i64, Tick>,
}

impl Snapshot {
    fn ticks_for(&self, parent_id: i64, sort: SortKey) -> Vec<Tick> {
        let mut ticks: Vec<Tick> = self
            .ticks
            .values()
            .filter(|tick| tick.parent_id == parent_id)
            .cloned()
            .collect();
        ticks.sort_by(|a, b| {
            sort.time_of(a)
                .cmp(&sort.time_of(b))
                .then(a.id.cmp(&b.id))
        });
        ticks
    }
}

/// Reference [`TickStore`] kept entirely in memory
pub struct MemoryTickStore {
    state: watch::Sender<Arc<Snapshot>>,
    allocator: IdentifierAllocator,
}

impl Default for MemoryTickStore {
    fn default() -> Self {
        Self::new(&AllocatorConfig::default())
    }
}

impl MemoryTickStore {
    pub fn new(config: &AllocatorConfig) -> Self {
        let (state, _) = watch::channel(Arc::new(Snapshot::default()));
        Self {
            state,
            allocator: IdentifierAllocator::new(config),
        }
    }

    /// Apply `op` to the snapshot under the channel's write lock.
    /// Subscribers are only notified when `op` succeeds.
    fn mutate<T>(&self, op: impl FnOnce(&mut Snapshot) -> TallyResult<T>) -> TallyResult<T> {
        let mut outcome = None;
        self.state.send_if_modified(|snapshot| {
            let result = op(Arc::make_mut(snapshot));
            let modified = result.is_ok();
            outcome = Some(result);
            modified
        });
        outcome.unwrap_or_else(|| Err(TallyError::internal("store mutation did not run")))
    }

    fn snapshot(&self) -> Arc<Snapshot> {
        self.state.borrow().clone()
    }

    fn snapshots(&self) -> WatchStream<Arc<Snapshot>> {
        WatchStream::new(self.state.subscribe())
    }

    // ---------------------------------------------------------------------
    // Counters
    // ---------------------------------------------------------------------

    /// Insert a counter, allocating an id when it carries `NOID`.
    pub fn insert_counter(&self, counter: Counter) -> TallyResult<i64> {
        let allocator = self.allocator;
        self.mutate(|snapshot| {
            let mut counter = counter;
            if counter.id == NOID {
                counter.id = allocator.allocate_unused(|id| snapshot.counters.contains_key(&id))?;
            } else if snapshot.counters.contains_key(&counter.id) {
                return Err(TallyError::DuplicateId { id: counter.id });
            }

            let id = counter.id;
            log::debug!("Inserted counter {} ({})", id, counter.name);
            snapshot.counters.insert(id, counter);
            Ok(id)
        })
    }

    pub fn create_counter(&self, name: impl Into<String>) -> TallyResult<Counter> {
        let mut counter = Counter::new(name, Utc::now());
        counter.id = self.insert_counter(counter.clone())?;
        Ok(counter)
    }

    /// Replace a counter's name, refreshing its modification time.
    pub fn update_counter(&self, counter: Counter) -> TallyResult<()> {
        self.rename_counter(counter.id, counter.name)
    }

    pub fn rename_counter(&self, id: i64, name: impl Into<String>) -> TallyResult<()> {
        let name = name.into();
        self.mutate(|snapshot| {
            let counter = snapshot
                .counters
                .get_mut(&id)
                .ok_or(TallyError::CounterNotFound { id })?;
            counter.name = name;
            counter.time_modified = Utc::now();
            Ok(())
        })
    }

    /// Remove a counter and all of its ticks. Returns how many ticks went
    /// with it.
    pub fn delete_counter(&self, id: i64) -> TallyResult<usize> {
        self.mutate(|snapshot| {
            snapshot
                .counters
                .remove(&id)
                .ok_or(TallyError::CounterNotFound { id })?;
            let before = snapshot.ticks.len();
            snapshot.ticks.retain(|_, tick| tick.parent_id != id);
            let removed = before - snapshot.ticks.len();
            log::debug!("Deleted counter {} with {} ticks", id, removed);
            Ok(removed)
        })
    }

    pub fn counters(&self) -> Vec<Counter> {
        self.snapshot().counters.values().cloned().collect()
    }

    pub fn counter(&self, id: i64) -> Option<Counter> {
        self.snapshot().counters.get(&id).cloned()
    }

    // ---------------------------------------------------------------------
    // Ticks
    // ---------------------------------------------------------------------

    /// Insert a tick as given, allocating an id when it carries `NOID`.
    pub fn insert_tick(&self, tick: Tick) -> TallyResult<i64> {
        ensure_finite(tick.amount)?;
        let allocator = self.allocator;
        self.mutate(|snapshot| {
            if !snapshot.counters.contains_key(&tick.parent_id) {
                return Err(TallyError::CounterNotFound { id: tick.parent_id });
            }

            let mut tick = tick;
            if tick.id == NOID {
                tick.id = allocator.allocate_unused(|id| snapshot.ticks.contains_key(&id))?;
            } else if snapshot.ticks.contains_key(&tick.id) {
                return Err(TallyError::DuplicateId { id: tick.id });
            }

            let id = tick.id;
            snapshot.ticks.insert(id, tick);
            Ok(id)
        })
    }

    /// Record `amount` against `parent_id` now, effective at
    /// `time_for_data` if given.
    pub fn add_tick(
        &self,
        parent_id: i64,
        amount: f64,
        time_for_data: Option<Timestamp>,
    ) -> TallyResult<Tick> {
        let now = Utc::now();
        let mut tick = Tick::new(parent_id, amount, now).with_time_for_data(time_for_data.unwrap_or(now));
        tick.id = self.insert_tick(tick.clone())?;
        Ok(tick)
    }

    /// Replace a tick's amount and effect time. Creation time and parent
    /// are kept; modification time is refreshed.
    pub fn update_tick(&self, tick: Tick) -> TallyResult<()> {
        ensure_finite(tick.amount)?;
        self.mutate(|snapshot| {
            let stored = snapshot
                .ticks
                .get_mut(&tick.id)
                .ok_or(TallyError::TickNotFound { id: tick.id })?;
            stored.amount = tick.amount;
            stored.time_for_data = tick.time_for_data;
            stored.time_modified = Utc::now();
            Ok(())
        })
    }

    pub fn delete_tick(&self, id: i64) -> TallyResult<()> {
        self.mutate(|snapshot| {
            snapshot
                .ticks
                .remove(&id)
                .map(|_| ())
                .ok_or(TallyError::TickNotFound { id })
        })
    }

    /// Remove every listed tick that exists. Returns how many were removed.
    pub fn delete_ticks(&self, ids: &[i64]) -> usize {
        let mut removed = 0;
        self.state.send_if_modified(|snapshot| {
            if !ids.iter().any(|id| snapshot.ticks.contains_key(id)) {
                return false;
            }
            let snapshot = Arc::make_mut(snapshot);
            removed = ids
                .iter()
                .filter(|id| snapshot.ticks.remove(*id).is_some())
                .count();
            true
        });
        removed
    }

    /// One-shot read of a counter's ticks, ordered by `sort`.
    pub fn ticks_for(&self, parent_id: i64, sort: SortKey) -> Vec<Tick> {
        self.snapshot().ticks_for(parent_id, sort)
    }

    /// Running total of a counter
    pub fn counter_total(&self, parent_id: i64) -> f64 {
        AggregateReducer::total(&self.snapshot().ticks_for(parent_id, SortKey::TimeCreated))
    }
}

fn ensure_finite(amount: f64) -> TallyResult<()> {
    if amount.is_finite() {
        Ok(())
    } else {
        Err(TallyError::InvalidAmount { amount })
    }
}

impl TickStore for MemoryTickStore {
    fn stream_ticks(&self, parent_id: i64, sort: SortKey) -> TickListStream {
        self.snapshots()
            .map(move |snapshot| Ok(snapshot.ticks_for(parent_id, sort)))
            .boxed()
    }

    fn stream_aggregate(&self, parent_id: i64, sort: SortKey, window: TimeWindow) -> AmountStream {
        self.snapshots()
            .map(move |snapshot| {
                let ticks = snapshot.ticks_for(parent_id, sort);
                Ok(AggregateReducer::sum(&ticks, sort, window))
            })
            .boxed()
    }

    fn stream_all_ticks(&self) -> TickListStream {
        self.snapshots()
            .map(|snapshot| Ok(snapshot.ticks.values().cloned().collect()))
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(day: i64) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap() + Duration::days(day)
    }

    #[test]
    fn test_create_counter_allocates_id() {
        let store = MemoryTickStore::default();
        let a = store.create_counter("push-ups").unwrap();
        let b = store.create_counter("coffee").unwrap();

        assert_ne!(a.id, NOID);
        assert_ne!(a.id, b.id);
        assert_eq!(store.counters().len(), 2);
        assert_eq!(store.counter(a.id).unwrap().name, "push-ups");
    }

    #[test]
    fn test_insert_counter_rejects_taken_id() {
        let store = MemoryTickStore::default();
        let mut counter = Counter::new("a", at(0));
        counter.id = 5;
        store.insert_counter(counter.clone()).unwrap();
        assert_eq!(
            store.insert_counter(counter),
            Err(TallyError::DuplicateId { id: 5 })
        );
    }

    #[test]
    fn test_tick_requires_existing_parent() {
        let store = MemoryTickStore::default();
        assert_eq!(
            store.add_tick(404, 1.0, None),
            Err(TallyError::CounterNotFound { id: 404 })
        );
    }

    #[test]
    fn test_non_finite_amounts_rejected() {
        let store = MemoryTickStore::default();
        let counter = store.create_counter("c").unwrap();

        assert!(matches!(
            store.add_tick(counter.id, f64::NAN, None),
            Err(TallyError::InvalidAmount { .. })
        ));
        assert_eq!(
            store.add_tick(counter.id, f64::INFINITY, None),
            Err(TallyError::InvalidAmount { amount: f64::INFINITY })
        );

        let mut tick = store.add_tick(counter.id, 1.0, None).unwrap();
        tick.amount = f64::NEG_INFINITY;
        assert!(store.update_tick(tick).is_err());
        assert_eq!(store.counter_total(counter.id), 1.0);
    }

    #[test]
    fn test_ticks_sorted_by_key() {
        let store = MemoryTickStore::default();
        let counter = store.create_counter("c").unwrap();
        for day in [3, 1, 2] {
            store
                .insert_tick(Tick::new(counter.id, day as f64, at(10 - day)).with_time_for_data(at(day)))
                .unwrap();
        }

        let by_data: Vec<f64> = store
            .ticks_for(counter.id, SortKey::TimeForData)
            .iter()
            .map(|t| t.amount)
            .collect();
        assert_eq!(by_data, vec![1.0, 2.0, 3.0]);

        let by_created: Vec<f64> = store
            .ticks_for(counter.id, SortKey::TimeCreated)
            .iter()
            .map(|t| t.amount)
            .collect();
        assert_eq!(by_created, vec![3.0, 2.0, 1.0]);
    }

    #[test]
    fn test_update_tick_keeps_creation_time() {
        let store = MemoryTickStore::default();
        let counter = store.create_counter("c").unwrap();
        let id = store.insert_tick(Tick::new(counter.id, 1.0, at(0))).unwrap();

        let mut edited = store.ticks_for(counter.id, SortKey::TimeCreated)[0].clone();
        edited.amount = 9.0;
        edited.time_for_data = at(4);
        store.update_tick(edited).unwrap();

        let stored = &store.ticks_for(counter.id, SortKey::TimeCreated)[0];
        assert_eq!(stored.id, id);
        assert_eq!(stored.amount, 9.0);
        assert_eq!(stored.time_created, at(0));
        assert_eq!(stored.time_for_data, at(4));
        assert!(stored.time_modified > at(0));
    }

    #[test]
    fn test_delete_counter_cascades() {
        let store = MemoryTickStore::default();
        let keep = store.create_counter("keep").unwrap();
        let gone = store.create_counter("gone").unwrap();
        store.add_tick(keep.id, 1.0, None).unwrap();
        store.add_tick(gone.id, 2.0, None).unwrap();
        store.add_tick(gone.id, 3.0, None).unwrap();

        assert_eq!(store.delete_counter(gone.id), Ok(2));
        assert_eq!(store.counter_total(keep.id), 1.0);
        assert!(store.ticks_for(gone.id, SortKey::TimeCreated).is_empty());
        assert_eq!(
            store.delete_counter(gone.id),
            Err(TallyError::CounterNotFound { id: gone.id })
        );
    }

    #[test]
    fn test_delete_ticks_counts_removed() {
        let store = MemoryTickStore::default();
        let counter = store.create_counter("c").unwrap();
        let a = store.add_tick(counter.id, 1.0, None).unwrap();
        let b = store.add_tick(counter.id, 1.0, None).unwrap();

        assert_eq!(store.delete_ticks(&[a.id, b.id, 12345]), 2);
        assert_eq!(store.delete_ticks(&[a.id]), 0);
        assert_eq!(store.delete_tick(a.id), Err(TallyError::TickNotFound { id: a.id }));
    }
}
