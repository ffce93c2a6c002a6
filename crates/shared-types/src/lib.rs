//! Shared types for the tally engine
//!
//! This crate contains the data model shared between the engine and
//! config crates: counters, ticks, the sort key that picks a tick's time
//! axis, and the closed intervals the graph pipeline works in. Everything
//! here is plain data; behavior lives in `tally-engine`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod errors;
pub mod graph_inputs;
pub mod graph_state;

pub use errors::{TallyError, TallyResult};
pub use graph_inputs::{GraphInputChange, GraphInputs, InputValidationResult};
pub use graph_state::{GraphState, NormalizedPoint};

/// Point in time used for every tick and counter timestamp.
pub type Timestamp = DateTime<Utc>;

/// Id meaning "no counter". Never handed out by the allocator.
pub const NOID: i64 = 0;

/// Earliest representable instant, start of the unbounded window.
pub const DISTANT_PAST: Timestamp = DateTime::<Utc>::MIN_UTC;

/// Latest representable instant, end of the unbounded window.
pub const DISTANT_FUTURE: Timestamp = DateTime::<Utc>::MAX_UTC;

/// A named running total
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Counter {
    pub id: i64,
    pub name: String,
    pub time_created: Timestamp,
    pub time_modified: Timestamp,
}

impl Counter {
    /// Counter without an id yet; the store assigns one on insert.
    pub fn new(name: impl Into<String>, now: Timestamp) -> Self {
        Self {
            id: NOID,
            name: name.into(),
            time_created: now,
            time_modified: now,
        }
    }
}

/// One signed delta belonging to a counter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tick {
    pub id: i64,
    pub parent_id: i64,
    pub amount: f64,
    pub time_created: Timestamp,
    pub time_modified: Timestamp,
    /// When the delta takes effect. User adjustable, independent of the
    /// other two timestamps.
    pub time_for_data: Timestamp,
}

impl Tick {
    /// Tick without an id yet, created and effective at `now`.
    pub fn new(parent_id: i64, amount: f64, now: Timestamp) -> Self {
        Self {
            id: NOID,
            parent_id,
            amount,
            time_created: now,
            time_modified: now,
            time_for_data: now,
        }
    }

    pub fn with_time_for_data(mut self, time_for_data: Timestamp) -> Self {
        self.time_for_data = time_for_data;
        self
    }
}

/// Which tick timestamp acts as "time" for a view
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    TimeCreated,
    TimeModified,
    #[default]
    TimeForData,
}

impl SortKey {
    /// Selects the timestamp this key refers to.
    pub fn time_of(self, tick: &Tick) -> Timestamp {
        match self {
            SortKey::TimeCreated => tick.time_created,
            SortKey::TimeModified => tick.time_modified,
            SortKey::TimeForData => tick.time_for_data,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::TimeCreated => "time_created",
            SortKey::TimeModified => "time_modified",
            SortKey::TimeForData => "time_for_data",
        }
    }
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signed seconds from `from` to `to`, with sub-second precision.
pub fn seconds_between(from: Timestamp, to: Timestamp) -> f64 {
    let delta = to.signed_duration_since(from);
    delta.num_seconds() as f64 + f64::from(delta.subsec_nanos()) / 1_000_000_000.0
}

/// Closed time interval with `start <= end`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(from = "RawTimeWindow")]
pub struct TimeWindow {
    start: Timestamp,
    end: Timestamp,
}

#[derive(Deserialize)]
struct RawTimeWindow {
    start: Timestamp,
    end: Timestamp,
}

impl From<RawTimeWindow> for TimeWindow {
    fn from(raw: RawTimeWindow) -> Self {
        TimeWindow::new(raw.start, raw.end)
    }
}

impl TimeWindow {
    /// Orders the two endpoints, so argument order does not matter.
    pub fn new(a: Timestamp, b: Timestamp) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    /// `[DISTANT_PAST, DISTANT_FUTURE]`
    pub fn unbounded() -> Self {
        Self {
            start: DISTANT_PAST,
            end: DISTANT_FUTURE,
        }
    }

    pub fn start(&self) -> Timestamp {
        self.start
    }

    pub fn end(&self) -> Timestamp {
        self.end
    }

    pub fn contains(&self, timestamp: Timestamp) -> bool {
        timestamp >= self.start && timestamp <= self.end
    }

    pub fn is_unbounded(&self) -> bool {
        self.start == DISTANT_PAST && self.end == DISTANT_FUTURE
    }

    /// Zero width: a single instant.
    pub fn is_degenerate(&self) -> bool {
        self.start == self.end
    }

    pub fn width_secs(&self) -> f64 {
        seconds_between(self.start, self.end)
    }
}

/// Closed amount interval with `low <= high`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(from = "RawAmountRange")]
pub struct AmountRange {
    low: f64,
    high: f64,
}

#[derive(Deserialize)]
struct RawAmountRange {
    low: f64,
    high: f64,
}

impl From<RawAmountRange> for AmountRange {
    fn from(raw: RawAmountRange) -> Self {
        AmountRange::new(raw.low, raw.high)
    }
}

impl AmountRange {
    pub fn new(a: f64, b: f64) -> Self {
        Self {
            low: a.min(b),
            high: a.max(b),
        }
    }

    /// `[0, 1]`, used when there is no data to measure.
    pub fn no_data() -> Self {
        Self {
            low: 0.0,
            high: 1.0,
        }
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    pub fn high(&self) -> f64 {
        self.high
    }

    pub fn contains(&self, amount: f64) -> bool {
        amount >= self.low && amount <= self.high
    }

    pub fn is_degenerate(&self) -> bool {
        self.low == self.high
    }

    pub fn is_finite(&self) -> bool {
        self.low.is_finite() && self.high.is_finite()
    }

    pub fn width(&self) -> f64 {
        self.high - self.low
    }
}
